/* ********************************************************************** **
**  This file is part of fcs2.                                            **
**                                                                        **
**  fcs2 is free software: you can redistribute it and/or modify it under **
**  the terms of the GNU General Public License as published by the Free  **
**  Software Foundation, either version 3 of the License, or (at your     **
**  option) any later version.                                            **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of fcs2 is licensed under the GPL, many  **
** parts of it are licensed under more permissive terms.                  **
** ********************************************************************** */

//! The particle file format: one `x y z q` per line, `#` starts a comment,
//! blank lines are ignored.

use crate::FailResult;

use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Particles {
    pub positions: Vec<[f64; 3]>,
    pub charges: Vec<f64>,
}

impl Particles {
    pub fn len(&self) -> usize { self.charges.len() }
    pub fn is_empty(&self) -> bool { self.charges.is_empty() }

    pub fn load(path: impl AsRef<Path>) -> FailResult<Particles> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| format_err!("could not read {}: {}", path.display(), e))?;
        Particles::parse(&text)
            .map_err(|e| format_err!("{}: {}", path.display(), e))
    }

    pub fn parse(text: &str) -> FailResult<Particles> {
        let mut positions = vec![];
        let mut charges = vec![];

        for (index, line) in text.lines().enumerate() {
            let end = line.find('#').unwrap_or(line.len());
            let line = line[..end].trim();
            if line.is_empty() {
                continue;
            }

            let words: Vec<_> = line.split_whitespace().collect();
            if words.len() != 4 {
                bail!(
                    "line {}: expected `x y z q` (4 values), got {}",
                    index + 1, words.len(),
                );
            }

            let mut values = [0.0; 4];
            for (value, word) in values.iter_mut().zip(&words) {
                *value = word.parse().map_err(|_| {
                    format_err!("line {}: {:?} is not a valid floating point number", index + 1, word)
                })?;
            }

            positions.push([values[0], values[1], values[2]]);
            charges.push(values[3]);
        }

        Ok(Particles { positions, charges })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blanks() {
        let text = "\
# a sodium chloride pair
0 0 0  1.0
\t
2 0 0 -1.0  # chloride
";
        let particles = Particles::parse(text).unwrap();
        assert_eq!(particles.len(), 2);
        assert_eq!(particles.positions, vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        assert_eq!(particles.charges, vec![1.0, -1.0]);
    }

    #[test]
    fn errors_name_the_line() {
        let text = "0 0 0 1.0\n0 0 nope 1.0\n";
        let err = Particles::parse(text).unwrap_err().to_string();
        assert!(err.contains("line 2"), "{}", err);
        assert!(err.contains("nope"), "{}", err);

        let err = Particles::parse("0 0 0\n").unwrap_err().to_string();
        assert!(err.contains("4 values"), "{}", err);
    }
}
