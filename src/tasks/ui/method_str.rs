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

//! The command-string form of the direct method, for interactive use and
//! scripts driving the CLI.
//!
//! Grammar (tokens are whitespace-separated):
//!
//! ```text
//! <cutoff> [<nx> <ny> <nz>]               positional
//! [cutoff <r>] [images <nx> <ny> <nz>]    named, in any order
//! ```

use crate::FailResult;
use fcs2_tasks_config as cfg;

pub fn parse_direct(words: &[&str]) -> FailResult<cfg::MethodDirect> {
    let mut cutoff = None;
    let mut images = None;

    // a leading number means the positional form
    if words.first().map_or(false, |word| word.parse::<f64>().is_ok()) {
        match words.len() {
            1 => cutoff = Some(parse_float(words[0])?),
            4 => {
                cutoff = Some(parse_float(words[0])?);
                images = Some([
                    parse_count(words[1])?,
                    parse_count(words[2])?,
                    parse_count(words[3])?,
                ]);
            },
            n => bail!("expected `<cutoff>` or `<cutoff> <nx> <ny> <nz>`, got {} tokens", n),
        }
    } else {
        let mut words = words.iter();
        while let Some(&word) = words.next() {
            let mut next = |what: &str| {
                words.next().cloned()
                    .ok_or_else(|| format_err!("missing {} after {:?}", what, word))
            };
            match word {
                "cutoff" => {
                    ensure!(cutoff.is_none(), "cutoff was given twice");
                    cutoff = Some(parse_float(next("a value")?)?);
                },
                "images" => {
                    ensure!(images.is_none(), "images was given twice");
                    images = Some([
                        parse_count(next("an image count")?)?,
                        parse_count(next("an image count")?)?,
                        parse_count(next("an image count")?)?,
                    ]);
                },
                word => bail!("unexpected token {:?} (expected `cutoff` or `images`)", word),
            }
        }
    }

    let direct = cfg::MethodDirect {
        cutoff: cutoff.unwrap_or(0.0),
        periodic_images: images.unwrap_or([1; 3]),
    };

    // same checks as for config files
    match cfg::MethodKind::Direct(direct).validate()? {
        cfg::ValidatedMethod(cfg::MethodKind::Direct(direct)) => Ok(direct),
        _ => unreachable!(),
    }
}

/// Inverse of [`parse_direct`]; produces the canonical named form.
pub fn format_direct(direct: &cfg::MethodDirect) -> String {
    let [nx, ny, nz] = direct.periodic_images;
    format!("cutoff {} images {} {} {}", direct.cutoff, nx, ny, nz)
}

fn parse_float(word: &str) -> FailResult<f64> {
    word.parse().map_err(|_| {
        format_err!("{:?} is not a valid floating point number", word)
    })
}

fn parse_count(word: &str) -> FailResult<u32> {
    word.parse().map_err(|_| {
        format_err!("{:?} is not a valid image count", word)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> FailResult<cfg::MethodDirect> {
        let words: Vec<_> = s.split_whitespace().collect();
        parse_direct(&words)
    }

    #[test]
    fn positional() {
        assert_eq!(parse("8.5").unwrap(), cfg::MethodDirect {
            cutoff: 8.5,
            periodic_images: [1; 3],
        });
        assert_eq!(parse("8.5 1 1 2").unwrap(), cfg::MethodDirect {
            cutoff: 8.5,
            periodic_images: [1, 1, 2],
        });
        assert!(parse("8.5 1").is_err());
    }

    #[test]
    fn named_in_any_order() {
        let expected = cfg::MethodDirect { cutoff: 4.0, periodic_images: [2, 2, 2] };
        assert_eq!(parse("cutoff 4.0 images 2 2 2").unwrap(), expected);
        assert_eq!(parse("images 2 2 2 cutoff 4.0").unwrap(), expected);
    }

    #[test]
    fn empty_gives_defaults() {
        assert_eq!(parse("").unwrap(), cfg::MethodDirect::default());
    }

    #[test]
    fn errors_name_the_token() {
        let err = parse("cutoff abc").unwrap_err().to_string();
        assert!(err.contains("abc"), "{}", err);

        let err = parse("cutof 4.0").unwrap_err().to_string();
        assert!(err.contains("cutof"), "{}", err);

        let err = parse("images 1 1").unwrap_err().to_string();
        assert!(err.contains("image count"), "{}", err);
    }

    #[test]
    fn same_validation_as_config_files() {
        assert!(parse("-3.0").is_err());
    }

    #[test]
    fn round_trip() {
        for s in &["cutoff 8.5 images 1 1 2", "cutoff 0 images 1 1 1"] {
            let direct = parse(s).unwrap();
            assert_eq!(format_direct(&direct), *s);
            assert_eq!(parse(&format_direct(&direct)).unwrap(), direct);
        }
    }
}
