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

use std::fmt;

/// A solver method implemented by the external library.
///
/// The method is fixed at handle initialization; switching methods means
/// building a new [`crate::Fcs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Direct,
    Ewald,
    Fmm,
    Memd,
    Mmm1d,
    Mmm2d,
    P2nfft,
    Pepc,
    Pp3mg,
    Vmg,
    P3m,
}

impl Method {
    /// The name understood by the library's init call.
    pub fn name(self) -> &'static str {
        match self {
            Method::Direct => "direct",
            Method::Ewald => "ewald",
            Method::Fmm => "fmm",
            Method::Memd => "memd",
            Method::Mmm1d => "mmm1d",
            Method::Mmm2d => "mmm2d",
            Method::P2nfft => "p2nfft",
            Method::Pepc => "pepc",
            Method::Pp3mg => "pp3mg",
            Method::Vmg => "vmg",
            Method::P3m => "p3m",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL.iter().cloned().find(|m| m.name() == name)
    }

    pub const ALL: &'static [Method] = &[
        Method::Direct, Method::Ewald, Method::Fmm, Method::Memd,
        Method::Mmm1d, Method::Mmm2d, Method::P2nfft, Method::Pepc,
        Method::Pp3mg, Method::Vmg, Method::P3m,
    ];

    // integer tags for communicating the selection between processes
    pub(crate) fn to_int(self) -> i64 {
        Method::ALL.iter().position(|&m| m == self).unwrap() as i64
    }

    pub(crate) fn from_int(x: i64) -> Option<Method> {
        Method::ALL.get(x as usize).cloned()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    { write!(f, "{}", self.name()) }
}

/// Method-independent configuration handed to the library before tuning.
///
/// This is the full argument set of the library's common setter; all
/// processes must agree on it before any collective solve step.
#[derive(Debug, Clone, PartialEq)]
pub struct Common {
    pub box_a: [f64; 3],
    pub box_b: [f64; 3],
    pub box_c: [f64; 3],
    /// Origin of the box (the library calls this the box offset).
    pub offset: [f64; 3],
    pub periodicity: [bool; 3],
    /// Total particle count across all processes.
    pub total_particles: usize,
    /// Whether the caller computes the near-field contribution itself,
    /// leaving only the far field to the library.
    pub near_field_flag: bool,
}

impl Common {
    /// An orthorhombic box with the given edge lengths, fully periodic.
    pub fn orthorhombic(lengths: [f64; 3]) -> Common {
        Common {
            box_a: [lengths[0], 0.0, 0.0],
            box_b: [0.0, lengths[1], 0.0],
            box_c: [0.0, 0.0, lengths[2]],
            offset: [0.0; 3],
            periodicity: [true; 3],
            total_particles: 0,
            near_field_flag: false,
        }
    }
}

/// One solver-specific setting, in the library's `name,value` vocabulary.
///
/// The library exposes a generic string interface for these
/// (`"p3m_r_cut,1.2,p3m_grid,64"`); this type exists so that the values
/// passing through it are typed until the last moment.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    value: ParamValue,
}

impl Param {
    pub fn new(name: impl ToString, value: impl Into<ParamValue>) -> Param
    { Param { name: name.to_string(), value: value.into() } }

    pub fn name(&self) -> &str { &self.name }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

impl From<i64> for ParamValue { fn from(x: i64) -> Self { ParamValue::Int(x) } }
impl From<u32> for ParamValue { fn from(x: u32) -> Self { ParamValue::Int(x as i64) } }
impl From<f64> for ParamValue { fn from(x: f64) -> Self { ParamValue::Float(x) } }
impl From<bool> for ParamValue { fn from(x: bool) -> Self { ParamValue::Bool(x) } }
impl From<[u32; 3]> for ParamValue {
    fn from(x: [u32; 3]) -> Self { ParamValue::Ints(x.iter().map(|&v| v as i64).collect()) }
}
impl From<[f64; 3]> for ParamValue {
    fn from(x: [f64; 3]) -> Self { ParamValue::Floats(x.to_vec()) }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        match &self.value {
            ParamValue::Int(x) => write!(f, ",{}", x),
            ParamValue::Float(x) => write!(f, ",{}", x),
            // the library reads bools as 0/1
            ParamValue::Bool(x) => write!(f, ",{}", *x as i32),
            ParamValue::Ints(xs) => {
                for x in xs { write!(f, ",{}", x)?; }
                Ok(())
            },
            ParamValue::Floats(xs) => {
                for x in xs { write!(f, ",{}", x)?; }
                Ok(())
            },
        }
    }
}

/// Renders settings into the comma-separated form accepted by the library's
/// generic parameter interface.
pub fn render_parameter_string(params: &[Param]) -> String {
    let mut out = String::new();
    for param in params {
        if !out.is_empty() {
            out.push(',');
        }
        out.push_str(&param.to_string());
    }
    out
}

/// Per-particle results of one solve pass.
///
/// `fields` holds the electric field at each particle (the force on particle
/// `i` is `charges[i] * fields[i]`); `potentials` the electrostatic potential.
/// The total Coulomb energy is `0.5 * sum(q[i] * potentials[i])`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub fields: Vec<[f64; 3]>,
    pub potentials: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_string() {
        let params = vec![
            Param::new("p3m_r_cut", 1.2),
            Param::new("p3m_grid", 64u32),
            Param::new("p3m_cao", 7u32),
            Param::new("direct_periodic_images", [1u32, 1, 2]),
            Param::new("fmm_internal_tuning", true),
        ];
        assert_eq!(
            render_parameter_string(&params),
            "p3m_r_cut,1.2,p3m_grid,64,p3m_cao,7,direct_periodic_images,1,1,2,fmm_internal_tuning,1",
        );
    }

    #[test]
    fn method_names_round_trip() {
        for &method in Method::ALL {
            assert_eq!(Method::from_name(method.name()), Some(method));
            assert_eq!(Method::from_int(method.to_int()), Some(method));
        }
        assert_eq!(Method::from_name("p3M"), None);
    }
}
