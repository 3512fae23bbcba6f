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

//! Dispatch from config to a Coulomb solver.
//!
//! Configuration is read to produce a [`SolverBuilder`] trait object. A
//! trait is used instead of an enum to localize the impact that newly added
//! backends have on the rest of the codebase. When it is time to compute,
//! you build the [`SolveFn`], which does the potentially expensive
//! initialization (possibly calling out to external C APIs), and which
//! should be kept alive across repeated computations so that re-tuning only
//! happens when something changed.

use crate::FailResult;
use fcs2_tasks_config as cfg;

mod direct;
mod test_functions;
#[cfg(feature = "scafacos-support")]
mod scafacos;

/// The method-independent description of the problem: box geometry and the
/// toggles every backend understands.
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub cell: cfg::Cell,
    /// Override the near-field cutoff chosen by tuning.
    pub r_cut: Option<f64>,
    /// The caller computes the near-field part itself.
    pub near_field: bool,
    pub compute_virial: bool,
}

impl System {
    pub fn from_settings(settings: &cfg::Settings) -> System {
        System {
            cell: settings.cell.clone(),
            r_cut: settings.coulomb.r_cut,
            near_field: settings.coulomb.near_field,
            compute_virial: settings.coulomb.virial,
        }
    }
}

/// Per-particle results of one solve pass.
///
/// `fields` holds the electric field at each particle; the force on particle
/// `i` is `charges[i] * fields[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutput {
    pub energy: f64,
    pub potentials: Vec<f64>,
    pub fields: Vec<[f64; 3]>,
    /// Present when the system asked for the virial.
    pub virial: Option<[[f64; 3]; 3]>,
}

/// Environment handles a backend may need; passed through from `main`.
#[derive(Clone, Default)]
pub struct SolverEnv {
    /// Multi-process driving of the external library.
    #[cfg(feature = "scafacos-support")]
    pub on_demand: Option<fcs2_scafacos_wrap::FcsOnDemand>,
}

pub trait SolverBuilder: Send + Sync {
    fn initialize_solve_fn(&self, system: &System) -> FailResult<Box<dyn SolveFn>>;
}

pub trait SolveFn {
    fn compute(&mut self, positions: &[[f64; 3]], charges: &[f64]) -> FailResult<SolveOutput>;
}

/// Resolve the configured method into a backend.
pub fn from_config(coulomb: &cfg::Coulomb, env: &SolverEnv) -> FailResult<Box<dyn SolverBuilder>> {
    let cfg::ValidatedMethod(kind) = &coulomb.method;
    match kind {
        cfg::MethodKind::Direct(params) => {
            Ok(Box::new(direct::Builder::new(params)))
        },
        cfg::MethodKind::TestZero => {
            Ok(Box::new(test_functions::Zero))
        },
        #[cfg(feature = "scafacos-support")]
        cfg::MethodKind::Scafacos(kind) => {
            Ok(Box::new(scafacos::Builder::new(kind.clone(), env.clone())?))
        },
        #[cfg(not(feature = "scafacos-support"))]
        cfg::MethodKind::Scafacos(kind) => {
            let _ = env;
            bail!(
                "the `{}` solver lives in the external library; \
                 recompile with --features=scafacos-support", kind.name(),
            );
        },
    }
}

/// `E = 0.5 * sum(q_i * phi_i)`
pub fn energy_from_potentials(charges: &[f64], potentials: &[f64]) -> f64 {
    0.5 * charges.iter().zip(potentials).map(|(q, phi)| q * phi).sum::<f64>()
}
