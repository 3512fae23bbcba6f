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

use crate::FailResult;
use crate::charges::ChargeStats;
use crate::filetypes::Particles;
use crate::solver::{self, SolveOutput, SolverEnv, System};

use fcs2_tasks_config as cfg;

/// One solve pass over the given particles, with everything else taken from
/// the settings.
pub fn run_solve(
    settings: &cfg::ValidatedSettings,
    particles: &Particles,
    env: &SolverEnv,
) -> FailResult<SolveOutput> {
    let cfg::ValidatedSettings(settings) = settings;

    ensure!(!particles.is_empty(), "the particle file contains no particles");

    let stats = ChargeStats::compute(&particles.charges);
    info!(
        "{} particles, {} of them charged (sum q^2 = {:e})",
        particles.len(), stats.num_charged, stats.sum_q2,
    );
    if stats.num_charged == 0 {
        warn!("no particle carries a charge; all results will be zero");
    }
    if stats.square_sum_q > 1e-10 {
        // periodic Coulomb sums are only conditionally convergent then
        warn!("the system is not charge-neutral ((sum q)^2 = {:e})", stats.square_sum_q);
    }

    let system = System::from_settings(settings);
    let builder = solver::from_config(&settings.coulomb, env)?;
    let mut solve_fn = builder.initialize_solve_fn(&system)?;

    let out = solve_fn.compute(&particles.positions, &particles.charges)?;
    info!("coulomb energy: {:.10e}", out.energy);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfg::YamlRead;

    fn settings(yaml: &str) -> cfg::ValidatedSettings {
        YamlRead::from_reader(yaml.as_bytes()).unwrap()
    }

    #[test]
    fn zero_solver_end_to_end() {
        let settings = settings(r#"
box: {a: [10, 0, 0], b: [0, 10, 0], c: [0, 0, 10]}
coulomb: {method: zero}
"#);
        let particles = Particles::parse("0 0 0 1.0\n1 1 1 -1.0\n").unwrap();

        let out = run_solve(&settings, &particles, &SolverEnv::default()).unwrap();
        assert_eq!(out.energy, 0.0);
        assert_eq!(out.fields.len(), 2);
        assert_eq!(out.virial, None);
    }

    #[test]
    fn empty_input_is_an_error() {
        let settings = settings(r#"
box: {a: [10, 0, 0], b: [0, 10, 0], c: [0, 0, 10]}
coulomb: {method: zero}
"#);
        let particles = Particles::parse("# nothing here\n").unwrap();
        assert!(run_solve(&settings, &particles, &SolverEnv::default()).is_err());
    }

    #[cfg(not(feature = "scafacos-support"))]
    #[test]
    fn external_methods_explain_the_missing_feature() {
        let settings = settings(r#"
box: {a: [10, 0, 0], b: [0, 10, 0], c: [0, 0, 10]}
coulomb:
  method:
    scafacos: {p3m: {}}
"#);
        let particles = Particles::parse("0 0 0 1.0\n").unwrap();
        let err = run_solve(&settings, &particles, &SolverEnv::default())
            .unwrap_err().to_string();
        assert!(err.contains("scafacos-support"), "{}", err);
    }
}
