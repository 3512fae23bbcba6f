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

//! Direct summation over explicit periodic images, implemented natively.
//!
//! This is O(n^2) per image shell and is the reference implementation the
//! external couplings are checked against. Energies are Gaussian-units
//! Coulomb: `E = sum_pairs q_i q_j / r`.

use super::{SolveFn, SolverBuilder, SolveOutput, System, energy_from_potentials};
use crate::FailResult;
use fcs2_tasks_config as cfg;

// Below this separation two particles are considered coincident, which
// direct summation cannot represent.
const MIN_SEPARATION: f64 = 1e-12;

#[derive(Debug, Clone)]
pub(crate) struct Builder {
    params: cfg::MethodDirect,
}

impl Builder {
    pub(crate) fn new(params: &cfg::MethodDirect) -> Builder
    { Builder { params: params.clone() } }
}

impl SolverBuilder for Builder {
    fn initialize_solve_fn(&self, system: &System) -> FailResult<Box<dyn SolveFn>> {
        if system.near_field {
            warn!("the native direct backend computes the full sum; `near-field` is ignored");
        }

        let cfg::Cell { a, b, c, periodicity, .. } = system.cell.clone();

        // non-periodic directions contribute no images
        let mut images = [0i64; 3];
        for axis in 0..3 {
            if periodicity[axis] {
                images[axis] = i64::from(self.params.periodic_images[axis]);
            }
        }

        Ok(Box::new(DirectSum {
            cell: [a, b, c],
            images,
            cutoff: system.r_cut.unwrap_or(self.params.cutoff),
            compute_virial: system.compute_virial,
        }))
    }
}

struct DirectSum {
    cell: [[f64; 3]; 3],
    images: [i64; 3],
    /// `0` disables the cutoff.
    cutoff: f64,
    compute_virial: bool,
}

impl SolveFn for DirectSum {
    fn compute(&mut self, positions: &[[f64; 3]], charges: &[f64]) -> FailResult<SolveOutput>
    {Ok({
        ensure!(
            positions.len() == charges.len(),
            "got {} positions for {} charges", positions.len(), charges.len(),
        );
        let n = charges.len();
        let [na, nb, nc] = self.images;

        let mut potentials = vec![0.0; n];
        let mut fields = vec![[0.0; 3]; n];
        let mut virial = [[0.0; 3]; 3];

        for (sa, sb, sc) in iproduct!(-na..=na, -nb..=nb, -nc..=nc) {
            let shift = combination(&self.cell, [sa as f64, sb as f64, sc as f64]);
            let home_box = (sa, sb, sc) == (0, 0, 0);

            for i in 0..n {
                for j in 0..n {
                    if home_box && i == j {
                        continue;
                    }

                    // vector from the image of j to i
                    let r = sub(positions[i], add(positions[j], shift));
                    let dist = norm(r);

                    ensure!(
                        dist > MIN_SEPARATION,
                        "particles {} and {} coincide (distance {:e})", i, j, dist,
                    );
                    if self.cutoff > 0.0 && dist > self.cutoff {
                        continue;
                    }

                    potentials[i] += charges[j] / dist;

                    let inv_r3 = 1.0 / (dist * dist * dist);
                    for axis in 0..3 {
                        fields[i][axis] += charges[j] * r[axis] * inv_r3;
                    }

                    if self.compute_virial {
                        // every ordered pair appears twice, hence the 0.5
                        let w = 0.5 * charges[i] * charges[j] * inv_r3;
                        for row in 0..3 {
                            for col in 0..3 {
                                virial[row][col] += w * r[row] * r[col];
                            }
                        }
                    }
                }
            }
        }

        SolveOutput {
            energy: energy_from_potentials(charges, &potentials),
            potentials,
            fields,
            virial: if self.compute_virial { Some(virial) } else { None },
        }
    })}
}

fn add(u: [f64; 3], v: [f64; 3]) -> [f64; 3]
{ [u[0] + v[0], u[1] + v[1], u[2] + v[2]] }

fn sub(u: [f64; 3], v: [f64; 3]) -> [f64; 3]
{ [u[0] - v[0], u[1] - v[1], u[2] - v[2]] }

fn norm(v: [f64; 3]) -> f64
{ (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt() }

fn combination(cell: &[[f64; 3]; 3], coeffs: [f64; 3]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for axis in 0..3 {
        for (vector, coeff) in cell.iter().zip(&coeffs) {
            out[axis] += coeff * vector[axis];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn isolated_system() -> System {
        let mut cell = cfg::Cell::orthorhombic([20.0; 3]);
        cell.periodicity = [false; 3];
        System { cell, r_cut: None, near_field: false, compute_virial: false }
    }

    fn periodic_system(length: f64) -> System {
        System {
            cell: cfg::Cell::orthorhombic([length; 3]),
            r_cut: None,
            near_field: false,
            compute_virial: false,
        }
    }

    fn solve(
        params: cfg::MethodDirect,
        system: &System,
        positions: &[[f64; 3]],
        charges: &[f64],
    ) -> SolveOutput {
        Builder::new(&params)
            .initialize_solve_fn(system).unwrap()
            .compute(positions, charges).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-10, "{} vs {}", a, b);
    }

    #[test]
    fn opposite_charges() {
        let out = solve(
            Default::default(),
            &isolated_system(),
            &[[0.0; 3], [2.0, 0.0, 0.0]],
            &[1.0, -1.0],
        );

        // E = q1 q2 / r
        assert_close(out.energy, -0.5);
        assert_close(out.potentials[0], -0.5);
        assert_close(out.potentials[1], 0.5);
        // the field pulls the positive charge towards the negative one
        assert_close(out.fields[0][0], 0.25);
        assert_close(out.fields[1][0], -0.25);
        assert_close(out.fields[0][1], 0.0);
    }

    #[test]
    fn cutoff_excludes_distant_pairs() {
        let positions = [[0.0; 3], [5.0, 0.0, 0.0]];
        let charges = [1.0, 1.0];

        let params = cfg::MethodDirect { cutoff: 4.0, ..Default::default() };
        let out = solve(params, &isolated_system(), &positions, &charges);
        assert_close(out.energy, 0.0);

        let params = cfg::MethodDirect { cutoff: 6.0, ..Default::default() };
        let out = solve(params, &isolated_system(), &positions, &charges);
        assert_close(out.energy, 0.2);
    }

    #[test]
    fn global_r_cut_overrides_method_cutoff() {
        let positions = [[0.0; 3], [5.0, 0.0, 0.0]];
        let charges = [1.0, 1.0];

        let mut system = isolated_system();
        system.r_cut = Some(4.0);
        let params = cfg::MethodDirect { cutoff: 6.0, ..Default::default() };
        let out = solve(params, &system, &positions, &charges);
        assert_close(out.energy, 0.0);
    }

    #[test]
    fn single_charge_interacts_with_its_images() {
        let length = 10.0;
        let params = cfg::MethodDirect { periodic_images: [1, 0, 0], ..Default::default() };
        let out = solve(params, &periodic_system(length), &[[1.0; 3]], &[1.0]);

        // one image on each side: E = 0.5 * q * (q/L + q/L) = q^2 / L
        assert_close(out.energy, 1.0 / length);
        // which exert no net field by symmetry
        assert_close(out.fields[0][0], 0.0);
    }

    #[test]
    fn non_periodic_directions_get_no_images() {
        let mut system = periodic_system(10.0);
        system.cell.periodicity = [false; 3];

        let params = cfg::MethodDirect { periodic_images: [2, 2, 2], ..Default::default() };
        let out = solve(params, &system, &[[1.0; 3]], &[1.0]);
        assert_close(out.energy, 0.0);
    }

    #[test]
    fn forces_sum_to_zero() {
        let mut rng = rand::thread_rng();
        let n = 8;
        let positions: Vec<[f64; 3]> = (0..n)
            .map(|_| [rng.gen_range(0.0, 10.0), rng.gen_range(0.0, 10.0), rng.gen_range(0.0, 10.0)])
            .collect();
        let charges: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0, 1.0)).collect();

        let out = solve(Default::default(), &periodic_system(10.0), &positions, &charges);

        for axis in 0..3 {
            let total: f64 = out.fields.iter().zip(&charges)
                .map(|(field, q)| q * field[axis])
                .sum();
            assert!(total.abs() < 1e-9, "net force along {}: {}", axis, total);
        }
    }

    #[test]
    fn energy_is_translation_invariant() {
        let mut rng = rand::thread_rng();
        let n = 6;
        let positions: Vec<[f64; 3]> = (0..n)
            .map(|_| [rng.gen_range(0.0, 10.0), rng.gen_range(0.0, 10.0), rng.gen_range(0.0, 10.0)])
            .collect();
        let charges: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0, 1.0)).collect();

        let shifted: Vec<[f64; 3]> = positions.iter()
            .map(|&p| add(p, [1.25, -3.5, 0.75]))
            .collect();

        let system = periodic_system(10.0);
        let before = solve(Default::default(), &system, &positions, &charges);
        let after = solve(Default::default(), &system, &shifted, &charges);
        assert_close(before.energy, after.energy);
    }

    #[test]
    fn coincident_particles_are_an_error() {
        let result = Builder::new(&Default::default())
            .initialize_solve_fn(&isolated_system()).unwrap()
            .compute(&[[1.0; 3], [1.0; 3]], &[1.0, 1.0]);
        assert!(result.is_err());
    }

    #[test]
    fn virial_is_symmetric() {
        let mut system = isolated_system();
        system.compute_virial = true;

        let out = solve(
            Default::default(),
            &system,
            &[[0.0; 3], [2.0, 1.0, 0.0], [0.0, 3.0, 1.0]],
            &[1.0, -1.0, 0.5],
        );
        let virial = out.virial.unwrap();
        for row in 0..3 {
            for col in 0..3 {
                assert_close(virial[row][col], virial[col][row]);
            }
        }
        // the trace of the Coulomb virial equals the energy
        assert_close(virial[0][0] + virial[1][1] + virial[2][2], out.energy);
    }
}
