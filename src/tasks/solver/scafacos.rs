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

//! All usage of the public API presented by `fcs2_scafacos_wrap` is
//! encapsulated here.
//!
//! The purpose of this module is to translate the typed per-method config
//! into the library's `name,value` parameter vocabulary, which is a decision
//! `fcs2_scafacos_wrap` has largely chosen to defer.

use super::{SolveFn, SolverBuilder, SolveOutput, SolverEnv, System, energy_from_potentials};
use crate::FailResult;
use crate::charges::ChargeStats;
use fcs2_tasks_config as cfg;

use fcs2_scafacos_wrap::{Common, FcsOnDemand, Fcs, Method, Param};
use fcs2_scafacos_wrap::Builder as InnerBuilder;

/// A bundle of everything we need to initialize a solver handle.
///
/// It is nothing more than a bundle of configuration.
#[derive(Clone)]
pub(crate) struct Builder {
    kind: cfg::ScafacosMethodKind,
    on_demand: FcsOnDemand,
}

impl Builder {
    pub(crate) fn new(kind: cfg::ScafacosMethodKind, env: SolverEnv) -> FailResult<Builder>
    {Ok({
        let on_demand = match env.on_demand {
            Some(on_demand) => on_demand,
            None => bail!(
                "the external library is MPI-collective; \
                 its solvers are only available from the fcs2 entry points",
            ),
        };
        Builder { kind, on_demand }
    })}
}

impl SolverBuilder for Builder {
    fn initialize_solve_fn(&self, system: &System) -> FailResult<Box<dyn SolveFn>> {
        let (method, params) = translate(&self.kind);

        let mut inner = InnerBuilder::new();
        inner.params(params);
        inner.compute_virial(system.compute_virial);
        if let Some(r_cut) = system.r_cut {
            inner.r_cut(r_cut);
        }

        let cfg::Cell { a, b, c, offset, periodicity } = system.cell.clone();
        let common = Common {
            box_a: a,
            box_b: b,
            box_c: c,
            offset,
            periodicity,
            total_particles: 0, // brought up to date on every run
            near_field_flag: system.near_field,
        };

        let fcs = inner.build_on_demand(self.on_demand.clone(), method, common)?;
        Ok(Box::new(ScafacosFn { fcs, compute_virial: system.compute_virial }))
    }
}

struct ScafacosFn {
    fcs: Fcs,
    compute_virial: bool,
}

impl SolveFn for ScafacosFn {
    fn compute(&mut self, positions: &[[f64; 3]], charges: &[f64]) -> FailResult<SolveOutput>
    {Ok({
        let stats = ChargeStats::compute(charges);
        debug!(
            "scafacos {}: {} charged particles, sum q^2 = {:e}, (sum q)^2 = {:e}",
            self.fcs.method(), stats.num_charged, stats.sum_q2, stats.square_sum_q,
        );

        let out = self.fcs.run(positions, charges)?;
        let virial = match self.compute_virial {
            true => Some(self.fcs.virial()?),
            false => None,
        };

        SolveOutput {
            energy: energy_from_potentials(charges, &out.potentials),
            potentials: out.potentials,
            fields: out.fields,
            virial,
        }
    })}
}

// Sending `Builder` across threads is fine; `FcsOnDemand` is a handle to the
// dispatch shared by all of them, and actually *using* it is serialized by
// the wrapper's instance lock.
unsafe impl Send for Builder {}
unsafe impl Sync for Builder {}

/// Lower the typed per-method config into the library's parameter names.
///
/// Only parameters the user actually set are emitted; the library's tuning
/// phase fills in the rest.
fn translate(kind: &cfg::ScafacosMethodKind) -> (Method, Vec<Param>) {
    use cfg::ScafacosMethodKind as K;

    let mut params: Vec<Param> = vec![];
    macro_rules! push {
        ($name:expr, $value:expr) => { params.push(Param::new($name, $value)) };
    }
    macro_rules! push_opt {
        ($name:expr, $value:expr) => {
            if let Some(value) = $value { params.push(Param::new($name, value)) }
        };
    }

    let method = match kind {
        K::Direct(direct) => {
            push!("direct_cutoff", direct.cutoff);
            push!("direct_periodic_images", direct.periodic_images);
            Method::Direct
        },
        K::Ewald(ewald) => {
            push_opt!("ewald_r_cut", ewald.cutoff);
            push_opt!("ewald_kmax", ewald.kmax);
            push_opt!("ewald_maxkmax", ewald.maxkmax);
            push_opt!("ewald_alpha", ewald.alpha);
            push_opt!("tolerance_field", ewald.tolerance_field);
            Method::Ewald
        },
        K::Fmm(fmm) => {
            match fmm.tolerance {
                cfg::FmmTolerance::Absolute(value) => {
                    push!("fmm_absrel", 0i64);
                    push!("fmm_tolerance_energy", value);
                },
                cfg::FmmTolerance::Relative(value) => {
                    push!("fmm_absrel", 1i64);
                    push!("fmm_tolerance_energy", value);
                },
            }
            push!("fmm_dipole_correction", fmm.dipole_correction);
            push!("fmm_internal_tuning", fmm.internal_tuning);
            match fmm.potential {
                cfg::FmmPotential::Coulomb => push!("fmm_potential", 0i64),
                cfg::FmmPotential::Cusp { radius } => {
                    push!("fmm_potential", 1i64);
                    push!("fmm_cusp_radius", radius);
                },
            }
            Method::Fmm
        },
        K::Memd(memd) => {
            push!("memd_timestep", memd.timestep);
            push!("memd_mesh_size", memd.mesh_size);
            push!("memd_lightspeed", memd.lightspeed);
            push!("memd_temperature", memd.temperature);
            push!("memd_permittivity", memd.permittivity);
            Method::Memd
        },
        K::Mmm1d(mmm1d) => {
            push_opt!("mmm1d_far_switch_radius", mmm1d.far_switch_radius);
            push_opt!("mmm1d_bessel_cutoff", mmm1d.bessel_cutoff);
            push!("mmm1d_maximum_pairwise_error", mmm1d.max_pw_error);
            Method::Mmm1d
        },
        K::Mmm2d(mmm2d) => {
            push!("mmm2d_maximum_pairwise_error", mmm2d.max_pw_error);
            push_opt!("mmm2d_far_cutoff", mmm2d.far_cutoff);
            push!("mmm2d_delta_top", mmm2d.delta_top);
            push!("mmm2d_delta_bot", mmm2d.delta_bot);
            push_opt!("mmm2d_layers_per_node", mmm2d.layers_per_node);
            push_opt!("mmm2d_skin", mmm2d.skin);
            push!("mmm2d_require_total_energy", mmm2d.require_total_energy);
            Method::Mmm2d
        },
        K::P2nfft(p2nfft) => {
            push_opt!("p2nfft_r_cut", p2nfft.cutoff);
            if let Some(tolerance) = p2nfft.tolerance {
                let (name, value) = match tolerance {
                    cfg::P2nfftTolerance::Energy(x) => ("tolerance_energy", x),
                    cfg::P2nfftTolerance::EnergyRel(x) => ("tolerance_energy_rel", x),
                    cfg::P2nfftTolerance::Potential(x) => ("tolerance_potential", x),
                    cfg::P2nfftTolerance::PotentialRel(x) => ("tolerance_potential_rel", x),
                    cfg::P2nfftTolerance::Field(x) => ("tolerance_field", x),
                    cfg::P2nfftTolerance::FieldRel(x) => ("tolerance_field_rel", x),
                };
                push!(name, value);
            }
            push_opt!("p2nfft_alpha", p2nfft.alpha);
            push_opt!("p2nfft_m", p2nfft.m);
            push_opt!("p2nfft_grid", p2nfft.grid);
            push_opt!("p2nfft_oversampled_grid", p2nfft.oversampled_grid);
            Method::P2nfft
        },
        K::Pepc(pepc) => {
            push!("pepc_epsilon", pepc.epsilon);
            push!("pepc_theta", pepc.theta);
            push!("pepc_dipole_correction", pepc.dipole_correction);
            Method::Pepc
        },
        K::Pp3mg(pp3mg) => {
            push_opt!("pp3mg_cells", pp3mg.cells);
            push_opt!("pp3mg_ghosts", pp3mg.ghosts);
            push_opt!("pp3mg_degree", pp3mg.degree);
            push_opt!("pp3mg_max_particles", pp3mg.max_particles);
            push_opt!("pp3mg_max_iterations", pp3mg.max_iterations);
            push_opt!("pp3mg_tolerance", pp3mg.tolerance);
            Method::Pp3mg
        },
        K::Vmg(vmg) => {
            push_opt!("vmg_max_level", vmg.max_level);
            push_opt!("vmg_max_iterations", vmg.max_iterations);
            push_opt!("vmg_smoothing_steps", vmg.smoothing_steps);
            push_opt!("vmg_precision", vmg.precision);
            push_opt!("vmg_near_field_cells", vmg.near_field_cells);
            push_opt!("vmg_interpolation_order", vmg.interpolation_order);
            push_opt!("vmg_discretization_order", vmg.discretization_order);
            push!("vmg_cycle_type", match vmg.cycle_type {
                cfg::CycleType::V => 1i64,
                cfg::CycleType::W => 2i64,
            });
            Method::Vmg
        },
        K::P3m(p3m) => {
            push_opt!("p3m_r_cut", p3m.r_cut);
            push_opt!("p3m_grid", p3m.grid);
            push_opt!("p3m_cao", p3m.cao);
            push_opt!("p3m_alpha", p3m.alpha);
            push!("tolerance_field", p3m.tolerance_field);
            Method::P3m
        },
    };

    (method, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcs2_scafacos_wrap::render_parameter_string;

    fn rendered(kind: &cfg::ScafacosMethodKind) -> (Method, String) {
        let (method, params) = translate(kind);
        (method, render_parameter_string(&params))
    }

    #[test]
    fn p3m_emits_only_what_was_set() {
        let (method, params) = rendered(&cfg::ScafacosMethodKind::P3m(cfg::MethodP3m {
            r_cut: Some(3.0),
            cao: Some(7),
            ..Default::default()
        }));
        assert_eq!(method, Method::P3m);
        assert_eq!(params, "p3m_r_cut,3,p3m_cao,7,tolerance_field,0.001");
    }

    #[test]
    fn fmm_tolerance_lowering() {
        let (method, params) = rendered(&cfg::ScafacosMethodKind::Fmm(cfg::MethodFmm {
            tolerance: cfg::FmmTolerance::Relative(1e-4),
            dipole_correction: false,
            internal_tuning: true,
            potential: cfg::FmmPotential::Coulomb,
        }));
        assert_eq!(method, Method::Fmm);
        assert_eq!(
            params,
            "fmm_absrel,1,fmm_tolerance_energy,0.0001,\
             fmm_dipole_correction,0,fmm_internal_tuning,1,fmm_potential,0",
        );
    }

    #[test]
    fn direct_images_flatten() {
        let (method, params) = rendered(&cfg::ScafacosMethodKind::Direct(cfg::MethodDirect {
            cutoff: 0.0,
            periodic_images: [1, 1, 2],
        }));
        assert_eq!(method, Method::Direct);
        assert_eq!(params, "direct_cutoff,0,direct_periodic_images,1,1,2");
    }
}
