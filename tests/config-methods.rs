//! Interface-conformance checks: every solver method's parameter record is
//! reachable from a config file under its documented field names.

extern crate fcs2_tasks_config;

use fcs2_tasks_config as cfg;
use cfg::YamlRead;

fn method(yaml: &str) -> cfg::ValidatedMethod {
    match cfg::ValidatedMethod::from_reader(yaml.as_bytes()) {
        Ok(method) => method,
        Err(e) => panic!("{}:\n{}", e, yaml),
    }
}

#[test]
fn every_external_method_parses() {
    let configs = [
        "{scafacos: {direct: {cutoff: 4.0, periodic-images: [1, 1, 1]}}}",
        "{scafacos: {ewald: {cutoff: 3.0, kmax: 16, maxkmax: 32, alpha: 0.3, tolerance-field: 1e-4}}}",
        "{scafacos: {fmm: {tolerance: {absolute: 1e-3}, dipole-correction: true, potential: coulomb}}}",
        "{scafacos: {memd: {timestep: 0.01, mesh-size: 32, lightspeed: 0.5, temperature: 1.0}}}",
        "{scafacos: {mmm1d: {far-switch-radius: 6.0, bessel-cutoff: 3, max-pw-error: 1e-4}}}",
        "{scafacos: {mmm2d: {max-pw-error: 1e-3, delta-top: 0.1, delta-bot: 0.1, layers-per-node: 2}}}",
        "{scafacos: {p2nfft: {cutoff: 3.0, tolerance: {field: 1e-4}, m: 4, grid: [64, 64, 64]}}}",
        "{scafacos: {pepc: {epsilon: 0.05, theta: 0.6}}}",
        "{scafacos: {pp3mg: {cells: [64, 64, 64], ghosts: 4, max-iterations: 50, tolerance: 1e-6}}}",
        "{scafacos: {vmg: {max-level: 6, smoothing-steps: 3, precision: 1e-6, cycle-type: w}}}",
        "{scafacos: {p3m: {r-cut: 3.0, grid: 64, cao: 7, alpha: 0.27, tolerance-field: 1e-4}}}",
    ];

    for yaml in &configs {
        let cfg::ValidatedMethod(kind) = method(yaml);
        match kind {
            cfg::MethodKind::Scafacos(..) => {},
            kind => panic!("{} parsed to a non-scafacos method: {:?}", yaml, kind),
        }
    }
}

#[test]
fn the_native_methods_parse() {
    assert_eq!(
        method("{direct: {cutoff: 8.5}}").0,
        cfg::MethodKind::Direct(cfg::MethodDirect {
            cutoff: 8.5,
            periodic_images: [1; 3],
        }),
    );
    assert_eq!(method("zero").0, cfg::MethodKind::TestZero);
}

#[test]
fn field_typos_do_not_silently_pass_validation() {
    // unknown fields only warn (serde_ignored), but misspelled *required*
    // fields are still an error
    assert!(cfg::ValidatedMethod::from_reader(
        "{scafacos: {pepc: {epsilonn: 0.05, theta: 0.6}}}".as_bytes(),
    ).is_err());
}

#[test]
fn defaults_fill_in_a_minimal_p3m() {
    let cfg::ValidatedMethod(kind) = method("{scafacos: {p3m: {}}}");
    match kind {
        cfg::MethodKind::Scafacos(cfg::ScafacosMethodKind::P3m(p3m)) => {
            assert_eq!(p3m.r_cut, None);
            assert_eq!(p3m.grid, None);
            assert_eq!(p3m.cao, None);
            assert_eq!(p3m.alpha, None);
            assert_eq!(p3m.tolerance_field, 1e-3);
        },
        kind => panic!("parsed to the wrong method: {:?}", kind),
    }
}
