//! End-to-end runs of the native direct backend, driven the same way the
//! CLI drives it: yaml settings in, particle text in, energies out.

extern crate fcs2_tasks;
extern crate fcs2_tasks_config;
#[macro_use]
extern crate pretty_assertions;

use fcs2_tasks::cmd::run_solve;
use fcs2_tasks::filetypes::Particles;
use fcs2_tasks::solver::{SolveOutput, SolverEnv};
use fcs2_tasks_config::{ValidatedSettings, YamlRead};

fn solve(config: &str, particles: &str) -> SolveOutput {
    let settings: ValidatedSettings = YamlRead::from_reader(config.as_bytes()).unwrap();
    let particles = Particles::parse(particles).unwrap();
    run_solve(&settings, &particles, &SolverEnv::default()).unwrap()
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-10, "{} vs {}", a, b);
}

#[test]
fn isolated_ion_pair() {
    let out = solve(
        r#"
box:
  a: [20, 0, 0]
  b: [0, 20, 0]
  c: [0, 0, 20]
  periodicity: [false, false, false]
coulomb:
  method: {direct: {}}
"#,
        "0 0 0  1.0\n2 0 0 -1.0\n",
    );

    // a bound pair: E = -q^2 / r
    assert_close(out.energy, -0.5);
    assert_eq!(out.potentials.len(), 2);
    assert_close(out.potentials[0], -0.5);
    // fields point toward the opposite charge
    assert!(out.fields[0][0] > 0.0);
    assert!(out.fields[1][0] < 0.0);
    assert_eq!(out.virial, None);
}

#[test]
fn charge_in_a_periodic_row() {
    let out = solve(
        r#"
box:
  a: [10, 0, 0]
  b: [0, 10, 0]
  c: [0, 0, 10]
coulomb:
  method:
    direct:
      periodic-images: [1, 0, 0]
"#,
        "5 5 5 1.0\n",
    );

    // the charge sees one image at +L and one at -L: E = q^2 / L
    assert_close(out.energy, 0.1);
    // and no net field, by symmetry
    for axis in 0..3 {
        assert_close(out.fields[0][axis], 0.0);
    }
}

#[test]
fn virial_comes_back_when_asked_for() {
    let config = r#"
box:
  a: [20, 0, 0]
  b: [0, 20, 0]
  c: [0, 0, 20]
  periodicity: [false, false, false]
coulomb:
  method: {direct: {}}
  virial: true
"#;
    let out = solve(config, "0 0 0 1.0\n3 0 0 1.0\n");
    let virial = out.virial.expect("virial was requested");

    // for a 1/r potential the virial trace equals the energy
    let trace = virial[0][0] + virial[1][1] + virial[2][2];
    assert_close(trace, out.energy);
    assert_close(out.energy, 1.0 / 3.0);
}

#[test]
fn global_cutoff_applies_to_the_method() {
    let config = r#"
box:
  a: [20, 0, 0]
  b: [0, 20, 0]
  c: [0, 0, 20]
  periodicity: [false, false, false]
coulomb:
  method: {direct: {}}
  r-cut: 2.0
"#;
    let out = solve(config, "0 0 0 1.0\n5 0 0 1.0\n");
    assert_close(out.energy, 0.0);
}
