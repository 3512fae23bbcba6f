/* ************************************************************************ **
** This file is part of fcs2, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of fcs2 is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

//! Post-deserialization checks.
//!
//! The serde layer accepts anything structurally well-formed; bounds and
//! cross-field rules live here. Nothing outside the `Validated*` wrappers
//! runs these, so construct configs through those.

use crate::config::*;
use failure::Error;

impl Settings {
    pub fn validate(self) -> Result<ValidatedSettings, Error> {
        if let Some(version) = self.version {
            ensure!(
                1 <= version && version <= MAX_VERSION,
                "unsupported config version: {}", version,
            );
        }

        ensure!(self.cell.volume() > 0.0, "box vectors are linearly dependent");

        if let Some(r_cut) = self.coulomb.r_cut {
            ensure!(r_cut > 0.0, "coulomb.r-cut must be positive");
        }

        Ok(ValidatedSettings(self))
    }
}

impl MethodKind {
    pub fn validate(self) -> Result<ValidatedMethod, Error> {
        match &self {
            MethodKind::Direct(direct) => check_direct(direct)?,
            MethodKind::TestZero => {},
            MethodKind::Scafacos(kind) => match kind {
                ScafacosMethodKind::Direct(direct) => check_direct(direct)?,
                ScafacosMethodKind::Ewald(ewald) => check_ewald(ewald)?,
                ScafacosMethodKind::Fmm(fmm) => check_fmm(fmm)?,
                ScafacosMethodKind::Memd(memd) => check_memd(memd)?,
                ScafacosMethodKind::Mmm1d(mmm1d) => check_mmm1d(mmm1d)?,
                ScafacosMethodKind::Mmm2d(mmm2d) => check_mmm2d(mmm2d)?,
                ScafacosMethodKind::P2nfft(p2nfft) => check_p2nfft(p2nfft)?,
                ScafacosMethodKind::Pepc(pepc) => check_pepc(pepc)?,
                ScafacosMethodKind::Pp3mg(pp3mg) => check_pp3mg(pp3mg)?,
                ScafacosMethodKind::Vmg(vmg) => check_vmg(vmg)?,
                ScafacosMethodKind::P3m(p3m) => check_p3m(p3m)?,
            },
        }
        Ok(ValidatedMethod(self))
    }
}

fn check_direct(direct: &MethodDirect) -> Result<(), Error> {
    ensure!(direct.cutoff >= 0.0, "direct.cutoff must not be negative");
    Ok(())
}

fn check_ewald(ewald: &MethodEwald) -> Result<(), Error> {
    require_positive_opt("ewald.cutoff", ewald.cutoff)?;
    require_positive_opt("ewald.tolerance-field", ewald.tolerance_field)?;
    if let (Some(kmax), Some(maxkmax)) = (ewald.kmax, ewald.maxkmax) {
        ensure!(kmax <= maxkmax, "ewald.kmax exceeds ewald.maxkmax");
    }
    Ok(())
}

fn check_fmm(fmm: &MethodFmm) -> Result<(), Error> {
    match fmm.tolerance {
        FmmTolerance::Absolute(value) |
        FmmTolerance::Relative(value) => require_positive("fmm.tolerance", value)?,
    }
    if let FmmPotential::Cusp { radius } = fmm.potential {
        require_positive("fmm.potential.cusp.radius", radius)?;
    }
    Ok(())
}

fn check_memd(memd: &MethodMemd) -> Result<(), Error> {
    require_positive("memd.timestep", memd.timestep)?;
    require_positive("memd.lightspeed", memd.lightspeed)?;
    require_positive("memd.permittivity", memd.permittivity)?;
    ensure!(memd.temperature >= 0.0, "memd.temperature must not be negative");
    ensure!(memd.mesh_size > 0, "memd.mesh-size must not be zero");
    Ok(())
}

fn check_mmm1d(mmm1d: &MethodMmm1d) -> Result<(), Error> {
    require_positive("mmm1d.max-pw-error", mmm1d.max_pw_error)?;
    require_positive_opt("mmm1d.far-switch-radius", mmm1d.far_switch_radius)?;
    Ok(())
}

fn check_mmm2d(mmm2d: &MethodMmm2d) -> Result<(), Error> {
    require_positive("mmm2d.max-pw-error", mmm2d.max_pw_error)?;
    require_positive_opt("mmm2d.far-cutoff", mmm2d.far_cutoff)?;
    if let Some(layers) = mmm2d.layers_per_node {
        ensure!(layers >= 1, "mmm2d.layers-per-node must be at least 1");
    }
    if let Some(skin) = mmm2d.skin {
        ensure!(skin >= 0.0, "mmm2d.skin must not be negative");
    }
    Ok(())
}

fn check_p2nfft(p2nfft: &MethodP2nfft) -> Result<(), Error> {
    require_positive_opt("p2nfft.cutoff", p2nfft.cutoff)?;
    if let Some(tolerance) = p2nfft.tolerance {
        let value = match tolerance {
            P2nfftTolerance::Energy(x) | P2nfftTolerance::EnergyRel(x) |
            P2nfftTolerance::Potential(x) | P2nfftTolerance::PotentialRel(x) |
            P2nfftTolerance::Field(x) | P2nfftTolerance::FieldRel(x) => x,
        };
        require_positive("p2nfft.tolerance", value)?;
    }
    if let Some(m) = p2nfft.m {
        ensure!(m >= 1, "p2nfft.m must be at least 1");
    }
    for grid in p2nfft.grid.iter().chain(&p2nfft.oversampled_grid) {
        ensure!(grid.iter().all(|&n| n > 0), "p2nfft grid sizes must not be zero");
    }
    Ok(())
}

fn check_pepc(pepc: &MethodPepc) -> Result<(), Error> {
    ensure!(pepc.epsilon >= 0.0, "pepc.epsilon must not be negative");
    require_positive("pepc.theta", pepc.theta)?;
    Ok(())
}

fn check_pp3mg(pp3mg: &MethodPp3mg) -> Result<(), Error> {
    if let Some(cells) = pp3mg.cells {
        ensure!(cells.iter().all(|&n| n > 0), "pp3mg.cells must not be zero");
    }
    if let Some(degree) = pp3mg.degree {
        ensure!(degree >= 1, "pp3mg.degree must be at least 1");
    }
    if let Some(max_iterations) = pp3mg.max_iterations {
        ensure!(max_iterations >= 1, "pp3mg.max-iterations must be at least 1");
    }
    require_positive_opt("pp3mg.tolerance", pp3mg.tolerance)?;
    Ok(())
}

fn check_vmg(vmg: &MethodVmg) -> Result<(), Error> {
    require_positive_opt("vmg.precision", vmg.precision)?;
    if let Some(max_level) = vmg.max_level {
        ensure!(max_level >= 1, "vmg.max-level must be at least 1");
    }
    if let Some(max_iterations) = vmg.max_iterations {
        ensure!(max_iterations >= 1, "vmg.max-iterations must be at least 1");
    }
    if let Some(cells) = vmg.near_field_cells {
        ensure!(cells >= 1, "vmg.near-field-cells must be at least 1");
    }
    Ok(())
}

fn check_p3m(p3m: &MethodP3m) -> Result<(), Error> {
    require_positive_opt("p3m.r-cut", p3m.r_cut)?;
    require_positive("p3m.tolerance-field", p3m.tolerance_field)?;
    if let Some(grid) = p3m.grid {
        ensure!(grid > 0, "p3m.grid must not be zero");
    }
    if let Some(cao) = p3m.cao {
        ensure!(cao <= 7, "p3m.cao must be within 0 to 7");
    }
    if let Some(alpha) = p3m.alpha {
        ensure!(alpha >= 0.0, "p3m.alpha must not be negative");
    }
    Ok(())
}

fn require_positive(name: &str, value: f64) -> Result<(), Error> {
    ensure!(value > 0.0, "{} must be positive", name);
    Ok(())
}

fn require_positive_opt(name: &str, value: Option<f64>) -> Result<(), Error> {
    match value {
        Some(value) => require_positive(name, value),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::YamlRead;

    fn method(yaml: &str) -> Result<ValidatedMethod, ::serde_yaml::Error> {
        ValidatedMethod::from_reader(yaml.as_bytes())
    }

    #[test]
    fn native_direct_with_defaults() {
        let ValidatedMethod(kind) = method("{direct: {}}").unwrap();
        assert_eq!(kind, MethodKind::Direct(MethodDirect {
            cutoff: 0.0,
            periodic_images: [1; 3],
        }));
    }

    #[test]
    fn external_p3m() {
        let ValidatedMethod(kind) = method(r#"
scafacos:
  p3m:
    r-cut: 3.0
    cao: 7
    tolerance-field: 1e-4
"#).unwrap();
        match kind {
            MethodKind::Scafacos(ScafacosMethodKind::P3m(p3m)) => {
                assert_eq!(p3m.r_cut, Some(3.0));
                assert_eq!(p3m.cao, Some(7));
                assert_eq!(p3m.grid, None);
                assert_eq!(p3m.tolerance_field, 1e-4);
            },
            kind => panic!("parsed to the wrong method: {:?}", kind),
        }
    }

    #[test]
    fn out_of_range_cao_is_rejected() {
        assert!(method("{scafacos: {p3m: {cao: 8}}}").is_err());
        assert!(method("{scafacos: {p3m: {cao: 7}}}").is_ok());
    }

    #[test]
    fn negative_cutoff_is_rejected() {
        assert!(method("{direct: {cutoff: -1.0}}").is_err());
    }

    #[test]
    fn fmm_tolerance_kinds() {
        assert!(method("{scafacos: {fmm: {tolerance: {absolute: 1e-3}}}}").is_ok());
        assert!(method("{scafacos: {fmm: {tolerance: {relative: 0.0}}}}").is_err());
        // tolerance is mandatory for fmm
        assert!(method("{scafacos: {fmm: {}}}").is_err());
    }

    #[test]
    fn ewald_kmax_bounds() {
        assert!(method("{scafacos: {ewald: {kmax: 32, maxkmax: 16}}}").is_err());
        assert!(method("{scafacos: {ewald: {kmax: 16, maxkmax: 32}}}").is_ok());
    }

    #[test]
    fn zero_method_parses_from_bare_string() {
        assert_eq!(method("zero").unwrap(), ValidatedMethod(MethodKind::TestZero));
    }

    #[test]
    fn full_settings() {
        let yaml = r#"
box:
  a: [10, 0, 0]
  b: [0, 10, 0]
  c: [0, 0, 10]
coulomb:
  method:
    direct:
      cutoff: 4.5
      periodic-images: [2, 2, 2]
  virial: true
"#;
        let ValidatedSettings(settings) = ValidatedSettings::from_reader(yaml.as_bytes()).unwrap();
        assert_eq!(settings.version, None);
        assert_eq!(settings.cell, Cell::orthorhombic([10.0; 3]));
        assert_eq!(settings.coulomb.r_cut, None);
        assert!(settings.coulomb.virial);
        assert!(!settings.coulomb.near_field);
    }

    #[test]
    fn degenerate_box_is_rejected() {
        let yaml = r#"
box:
  a: [10, 0, 0]
  b: [10, 0, 0]
  c: [0, 0, 10]
coulomb:
  method: zero
"#;
        assert!(ValidatedSettings::from_reader(yaml.as_bytes()).is_err());
    }
}
