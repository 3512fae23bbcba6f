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

// NOTE: Please make sure to use the YamlRead trait when deserializing these types!
//
//       DO NOT USE serde_yaml::from_{reader,value,etc.} OUTSIDE THIS CRATE
//       or else you defeat the entire reason for YamlRead's existence.

use serde::de;

pub const MAX_VERSION: u32 = 1;

/// Root settings object.
///
/// This is what you should deserialize.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings(pub Settings);

/// Raw deserialized form of settings.
///
/// You shouldn't deserialize this type directly; deserialize
/// `ValidatedSettings` instead, so that additional validation can be
/// performed.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Identifies the version of the settings that this file uses.
    ///
    /// fcs2 increments the max supported version number when breaking changes
    /// are made to config files. If not specified, assumes a value of 1.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    /// See the type for documentation.
    #[serde(rename = "box")]
    pub cell: Cell,

    /// See the type for documentation.
    pub coulomb: Coulomb,
}
derive_yaml_read!{ValidatedSettings}

impl<'de> de::Deserialize<'de> for ValidatedSettings {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cereal: Settings = de::Deserialize::deserialize(deserializer)?;

        cereal.validate().map_err(de::Error::custom)
    }
}

/// The simulation box.
///
/// The box is the parallelepiped spanned by the vectors `a`, `b`, `c`,
/// anchored at `offset`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Cell {
    pub a: [f64; 3],
    pub b: [f64; 3],
    pub c: [f64; 3],

    #[serde(default)]
    pub offset: [f64; 3],

    /// Which of `a`, `b`, `c` are periodic directions.
    #[serde(default = "cell__periodicity")]
    pub periodicity: [bool; 3],
}
fn cell__periodicity() -> [bool; 3] { [true; 3] }

impl Cell {
    /// An orthorhombic box with the given edge lengths, fully periodic.
    pub fn orthorhombic(lengths: [f64; 3]) -> Cell {
        Cell {
            a: [lengths[0], 0.0, 0.0],
            b: [0.0, lengths[1], 0.0],
            c: [0.0, 0.0, lengths[2]],
            offset: [0.0; 3],
            periodicity: [true; 3],
        }
    }

    pub fn volume(&self) -> f64 {
        let Cell { a, b, c, .. } = self;
        let cross = [
            b[1] * c[2] - b[2] * c[1],
            b[2] * c[0] - b[0] * c[2],
            b[0] * c[1] - b[1] * c[0],
        ];
        (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]).abs()
    }
}

/// The Coulomb interaction.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Coulomb {
    /// Specifies the solver method to be used.
    ///
    /// See [`MethodKind`] for the list of possibilities.
    pub method: ValidatedMethod,

    /// Override the near-field cutoff that tuning would otherwise choose.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_cut: Option<f64>,

    /// The caller computes the near-field contribution itself, and the solver
    /// only handles the far field.
    #[serde(default)]
    pub near_field: bool,

    /// Accumulate the virial on each run.
    #[serde(default)]
    pub virial: bool,
}

/// Method settings known to have passed the checks in `validation`.
#[derive(Serialize)]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMethod(pub MethodKind);
derive_yaml_read!{ValidatedMethod}

impl<'de> de::Deserialize<'de> for ValidatedMethod {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cereal: MethodKind = de::Deserialize::deserialize(deserializer)?;

        cereal.validate().map_err(de::Error::custom)
    }
}

/// One solver method, together with its parameters.
///
/// Exactly one method is in effect at a time; there is no way to carry the
/// parameters of a method that is not selected.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
pub enum MethodKind {
    /// Direct summation over explicit periodic images.
    ///
    /// This is implemented directly in fcs2 and requires no external library.
    /// It scales as O(n^2) per image shell and exists as the reference
    /// implementation against which couplings are verified.
    #[serde(rename = "direct")] Direct(MethodDirect),

    /// V = 0
    #[serde(rename = "zero")] TestZero,

    /// Use solvers implemented in the external ScaFaCoS library.
    ///
    /// Requires building with `scafacos-support`.
    #[serde(rename = "scafacos")] Scafacos(ScafacosMethodKind),
}

/// The solver methods offered by the external library.
///
/// Parameters left unset are chosen by the library's tuning phase where it
/// supports that; tuning aims for the method's accuracy target (e.g.
/// `tolerance-field` for p3m) at minimal cost.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ScafacosMethodKind {
    /// The library's own direct summation.
    #[serde(rename = "direct")] Direct(MethodDirect),
    #[serde(rename = "ewald")] Ewald(MethodEwald),
    /// Fast multipole method.
    #[serde(rename = "fmm")] Fmm(MethodFmm),
    /// Maxwell equation molecular dynamics (a local, mesh-based method).
    #[serde(rename = "memd")] Memd(MethodMemd),
    /// For systems periodic in one direction only.
    #[serde(rename = "mmm1d")] Mmm1d(MethodMmm1d),
    /// For slab geometries, periodic in two directions.
    #[serde(rename = "mmm2d")] Mmm2d(MethodMmm2d),
    /// Ewald summation on nonequispaced FFTs.
    #[serde(rename = "p2nfft")] P2nfft(MethodP2nfft),
    /// The Pretty Efficient Parallel Coulomb solver (a Barnes-Hut tree code).
    #[serde(rename = "pepc")] Pepc(MethodPepc),
    /// Particle-particle particle-mesh multigrid.
    #[serde(rename = "pp3mg")] Pp3mg(MethodPp3mg),
    /// Versatile multigrid.
    #[serde(rename = "vmg")] Vmg(MethodVmg),
    /// Particle-particle particle-mesh Ewald.
    #[serde(rename = "p3m")] P3m(MethodP3m),
}

impl ScafacosMethodKind {
    /// The method name understood by the library's init call.
    pub fn name(&self) -> &'static str {
        match self {
            ScafacosMethodKind::Direct(..) => "direct",
            ScafacosMethodKind::Ewald(..) => "ewald",
            ScafacosMethodKind::Fmm(..) => "fmm",
            ScafacosMethodKind::Memd(..) => "memd",
            ScafacosMethodKind::Mmm1d(..) => "mmm1d",
            ScafacosMethodKind::Mmm2d(..) => "mmm2d",
            ScafacosMethodKind::P2nfft(..) => "p2nfft",
            ScafacosMethodKind::Pepc(..) => "pepc",
            ScafacosMethodKind::Pp3mg(..) => "pp3mg",
            ScafacosMethodKind::Vmg(..) => "vmg",
            ScafacosMethodKind::P3m(..) => "p3m",
        }
    }
}

/// Parameters of direct summation (both the native implementation and the
/// library's).
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodDirect {
    /// Pair interactions beyond this distance are ignored.
    /// A value of `0` disables the cutoff.
    #[serde(default = "method_direct__cutoff")]
    pub cutoff: f64,

    /// Number of image shells summed along each periodic direction.
    ///
    /// `[1, 1, 1]` sums the 26 neighboring boxes in a fully periodic system.
    /// Non-periodic directions contribute no images regardless of this value.
    #[serde(default = "method_direct__periodic_images")]
    pub periodic_images: [u32; 3],
}
fn method_direct__cutoff() -> f64 { 0.0 }
fn method_direct__periodic_images() -> [u32; 3] { [1; 3] }

impl Default for MethodDirect {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodEwald {
    /// Real-space cutoff.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<f64>,

    /// Reciprocal-space cutoff used, if fixed by hand.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kmax: Option<u32>,

    /// Largest reciprocal-space cutoff tuning may consider.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxkmax: Option<u32>,

    /// Ewald splitting parameter.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,

    /// Accuracy target for the field, for tuning.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance_field: Option<f64>,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodFmm {
    /// Energy accuracy target, absolute or relative.
    ///
    /// # Example:
    ///
    /// ```yaml
    /// tolerance: { absolute: 1e-3 }
    /// ```
    pub tolerance: FmmTolerance,

    #[serde(default)]
    pub dipole_correction: bool,

    /// Let the library re-tune its internal parameters on every run.
    #[serde(default = "method_fmm__internal_tuning")]
    pub internal_tuning: bool,

    #[serde(default)]
    pub potential: FmmPotential,
}
fn method_fmm__internal_tuning() -> bool { true }

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum FmmTolerance {
    Absolute(f64),
    Relative(f64),
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum FmmPotential {
    /// Plain 1/r.
    Coulomb,
    /// CUSP potential, softened inside the given core radius.
    Cusp { radius: f64 },
}

impl Default for FmmPotential {
    fn default() -> Self { FmmPotential::Coulomb }
}

/// Parameters of the MEMD solver.
///
/// MEMD integrates auxiliary electrodynamics alongside the simulation, so
/// unlike the other methods it needs to know about the timestep and the
/// thermostat temperature.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodMemd {
    pub timestep: f64,

    /// Lattice points per box edge.
    pub mesh_size: u32,

    /// Speed of light for the auxiliary field dynamics.
    pub lightspeed: f64,

    pub temperature: f64,

    #[serde(default = "method_memd__permittivity")]
    pub permittivity: f64,
}
fn method_memd__permittivity() -> f64 { 1.0 }

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodMmm1d {
    /// Distance beyond which the far formula is used.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub far_switch_radius: Option<f64>,

    /// Order of the Bessel expansion in the near formula.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bessel_cutoff: Option<u32>,

    /// Maximal pairwise error.
    pub max_pw_error: f64,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodMmm2d {
    /// Maximal pairwise error.
    pub max_pw_error: f64,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub far_cutoff: Option<f64>,

    /// Dielectric contrast at the top boundary of the slab.
    #[serde(default)]
    pub delta_top: f64,

    /// Dielectric contrast at the bottom boundary of the slab.
    #[serde(default)]
    pub delta_bot: f64,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers_per_node: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin: Option<f64>,

    #[serde(default)]
    pub require_total_energy: bool,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodP2nfft {
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<f64>,

    /// Accuracy target.
    ///
    /// # Example:
    ///
    /// ```yaml
    /// tolerance: { field: 1e-4 }
    /// ```
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<P2nfftTolerance>,

    /// Ewald splitting parameter.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,

    /// Window function support, in grid points.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<[u32; 3]>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oversampled_grid: Option<[u32; 3]>,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum P2nfftTolerance {
    Energy(f64),
    EnergyRel(f64),
    Potential(f64),
    PotentialRel(f64),
    Field(f64),
    FieldRel(f64),
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodPepc {
    /// Plummer softening parameter.
    pub epsilon: f64,

    /// Barnes-Hut opening angle.
    pub theta: f64,

    #[serde(default)]
    pub dipole_correction: bool,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodPp3mg {
    /// Mesh cells per direction.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<[u32; 3]>,

    /// Width of the ghost-cell layer.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ghosts: Option<u32>,

    /// Degree of the interpolation polynomial.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<u32>,

    /// Maximum number of particles per process.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_particles: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodVmg {
    /// Multigrid depth; the finest grid has `2^max-level` points per direction.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_level: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothing_steps: Option<u32>,

    /// Residual threshold at which iteration stops.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near_field_cells: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolation_order: Option<u32>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discretization_order: Option<u32>,

    #[serde(default)]
    pub cycle_type: CycleType,
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleType {
    #[serde(rename = "v")] V,
    #[serde(rename = "w")] W,
}

impl Default for CycleType {
    fn default() -> Self { CycleType::V }
}

/// Parameters of the P3M solver.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MethodP3m {
    /// Cutoff radius for real-space electrostatics.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_cut: Option<f64>,

    /// Number of mesh points per coordinate direction.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<u32>,

    /// Charge assignment order: the polynomial order used to spread point
    /// charges onto the mesh (0 to 7).
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cao: Option<u32>,

    /// Ewald splitting parameter.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,

    /// Accuracy target for the field; anything left unset above is tuned to
    /// meet this at minimal cost.
    #[serde(default = "method_p3m__tolerance_field")]
    pub tolerance_field: f64,
}
fn method_p3m__tolerance_field() -> f64 { 1e-3 }

impl Default for MethodP3m {
    fn default() -> Self { from_empty_mapping().unwrap() }
}

// --------------------------------------------------------

fn from_empty_mapping<T: for<'de> serde::Deserialize<'de>>() -> serde_yaml::Result<T> {
    use serde_yaml::{from_value, Value, Mapping};
    from_value(Value::Mapping(Mapping::new()))
}

#[test]
fn test_defaults()
{
    // NOTE: This simply checks that `from_empty_mapping` can succeed
    //       for each type that uses it.
    //       (it will fail if one of the fields does not have a default
    //        value and is not an Option type)
    let _ = MethodDirect::default();
    let _ = MethodP3m::default();
}
