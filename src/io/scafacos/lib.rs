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

//! A safe(r) wrapper around the ScaFaCoS C bindings.
//!
//! The library computes long-range Coulomb interactions with one of eleven
//! solver methods. This crate owns the handle lifecycle and keeps track of
//! which configuration has actually been communicated to the library, so
//! that high-level code can just mutate and run.

#![deny(unused_must_use)]

#[macro_use] extern crate log;
#[macro_use] extern crate failure;
#[macro_use] extern crate lazy_static;
extern crate chrono;
extern crate slice_of_array;
#[cfg(feature = "mpi")]
extern crate mpi;
#[cfg(feature = "link")]
extern crate scafacos_sys;

use failure::Backtrace;
use slice_of_array::prelude::*;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

pub type FailResult<T> = Result<T, failure::Error>;

pub const API_TRACE_TARGET: &'static str = concat!(module_path!(), "::c_api");

#[cfg(feature = "link")]
macro_rules! api_trace {
    ($($arg:tt)*) => { trace!(target: crate::API_TRACE_TARGET, $($arg)*) };
}

/// An error reported by the solver library.
#[derive(Debug, Fail)]
pub struct FcsError {
    backtrace: Backtrace,
    code: i32,
    message: String,
}

impl fmt::Display for FcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScaFaCoS returned error {}: {}", self.code, self.message)
    }
}

mod maybe_dirty;
use crate::maybe_dirty::MaybeDirty;

mod low_level;
use crate::low_level::{LowLevelApi, RawRunOutput};

mod pub_types;
pub use crate::pub_types::*;

#[cfg(all(feature = "mpi", feature = "link"))]
pub use crate::low_level::mpi::{FcsOnDemand, FcsDispatch};
#[cfg(feature = "mpi")]
pub use crate::low_level::mpi_helper::this_process_is_root;

lazy_static! {
    /// The solver library keeps global state; only one [`Fcs`] may be live in
    /// the process at a time. Hold the guard for as long as the instance does.
    pub static ref INSTANCE_LOCK: std::sync::Mutex<()> = Default::default();
}

/// A handle to the external solver, for one fixed method.
///
/// Mutating the configuration through [`Fcs::set_common`] or
/// [`Fcs::set_params`] is cheap; nothing is communicated to the library
/// until the next [`Fcs::tune`] or [`Fcs::run`], and configuration that has
/// not changed since the last call is not sent again. Any change also marks
/// the solver's internal tuning stale, so the next run re-tunes first.
pub struct Fcs {
    low: Box<dyn LowLevelApi>,
    method: Method,
    state: MaybeDirty<State>,
    needs_tuning: bool,
    compute_virial: bool,
    log_file: Option<std::fs::File>,
}

#[derive(Debug, Clone, PartialEq)]
struct State {
    common: Common,
    params: Vec<Param>,
}

#[derive(Debug, Clone)]
pub struct Builder {
    append_log: Option<PathBuf>,
    r_cut: Option<f64>,
    compute_virial: bool,
    params: Vec<Param>,
}

impl Default for Builder {
    fn default() -> Self
    { Builder::new() }
}

impl Builder {
    pub fn new() -> Self
    { Builder {
        append_log: None,
        r_cut: None,
        compute_virial: false,
        params: vec![],
    }}

    /// Append a trace of the operations sent to the library to this file.
    ///
    /// NOTE: Relative paths are not resolved until build time.
    pub fn append_log(&mut self, path: impl AsRef<Path>) -> &mut Self
    { self.append_log = Some(path.as_ref().to_owned()); self }

    /// Override the near-field cutoff that tuning would otherwise choose.
    pub fn r_cut(&mut self, value: f64) -> &mut Self
    { self.r_cut = Some(value); self }

    /// Ask the library to accumulate the virial on each run.
    pub fn compute_virial(&mut self, value: bool) -> &mut Self
    { self.compute_virial = value; self }

    /// The initial solver-specific settings.
    pub fn params(&mut self, params: Vec<Param>) -> &mut Self
    { self.params = params; self }

    /// Call out to the solver C API to create a handle for `method`, and
    /// configure it according to this builder.
    ///
    /// # MPI
    ///
    /// This must be called on all processes, which is why it takes a raw
    /// communicator. When driving the solver from a single process, use
    /// [`Builder::build_on_demand`] instead.
    ///
    /// # Safety
    ///
    /// `communicator` must be a live MPI communicator, and the caller must
    /// hold [`INSTANCE_LOCK`].
    #[cfg(feature = "link")]
    pub unsafe fn build_raw(
        &self,
        method: Method,
        common: Common,
        communicator: scafacos_sys::MPI_Comm,
    ) -> FailResult<Fcs> {
        let low = Box::new(low_level::plain::FcsOwner::new(method.name(), communicator)?);
        self.build_with(low, method, common)
    }

    /// Create a handle whose every operation runs collectively on all
    /// processes through the installed event loop.
    ///
    /// The caller must hold [`INSTANCE_LOCK`].
    #[cfg(all(feature = "mpi", feature = "link"))]
    pub fn build_on_demand(
        &self,
        on_demand: FcsOnDemand,
        method: Method,
        common: Common,
    ) -> FailResult<Fcs> {
        let low = Box::new(low_level::mpi::MpiFcsOwner::new(on_demand, method)?);
        self.build_with(low, method, common)
    }

    // monomorphic; also the entry point for scripted backends in tests
    fn build_with(
        &self,
        mut low: Box<dyn LowLevelApi>,
        method: Method,
        common: Common,
    ) -> FailResult<Fcs>
    {Ok({
        if let Some(r_cut) = self.r_cut {
            low.set_r_cut(Some(r_cut))?;
        }
        if self.compute_virial {
            low.set_compute_virial(true)?;
        }

        let log_file = match &self.append_log {
            None => None,
            Some(path) => {
                // Errs are ignored because it's a few lines in a log file.
                let file = std::fs::OpenOptions::new()
                    .write(true).create(true).append(true)
                    .open(path);
                match file {
                    Err(e) => {
                        warn!("could not open {}: {}", path.display(), e);
                        None
                    },
                    Ok(mut file) => {
                        let _ = writeln!(file, "---------------------------------------------");
                        let _ = writeln!(file, "---- {} solver built at {}", method, chrono::Local::now());
                        let _ = writeln!(file, "---------------------------------------------");
                        Some(file)
                    },
                }
            },
        };

        Fcs {
            low, method, log_file,
            state: MaybeDirty::new_dirty(State { common, params: self.params.clone() }),
            needs_tuning: true,
            compute_virial: self.compute_virial,
        }
    })}
}

impl Fcs {
    pub fn method(&self) -> Method
    { self.method }

    /// Replace the method-independent configuration.
    ///
    /// Nothing is sent to the library until the next tune or run.
    pub fn set_common(&mut self, common: Common) -> FailResult<()>
    {Ok({
        self.state.get_mut().common = common;
    })}

    /// Replace the solver-specific settings.
    pub fn set_params(&mut self, params: Vec<Param>) -> FailResult<()>
    {Ok({
        self.state.get_mut().params = params;
    })}

    /// Re-tune the solver for the given particles.
    ///
    /// This happens automatically on [`Fcs::run`] whenever configuration or
    /// the particle count changed, so calling it directly is only useful to
    /// move the cost out of the first run.
    pub fn tune(&mut self, positions: &[[f64; 3]], charges: &[f64]) -> FailResult<()>
    {Ok({
        self.update_configuration(positions, charges)?;
        self.tune_now(positions, charges)?;
    })}

    /// One solve pass.
    pub fn run(&mut self, positions: &[[f64; 3]], charges: &[f64]) -> FailResult<RunOutput>
    {Ok({
        self.update_configuration(positions, charges)?;
        if self.needs_tuning {
            self.tune_now(positions, charges)?;
        }

        let raw = self.low.run(positions.flat().to_vec(), charges.to_vec())?;
        let RawRunOutput { field, potentials } = raw;

        ensure!(
            field.len() == 3 * charges.len() && potentials.len() == charges.len(),
            "solver returned misshapen output ({} field values, {} potentials, {} particles)",
            field.len(), potentials.len(), charges.len(),
        );
        RunOutput {
            fields: field.nest().to_vec(),
            potentials,
        }
    })}

    /// The virial accumulated by the last run.
    ///
    /// Fails unless the builder enabled [`Builder::compute_virial`].
    pub fn virial(&mut self) -> FailResult<[[f64; 3]; 3]>
    {Ok({
        ensure!(
            self.compute_virial,
            "virial requested, but the solver was built without compute_virial",
        );
        let flat = self.low.virial()?;
        ensure!(flat.len() == 9, "solver returned a virial of {} elements", flat.len());
        let mut out = [[0.0; 3]; 3];
        for r in 0..3 {
            out[r].copy_from_slice(&flat[3 * r..3 * r + 3]);
        }
        out
    })}

    // Send whatever parts of the configuration changed since the last call,
    // and mark tuning stale if any did.
    fn update_configuration(&mut self, positions: &[[f64; 3]], charges: &[f64]) -> FailResult<()>
    {Ok({
        ensure!(
            positions.len() == charges.len(),
            "got {} positions for {} charges", positions.len(), charges.len(),
        );

        if self.state.get().common.total_particles != charges.len() {
            self.state.get_mut().common.total_particles = charges.len();
        }

        if self.state.is_projection_dirty(|s| &s.common) {
            let common = self.state.get().common.clone();
            trace!("fcs: sending common parameters ({} particles)", common.total_particles);
            self.log_event(format_args!("set_common {:?}", common));
            self.low.set_common(common)?;
            self.needs_tuning = true;
        }

        if self.state.is_projection_dirty(|s| &s.params) {
            let rendered = render_parameter_string(&self.state.get().params);
            trace!("fcs: sending solver parameters: {}", rendered);
            self.log_event(format_args!("set_parameters {}", rendered));
            self.low.set_parameters(rendered)?;
            self.needs_tuning = true;
        }

        self.state.mark_clean();
    })}

    fn tune_now(&mut self, positions: &[[f64; 3]], charges: &[f64]) -> FailResult<()>
    {Ok({
        debug!("fcs: tuning {} for {} particles", self.method, charges.len());
        self.log_event(format_args!("tune ({} particles)", charges.len()));
        self.low.tune(positions.flat().to_vec(), charges.to_vec())?;
        self.needs_tuning = false;
    })}

    fn log_event(&mut self, args: fmt::Arguments<'_>) {
        if let Some(file) = &mut self.log_file {
            let _ = writeln!(file, "{}", args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::low_level::{LowLevelApi, RawRunOutput};

    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Default)]
    struct CallLog(Rc<RefCell<Vec<String>>>);

    impl CallLog {
        fn push(&self, s: String) { self.0.borrow_mut().push(s) }
        fn take(&self) -> Vec<String> { self.0.borrow_mut().drain(..).collect() }
    }

    // stands in for the library; records every call it receives
    struct ScriptedApi(CallLog);

    impl LowLevelApi for ScriptedApi {
        fn set_common(&mut self, common: Common) -> FailResult<()>
        { Ok(self.0.push(format!("set_common n={}", common.total_particles))) }

        fn set_r_cut(&mut self, r_cut: Option<f64>) -> FailResult<()>
        { Ok(self.0.push(format!("set_r_cut {:?}", r_cut))) }

        fn set_parameters(&mut self, parameters: String) -> FailResult<()>
        { Ok(self.0.push(format!("set_parameters {}", parameters))) }

        fn set_compute_virial(&mut self, enable: bool) -> FailResult<()>
        { Ok(self.0.push(format!("set_compute_virial {}", enable))) }

        fn tune(&mut self, _: Vec<f64>, _: Vec<f64>) -> FailResult<()>
        { Ok(self.0.push("tune".into())) }

        fn run(&mut self, positions: Vec<f64>, charges: Vec<f64>) -> FailResult<RawRunOutput> {
            self.0.push("run".into());
            Ok(RawRunOutput {
                field: vec![0.0; positions.len()],
                potentials: vec![0.0; charges.len()],
            })
        }

        fn virial(&mut self) -> FailResult<Vec<f64>> {
            self.0.push("virial".into());
            Ok(vec![0.0; 9])
        }
    }

    fn scripted_fcs(builder: &Builder) -> (Fcs, CallLog) {
        let log = CallLog::default();
        let low = Box::new(ScriptedApi(log.clone()));
        let fcs = builder.build_with(low, Method::P3m, Common::orthorhombic([10.0; 3])).unwrap();
        (fcs, log)
    }

    const POSITIONS: &[[f64; 3]] = &[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
    const CHARGES: &[f64] = &[1.0, -1.0];

    #[test]
    fn first_run_configures_and_tunes() {
        let (mut fcs, log) = scripted_fcs(Builder::new().params(vec![Param::new("p3m_cao", 7u32)]));
        log.take();

        fcs.run(POSITIONS, CHARGES).unwrap();
        assert_eq!(log.take(), vec!["set_common n=2", "set_parameters p3m_cao,7", "tune", "run"]);

        // nothing changed, so nothing is re-sent and nothing re-tunes
        fcs.run(POSITIONS, CHARGES).unwrap();
        assert_eq!(log.take(), vec!["run"]);
    }

    #[test]
    fn geometry_change_retunes() {
        let (mut fcs, log) = scripted_fcs(&Builder::new());
        fcs.run(POSITIONS, CHARGES).unwrap();
        log.take();

        fcs.set_common(Common::orthorhombic([12.0; 3])).unwrap();
        fcs.run(POSITIONS, CHARGES).unwrap();
        assert_eq!(log.take(), vec!["set_common n=2", "tune", "run"]);
    }

    #[test]
    fn particle_count_change_retunes() {
        let (mut fcs, log) = scripted_fcs(&Builder::new());
        fcs.run(POSITIONS, CHARGES).unwrap();
        log.take();

        let positions = &[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]];
        fcs.run(positions, &[1.0, -1.0, 1.0]).unwrap();
        assert_eq!(log.take(), vec!["set_common n=3", "tune", "run"]);
    }

    #[test]
    fn params_change_resends_and_retunes() {
        let (mut fcs, log) = scripted_fcs(&Builder::new());
        fcs.run(POSITIONS, CHARGES).unwrap();
        log.take();

        fcs.set_params(vec![Param::new("p3m_grid", 32u32)]).unwrap();
        fcs.run(POSITIONS, CHARGES).unwrap();
        assert_eq!(log.take(), vec!["set_parameters p3m_grid,32", "tune", "run"]);

        // setting the same params again is not a change
        fcs.set_params(vec![Param::new("p3m_grid", 32u32)]).unwrap();
        fcs.run(POSITIONS, CHARGES).unwrap();
        assert_eq!(log.take(), vec!["run"]);
    }

    #[test]
    fn builder_flags_sent_at_build() {
        let (_fcs, log) = scripted_fcs(Builder::new().r_cut(2.5).compute_virial(true));
        assert_eq!(log.take(), vec!["set_r_cut Some(2.5)", "set_compute_virial true"]);
    }

    #[test]
    fn explicit_tune_satisfies_run() {
        let (mut fcs, log) = scripted_fcs(&Builder::new());
        fcs.tune(POSITIONS, CHARGES).unwrap();
        log.take();

        fcs.run(POSITIONS, CHARGES).unwrap();
        assert_eq!(log.take(), vec!["run"]);
    }

    #[test]
    fn virial_requires_builder_flag() {
        let (mut fcs, _) = scripted_fcs(&Builder::new());
        assert!(fcs.virial().is_err());

        let (mut fcs, _) = scripted_fcs(Builder::new().compute_virial(true));
        assert_eq!(fcs.virial().unwrap(), [[0.0; 3]; 3]);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let (mut fcs, _) = scripted_fcs(&Builder::new());
        assert!(fcs.run(POSITIONS, &[1.0]).is_err());
    }
}
