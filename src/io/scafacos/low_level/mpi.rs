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

//! MPI-on-demand driving of the solver.
//!
//! How a call like `fcs.run(..)` on the root process plays out:
//!
//! * The root-side owner packs the arguments into an [`Input`] and hands it
//!   to `on_demand.invoke`.
//! * `invoke` broadcasts the `Input` (variant tag first, then the fields) so
//!   that every process holds the same value.
//! * Every process calls [`FcsDispatch::dispatch`], which performs the
//!   matching collective call on its local solver handle.
//! * Return values on non-root processes are forgotten; the root's is
//!   returned from `invoke`.
//!
//! Init and drop travel through the same dispatch so that the set of
//! operations the event loop understands never has to change at runtime.
//! The library tolerates only one live instance, which conveniently lets
//! them act as stateful init/deinit routines on the shared slot.

use crate::FailResult;
use crate::low_level::{LowLevelApi, RawRunOutput};
use crate::low_level::plain::FcsOwner;
use crate::low_level::mpi_helper::{Broadcast, DispatchMultiProcess, MpiOnDemand};
use crate::pub_types::{Common, Method};

use std::sync::Mutex;

use mpi;

/// A multi-process entry point for driving the solver; see
/// [`FcsOnDemand::install`].
pub type FcsOnDemand = MpiOnDemand<FcsDispatch>;

impl MpiOnDemand<FcsDispatch> {
    /// Enter single-process mode on the root process.
    ///
    /// # MPI
    ///
    /// Call this on all processes. The closure runs on the root while the
    /// others serve solver operations; `Some` is returned only on the root.
    pub fn install<R>(func: impl FnOnce(FcsOnDemand) -> R) -> Option<R>
    { MpiOnDemand::install_with(FcsDispatch::default(), func) }
}

/// The dispatch serving every solver operation on all processes.
///
/// Holds the process-local solver handle slot; `Input::Init` fills it and
/// `Input::Drop` empties it.
#[derive(Debug, Default)]
pub struct FcsDispatch {
    instance: Mutex<Option<FcsOwner>>,
}

/// A drop-in replacement for `FcsOwner` which uses `MpiOnDemand`.
/// Only exists on the root process.
///
/// All methods are little more than wrappers around [`FcsOnDemand`] that
/// translate between the fixed argument types per method and the catch-all
/// enums used by the event loop body.
///
/// A custom `Drop` impl notifies the other processes about the drop.
/// This type is expressly NOT CLONE.
#[derive(Debug)]
pub(crate) struct MpiFcsOwner {
    on_demand: FcsOnDemand,
}

impl MpiFcsOwner {
    /// Initialize the solver on all processes.
    ///
    /// The usage of `MpiOnDemand` ensures that this is only called on the
    /// root process.
    pub(crate) fn new(on_demand: FcsOnDemand, method: Method) -> FailResult<MpiFcsOwner> {
        match on_demand.invoke(Input::Init { method }) {
            Output::Unit(res) => res?,
            _ => panic!("wrong output variant!"),
        }
        Ok(MpiFcsOwner { on_demand })
    }

    fn invoke_unit(&mut self, input: Input) -> FailResult<()> {
        match self.on_demand.invoke(input) {
            Output::Unit(res) => res,
            _ => panic!("wrong output variant!"),
        }
    }
}

impl Drop for MpiFcsOwner {
    fn drop(&mut self) {
        match self.on_demand.invoke(Input::Drop) {
            Output::Drop => {},
            _ => panic!("wrong output variant!"),
        }
    }
}

impl LowLevelApi for MpiFcsOwner {
    fn set_common(&mut self, common: Common) -> FailResult<()>
    { self.invoke_unit(Input::SetCommon { common }) }

    fn set_r_cut(&mut self, r_cut: Option<f64>) -> FailResult<()>
    { self.invoke_unit(Input::SetRCut { r_cut }) }

    fn set_parameters(&mut self, parameters: String) -> FailResult<()>
    { self.invoke_unit(Input::SetParameters { parameters }) }

    fn set_compute_virial(&mut self, enable: bool) -> FailResult<()>
    { self.invoke_unit(Input::SetComputeVirial { enable }) }

    fn tune(&mut self, positions: Vec<f64>, charges: Vec<f64>) -> FailResult<()>
    { self.invoke_unit(Input::Tune { positions, charges }) }

    fn run(&mut self, positions: Vec<f64>, charges: Vec<f64>) -> FailResult<RawRunOutput> {
        match self.on_demand.invoke(Input::Run { positions, charges }) {
            Output::Run(res) => res,
            _ => panic!("wrong output variant!"),
        }
    }

    fn virial(&mut self) -> FailResult<Vec<f64>> {
        match self.on_demand.invoke(Input::GetVirial) {
            Output::Virial(res) => res,
            _ => panic!("wrong output variant!"),
        }
    }
}

//------------------------------------------------

/// One collective solver operation, as understood by the event loop.
pub enum Input {
    Init { method: Method },
    SetCommon { common: Common },
    SetRCut { r_cut: Option<f64> },
    SetParameters { parameters: String },
    SetComputeVirial { enable: bool },
    Tune { positions: Vec<f64>, charges: Vec<f64> },
    Run { positions: Vec<f64>, charges: Vec<f64> },
    GetVirial,
    Drop,
}

pub enum Output {
    Unit(FailResult<()>),
    Run(FailResult<RawRunOutput>),
    Virial(FailResult<Vec<f64>>),
    Drop,
}

impl Input {
    // variant tag communicated ahead of the fields
    fn tag(&self) -> i64 {
        match self {
            Input::Init { .. } => 0,
            Input::SetCommon { .. } => 1,
            Input::SetRCut { .. } => 2,
            Input::SetParameters { .. } => 3,
            Input::SetComputeVirial { .. } => 4,
            Input::Tune { .. } => 5,
            Input::Run { .. } => 6,
            Input::GetVirial => 7,
            Input::Drop => 8,
        }
    }
}

impl Broadcast for Input {
    fn broadcast(root: &impl mpi::Root, value: Option<Input>) -> Input {
        // Extracts one field of the variant that the tag already told every
        // process to expect.
        macro_rules! field {
            ($pat:pat => $expr:expr) => {
                Broadcast::broadcast(root, value.as_ref().map(|input| match input {
                    $pat => $expr,
                    _ => unreachable!("wrong input variant"),
                }))
            };
        }

        let tag: i64 = Broadcast::broadcast(root, value.as_ref().map(Input::tag));
        match tag {
            0 => {
                let method: i64 = field!(Input::Init { method } => method.to_int());
                let method = Method::from_int(method).expect("BUG: bad method tag");
                Input::Init { method }
            },
            1 => Input::SetCommon {
                common: field!(Input::SetCommon { common } => common.clone()),
            },
            2 => Input::SetRCut {
                r_cut: field!(Input::SetRCut { r_cut } => *r_cut),
            },
            3 => Input::SetParameters {
                parameters: field!(Input::SetParameters { parameters } => parameters.clone()),
            },
            4 => Input::SetComputeVirial {
                enable: field!(Input::SetComputeVirial { enable } => *enable),
            },
            5 => Input::Tune {
                positions: field!(Input::Tune { positions, .. } => positions.clone()),
                charges: field!(Input::Tune { charges, .. } => charges.clone()),
            },
            6 => Input::Run {
                positions: field!(Input::Run { positions, .. } => positions.clone()),
                charges: field!(Input::Run { charges, .. } => charges.clone()),
            },
            7 => Input::GetVirial,
            8 => Input::Drop,
            _ => unreachable!("BUG: bad input tag"),
        }
    }
}

impl Broadcast for Common {
    fn broadcast(root: &impl mpi::Root, value: Option<Common>) -> Common {
        macro_rules! field {
            ($field:ident) => {
                Broadcast::broadcast(root, value.as_ref().map(|c| c.$field.clone()))
            };
        }

        // field order must be identical on all processes
        Common {
            box_a: field!(box_a),
            box_b: field!(box_b),
            box_c: field!(box_c),
            offset: field!(offset),
            periodicity: field!(periodicity),
            total_particles: field!(total_particles),
            near_field_flag: field!(near_field_flag),
        }
    }
}

impl DispatchMultiProcess for FcsDispatch {
    type Input = Input;
    type Output = Output;

    fn dispatch(&self, root: &impl mpi::Root, input: Input) -> Output {
        let mut guard = self.instance.lock().expect("poisoned solver instance slot");
        let instance = &mut *guard;

        match input {
            Input::Init { method } => {
                assert!(instance.is_none(), "BUG: init called before drop!");
                let comm = mpi::AsRaw::as_raw(root.as_communicator()) as scafacos_sys::MPI_Comm;
                Output::Unit((|| -> FailResult<()> {
                    let owner = unsafe { FcsOwner::new(method.name(), comm)? };
                    *instance = Some(owner);
                    Ok(())
                })())
            },
            Input::Drop => {
                assert!(instance.is_some(), "BUG: drop called before init!");
                *instance = None;
                Output::Drop
            },
            input => {
                let fcs = instance.as_mut().expect("BUG: solver operation before init");
                match input {
                    Input::SetCommon { common } => Output::Unit(fcs.set_common(common)),
                    Input::SetRCut { r_cut } => Output::Unit(fcs.set_r_cut(r_cut)),
                    Input::SetParameters { parameters } => Output::Unit(fcs.set_parameters(parameters)),
                    Input::SetComputeVirial { enable } => Output::Unit(fcs.set_compute_virial(enable)),
                    Input::Tune { positions, charges } => Output::Unit(fcs.tune(positions, charges)),
                    Input::Run { positions, charges } => Output::Run(fcs.run(positions, charges)),
                    Input::GetVirial => Output::Virial(fcs.virial()),
                    Input::Init { .. } | Input::Drop => unreachable!(),
                }
            },
        }
    }
}
