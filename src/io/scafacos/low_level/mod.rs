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

//! The low-level solver API, with one method per collective operation.
//!
//! Implementors:
//!
//! * `plain::FcsOwner` (feature `link`) directly wraps the C functions.
//!   Under MPI it must be driven on all processes with the same arguments in
//!   the same order — including `Drop`.
//! * `mpi::MpiFcsOwner` (features `link` + `mpi`) exists only on the root
//!   process and forwards each call to all processes through the on-demand
//!   event loop in `mpi_helper`.
//!
//! Arguments are owned values rather than references so that the same method
//! set can be communicated between processes without an extra copy layer.

use crate::FailResult;
use crate::pub_types::Common;

#[cfg(feature = "link")]
pub(crate) mod plain;
#[cfg(feature = "mpi")]
pub(crate) mod mpi_helper;
#[cfg(all(feature = "mpi", feature = "link"))]
pub(crate) mod mpi;

pub(crate) trait LowLevelApi {
    fn set_common(&mut self, common: Common) -> FailResult<()>;

    /// `None` clears a previously set cutoff override.
    fn set_r_cut(&mut self, r_cut: Option<f64>) -> FailResult<()>;

    /// Takes the rendered `name,value,...` form (see
    /// [`crate::render_parameter_string`]).
    fn set_parameters(&mut self, parameters: String) -> FailResult<()>;

    fn set_compute_virial(&mut self, enable: bool) -> FailResult<()>;

    /// `positions` is the flattened `3 * n` coordinate list matching the
    /// `n`-element `charges`.
    fn tune(&mut self, positions: Vec<f64>, charges: Vec<f64>) -> FailResult<()>;

    fn run(&mut self, positions: Vec<f64>, charges: Vec<f64>) -> FailResult<RawRunOutput>;

    /// Row-major 3x3 virial accumulated by the last run.
    fn virial(&mut self) -> FailResult<Vec<f64>>;
}

/// Flat output buffers as produced by the library.
#[derive(Debug, Clone)]
pub(crate) struct RawRunOutput {
    pub(crate) field: Vec<f64>,
    pub(crate) potentials: Vec<f64>,
}
