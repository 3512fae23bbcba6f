//! Raw declarations for the ScaFaCoS (`libfcs`) C API.
//!
//! This is a hand-maintained subset covering the entry points the wrapper
//! crate actually uses: handle lifecycle, the common parameter set, the
//! generic `name,value` parameter interface, tuning, and the solve pass.
//! Signatures follow the `fcs.h` of ScaFaCoS 1.0.
//!
//! Every function returns an `FCSResult`; a null result means success, and
//! anything else must be inspected with the `fcs_result_*` functions and
//! released with [`fcs_result_destroy`].

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_int, c_void};

/// Opaque handle to one solver instance (`FCS` in the C headers).
pub type FCS = *mut c_void;

/// Opaque error/result object (`FCSResult`). Null on success.
pub type FCSResult = *mut c_void;

/// `fcs_int` under the library's default build configuration.
pub type fcs_int = c_int;

/// `fcs_float` under the library's default build configuration.
pub type fcs_float = f64;

/// An MPI communicator, as laid out by pointer-based MPI ABIs (OpenMPI).
///
/// The library is unconditionally MPI-parallel; even serial use goes through
/// `MPI_COMM_SELF`. Obtain a raw communicator from the `mpi` crate via its
/// `AsRaw` trait rather than constructing one here.
pub type MPI_Comm = *mut c_void;

pub const FCS_SUCCESS: fcs_int = 0;

extern "C" {
    pub fn fcs_init(handle: *mut FCS, method_name: *const c_char, communicator: MPI_Comm) -> FCSResult;
    pub fn fcs_destroy(handle: FCS) -> FCSResult;

    pub fn fcs_set_common(
        handle: FCS,
        near_field_flag: fcs_int,
        box_a: *const fcs_float,
        box_b: *const fcs_float,
        box_c: *const fcs_float,
        box_origin: *const fcs_float,
        periodicity: *const fcs_int,
        total_particles: fcs_int,
    ) -> FCSResult;

    pub fn fcs_set_r_cut(handle: FCS, r_cut: fcs_float) -> FCSResult;
    pub fn fcs_unset_r_cut(handle: FCS) -> FCSResult;

    /// Accepts a comma-separated `name,value,name,value,...` string of
    /// solver-specific settings.
    pub fn fcs_set_parameters(handle: FCS, parameters: *const c_char, continue_on_errors: fcs_int) -> FCSResult;

    pub fn fcs_set_compute_virial(handle: FCS, compute_virial: fcs_int) -> FCSResult;
    /// `virial` must point at 9 floats (row-major 3x3).
    pub fn fcs_get_virial(handle: FCS, virial: *mut fcs_float) -> FCSResult;

    pub fn fcs_tune(
        handle: FCS,
        local_particles: fcs_int,
        positions: *mut fcs_float,
        charges: *mut fcs_float,
    ) -> FCSResult;

    /// `field` must point at `3 * local_particles` floats, `potentials` at
    /// `local_particles` floats.
    pub fn fcs_run(
        handle: FCS,
        local_particles: fcs_int,
        positions: *mut fcs_float,
        charges: *mut fcs_float,
        field: *mut fcs_float,
        potentials: *mut fcs_float,
    ) -> FCSResult;

    pub fn fcs_result_get_return_code(result: FCSResult) -> fcs_int;
    pub fn fcs_result_get_message(result: FCSResult) -> *const c_char;
    pub fn fcs_result_destroy(result: FCSResult) -> FCSResult;
}
