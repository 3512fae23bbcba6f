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

use crate::FailResult;
use crate::low_level::{LowLevelApi, RawRunOutput};
use crate::pub_types::Common;

use std::ffi::{CStr, CString};

use scafacos_sys as fcs;

/// A light wrapper around a solver handle which handles ownership concerns
/// and provides an interface that uses rust primitive types.
///
/// This implements the low-level API in a manner which directly wraps the C
/// functions, making it suitable for either of the following:
///
/// - For methods to be called on the only process, in a non-MPI setup
///   (the handle is then built on `MPI_COMM_SELF`).
/// - For methods to be called at the same time with the same arguments
///   on all processes, when MPI is used.
///
/// It is expressly NOT CLONE.
#[derive(Debug)]
pub(crate) struct FcsOwner {
    // Handle to the solver instance.
    // - The lack of Clone prevents double-freeing.
    // - Box is not used because it is not allocated by Rust.
    handle: fcs::FCS,
}

impl FcsOwner {
    /// # MPI
    ///
    /// The library's init call is collective over the given communicator.
    /// This method must be called on all member processes with the same
    /// arguments, and afterwards every other public method must be called on
    /// all processes with the same arguments in the same order.
    /// **This includes `Drop::drop`!**
    ///
    /// # Safety
    ///
    /// `communicator` must be a live MPI communicator in the ABI the library
    /// was built against. Also, the library keeps global state, so it is
    /// unsafe to use multiple instances simultaneously on separate threads
    /// (see `INSTANCE_LOCK`).
    pub(crate) unsafe fn new(method: &str, communicator: fcs::MPI_Comm) -> FailResult<Self>
    {Ok({
        let method = CString::new(method)?;
        let mut handle: fcs::FCS = std::ptr::null_mut();

        api_trace!("fcs_init((out), {:?}, {:p})", method, communicator);
        check(fcs::fcs_init(&mut handle, method.as_ptr(), communicator))?;

        if handle.is_null() {
            bail!("solver initialization reported success but returned a null handle");
        }
        FcsOwner { handle }
    })}
}

impl Drop for FcsOwner {
    fn drop(&mut self) {
        api_trace!("fcs_destroy({:p})", self.handle);
        let result = unsafe { fcs::fcs_destroy(self.handle) };
        if let Err(e) = check(result) {
            // can't do anything more useful during a drop
            warn!("error destroying solver handle: {}", e);
        }
    }
}

impl LowLevelApi for FcsOwner {
    fn set_common(&mut self, common: Common) -> FailResult<()>
    {Ok({
        let Common {
            box_a, box_b, box_c, offset, periodicity, total_particles, near_field_flag,
        } = common;
        let periodicity: [fcs::fcs_int; 3] = [
            periodicity[0] as _,
            periodicity[1] as _,
            periodicity[2] as _,
        ];

        api_trace!(
            "fcs_set_common({:p}, {}, {:?}, {:?}, {:?}, {:?}, {:?}, {})",
            self.handle, near_field_flag as i32, box_a, box_b, box_c, offset,
            periodicity, total_particles,
        );
        check(unsafe {
            fcs::fcs_set_common(
                self.handle,
                near_field_flag as fcs::fcs_int,
                box_a.as_ptr(),
                box_b.as_ptr(),
                box_c.as_ptr(),
                offset.as_ptr(),
                periodicity.as_ptr(),
                to_fcs_int(total_particles)?,
            )
        })?;
    })}

    fn set_r_cut(&mut self, r_cut: Option<f64>) -> FailResult<()>
    {Ok({
        match r_cut {
            Some(r_cut) => {
                api_trace!("fcs_set_r_cut({:p}, {})", self.handle, r_cut);
                check(unsafe { fcs::fcs_set_r_cut(self.handle, r_cut) })?;
            },
            None => {
                api_trace!("fcs_unset_r_cut({:p})", self.handle);
                check(unsafe { fcs::fcs_unset_r_cut(self.handle) })?;
            },
        }
    })}

    fn set_parameters(&mut self, parameters: String) -> FailResult<()>
    {Ok({
        if parameters.is_empty() {
            return Ok(());
        }
        let parameters = CString::new(parameters)?;

        api_trace!("fcs_set_parameters({:p}, {:?}, 0)", self.handle, parameters);
        // continue_on_errors = false; an unknown name is a bug in our
        // config-to-parameter translation and must not be swallowed
        check(unsafe { fcs::fcs_set_parameters(self.handle, parameters.as_ptr(), 0) })?;
    })}

    fn set_compute_virial(&mut self, enable: bool) -> FailResult<()>
    {Ok({
        api_trace!("fcs_set_compute_virial({:p}, {})", self.handle, enable as i32);
        check(unsafe { fcs::fcs_set_compute_virial(self.handle, enable as fcs::fcs_int) })?;
    })}

    fn tune(&mut self, mut positions: Vec<f64>, mut charges: Vec<f64>) -> FailResult<()>
    {Ok({
        let n = checked_particle_count(&positions, &charges)?;

        api_trace!("fcs_tune({:p}, {}, ..)", self.handle, n);
        check(unsafe {
            fcs::fcs_tune(self.handle, n, positions.as_mut_ptr(), charges.as_mut_ptr())
        })?;
    })}

    fn run(&mut self, mut positions: Vec<f64>, mut charges: Vec<f64>) -> FailResult<RawRunOutput>
    {Ok({
        let n = checked_particle_count(&positions, &charges)?;

        let mut field = vec![0.0; positions.len()];
        let mut potentials = vec![0.0; charges.len()];

        api_trace!("fcs_run({:p}, {}, ..)", self.handle, n);
        check(unsafe {
            fcs::fcs_run(
                self.handle,
                n,
                positions.as_mut_ptr(),
                charges.as_mut_ptr(),
                field.as_mut_ptr(),
                potentials.as_mut_ptr(),
            )
        })?;

        RawRunOutput { field, potentials }
    })}

    fn virial(&mut self) -> FailResult<Vec<f64>>
    {Ok({
        let mut virial = vec![0.0; 9];

        api_trace!("fcs_get_virial({:p}, (out))", self.handle);
        check(unsafe { fcs::fcs_get_virial(self.handle, virial.as_mut_ptr()) })?;

        virial
    })}
}

// NOTE: Every call to an extern "C" function must have its FCSResult fed
//       through this. (this is our '?')
fn check(result: fcs::FCSResult) -> Result<(), crate::FcsError> {
    if result.is_null() {
        return Ok(());
    }

    unsafe {
        let code = fcs::fcs_result_get_return_code(result) as i32;
        let message = {
            let ptr = fcs::fcs_result_get_message(result);
            if ptr.is_null() {
                String::from("(no message)")
            } else {
                CStr::from_ptr(ptr).to_string_lossy().into_owned()
            }
        };
        // destroying the result invalidates the message pointer, so this
        // comes last
        let _ = fcs::fcs_result_destroy(result);

        Err(crate::FcsError {
            backtrace: failure::Backtrace::new(),
            code, message,
        })
    }
}

fn checked_particle_count(positions: &[f64], charges: &[f64]) -> FailResult<fcs::fcs_int> {
    if positions.len() != 3 * charges.len() {
        bail!(
            "flattened positions have {} values for {} charges",
            positions.len(), charges.len(),
        );
    }
    to_fcs_int(charges.len())
}

fn to_fcs_int(x: usize) -> FailResult<fcs::fcs_int> {
    if x > fcs::fcs_int::max_value() as usize {
        bail!("value too large for the solver library's integer type: {}", x);
    }
    Ok(x as fcs::fcs_int)
}
