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

//! Fake solvers for testing the plumbing around them.

use super::{SolveFn, SolverBuilder, SolveOutput, System};
use crate::FailResult;

/// V = 0
pub(crate) struct Zero;

impl SolverBuilder for Zero {
    fn initialize_solve_fn(&self, system: &System) -> FailResult<Box<dyn SolveFn>>
    { Ok(Box::new(ZeroFn { compute_virial: system.compute_virial })) }
}

struct ZeroFn {
    compute_virial: bool,
}

impl SolveFn for ZeroFn {
    fn compute(&mut self, positions: &[[f64; 3]], charges: &[f64]) -> FailResult<SolveOutput>
    {Ok({
        ensure!(
            positions.len() == charges.len(),
            "got {} positions for {} charges", positions.len(), charges.len(),
        );
        SolveOutput {
            energy: 0.0,
            potentials: vec![0.0; charges.len()],
            fields: vec![[0.0; 3]; charges.len()],
            virial: if self.compute_virial { Some([[0.0; 3]; 3]) } else { None },
        }
    })}
}
