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

#![deny(unused_must_use)]

#[macro_use] extern crate log;
#[macro_use] extern crate failure;
#[macro_use] extern crate itertools;
extern crate ansi_term;
extern crate clap;
extern crate fern;
extern crate fcs2_tasks_config;
#[cfg(feature = "scafacos-support")]
extern crate fcs2_scafacos_wrap;
#[cfg(feature = "scafacos-support")]
extern crate mpi;

pub type FailResult<T> = Result<T, failure::Error>;

pub mod charges;
pub mod cmd;
pub mod entry_points;
pub mod filetypes;
pub mod solver;
pub mod ui;
