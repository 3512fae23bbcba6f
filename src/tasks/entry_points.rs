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
use crate::cmd;
use crate::filetypes::Particles;
use crate::solver::{SolveOutput, SolverEnv};
use crate::ui::logging::GlobalLogger;
use crate::ui::method_str;

use fcs2_tasks_config as cfg;
use cfg::YamlRead;

use std::ffi::OsStr;
use std::io::Write;

fn wrap_result_main<F>(main: F)
where F: FnOnce() -> FailResult<()>,
{
    main().unwrap_or_else(|e| {
        for cause in e.iter_chain() {
            error!("{}", cause);
        }

        if std::env::var_os("RUST_BACKTRACE") == Some(OsStr::new("1").to_owned()) {
            error!("{}", e.backtrace());
        } else {
            error!("(run with RUST_BACKTRACE=1 for more detail)");
        }
        std::process::exit(1);
    });
}

// %% CRATES: binary: fcs2 %%
pub fn fcs2() {
    wrap_result_main(|| {
        let matches = clap::App::new("fcs2")
            .about("long-range electrostatics through an external solver library")
            .setting(clap::AppSettings::SubcommandRequiredElseHelp)
            .arg(clap::Arg::with_name("verbose")
                .short("v").long("verbose").multiple(true)
                .help("print more (can be repeated)"))
            .arg(clap::Arg::with_name("log")
                .long("log").value_name("LOGFILE").takes_value(true)
                .help("append log output to this file"))
            .subcommand(clap::SubCommand::with_name("solve")
                .about("run one solve pass over a particle file")
                .arg(clap::Arg::with_name("config")
                    .short("c").long("config").value_name("CONFIG")
                    .takes_value(true).required(true)
                    .help("config yaml"))
                .arg(clap::Arg::with_name("input")
                    .value_name("PARTICLES").required(true)
                    .help("particle file with one `x y z q` per line"))
                .arg(clap::Arg::with_name("output")
                    .short("o").long("output").value_name("OUTFILE")
                    .takes_value(true)
                    .help("write per-particle potentials and fields here")))
            .subcommand(clap::SubCommand::with_name("print-direct")
                .about("parse direct-method parameters and print their canonical form")
                .arg(clap::Arg::with_name("tokens")
                    .value_name("TOKENS").multiple(true)
                    .help("e.g. `cutoff 8.5 images 1 1 1`")))
            .get_matches();

        GlobalLogger::default()
            .verbosity(matches.occurrences_of("verbose") as i32)
            .apply_with_path(matches.value_of("log"))?;

        match matches.subcommand() {
            ("solve", Some(matches)) => do_solve(matches),
            ("print-direct", Some(matches)) => do_print_direct(matches),
            _ => unreachable!("SubcommandRequiredElseHelp"),
        }
    });
}

impl GlobalLogger {
    fn apply_with_path(&mut self, path: Option<&str>) -> FailResult<()> {
        if let Some(path) = path {
            self.path(path);
        }
        self.apply()
    }
}

fn do_solve(matches: &clap::ArgMatches<'_>) -> FailResult<()>
{Ok({
    let config_path = matches.value_of("config").expect("(BUG) required arg");
    let input_path = matches.value_of("input").expect("(BUG) required arg");

    let file = std::fs::File::open(config_path)
        .map_err(|e| format_err!("could not read {}: {}", config_path, e))?;
    let settings: cfg::ValidatedSettings = YamlRead::from_reader(file)
        .map_err(|e| format_err!("{}: {}", config_path, e))?;

    let particles = Particles::load(input_path)?;

    let out = with_solver_env(|env| cmd::run_solve(&settings, &particles, &env))?;
    let out = match out {
        Some(out) => out,
        // a non-root MPI process; it did its share inside the event loop
        None => return Ok(()),
    };

    println!("energy {:.10e}", out.energy);
    if let Some(path) = matches.value_of("output") {
        write_output(path, &particles, &out)?;
        info!("wrote per-particle results to {}", path);
    }
})}

fn do_print_direct(matches: &clap::ArgMatches<'_>) -> FailResult<()>
{Ok({
    let words: Vec<&str> = matches.values_of("tokens")
        .map(|values| values.collect())
        .unwrap_or_default();

    let direct = method_str::parse_direct(&words)?;
    println!("{}", method_str::format_direct(&direct));
})}

fn write_output(path: &str, particles: &Particles, out: &SolveOutput) -> FailResult<()>
{Ok({
    let mut file = std::fs::File::create(path)
        .map_err(|e| format_err!("could not create {}: {}", path, e))?;

    writeln!(file, "# energy {:.10e}", out.energy)?;
    if let Some(virial) = out.virial {
        for row in &virial {
            writeln!(file, "# virial {:.10e} {:.10e} {:.10e}", row[0], row[1], row[2])?;
        }
    }

    writeln!(file, "# x y z q potential field_x field_y field_z")?;
    for i in 0..particles.len() {
        let [x, y, z] = particles.positions[i];
        let [ex, ey, ez] = out.fields[i];
        writeln!(
            file, "{} {} {} {} {:.10e} {:.10e} {:.10e} {:.10e}",
            x, y, z, particles.charges[i], out.potentials[i], ex, ey, ez,
        )?;
    }
})}

// With the external library coupled in, every process must join the event
// loop before the root starts deciding things. The closure result is `None`
// on non-root processes.
#[cfg(feature = "scafacos-support")]
fn with_solver_env<R>(func: impl FnOnce(SolverEnv) -> FailResult<R>) -> FailResult<Option<R>> {
    use fcs2_scafacos_wrap::FcsOnDemand;

    let _universe = mpi::initialize().ok_or_else(|| format_err!("failed to initialize MPI"))?;
    let _lock = fcs2_scafacos_wrap::INSTANCE_LOCK.lock()
        .map_err(|_| format_err!("solver instance lock poisoned"))?;

    match FcsOnDemand::install(|on_demand| {
        func(SolverEnv { on_demand: Some(on_demand) })
    }) {
        Some(result) => Ok(Some(result?)),
        None => Ok(None),
    }
}

#[cfg(not(feature = "scafacos-support"))]
fn with_solver_env<R>(func: impl FnOnce(SolverEnv) -> FailResult<R>) -> FailResult<Option<R>> {
    Ok(Some(func(SolverEnv::default())?))
}
