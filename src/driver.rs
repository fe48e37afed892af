//! Benchmark entry point shared by the `bench-*` binaries
//!
//! Parses the command line, initialises logging, installs the harness
//! signal handlers, and runs the selected scenarios: latency mode first,
//! then energy mode. With neither `-l` nor `-e` given, latency CSV goes to
//! stdout.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;

use clap::error::ErrorKind;
use clap::Parser;

use crate::action::Action;
use crate::cli::Opts;
use crate::energy::{self, EnergyConfig};
use crate::error::Result;
use crate::latency::{self, LatencyConfig};
use crate::output::{EnergyWriter, LatencyWriter};
use crate::scenario::ScenarioMask;
use crate::signals;

/// Interfering threads per co-runner PU. The harness supports more, but the
/// command line does not expose a knob for it.
pub const DEFAULT_INTERFERING_THREADS: usize = 1;

/// Run a payload whose construction cannot fail.
pub fn run_all<A: Action>(action: A) -> Result<()> {
    run_all_with(move |_nr_threads| Ok(action))
}

/// Run a payload built by `build`, which receives the interfering-thread
/// count. Payloads that keep per-co-runner slots (wakeup benchmarks) size
/// themselves from it.
pub fn run_all_with<A, F>(build: F) -> Result<()>
where
    A: Action,
    F: FnOnce(usize) -> Result<A>,
{
    let opts = parse_or_exit();
    init_logging();
    signals::install()?;

    let action = build(DEFAULT_INTERFERING_THREADS)?;
    let mask = opts.scenario_mask();

    if let Some(path) = &opts.latency_output {
        let file = BufWriter::new(File::create(path)?);
        run_latency(&action, &opts, mask, file)?;
    } else if opts.energy_output.is_none() {
        run_latency(&action, &opts, mask, std::io::stdout())?;
    }

    if let Some(path) = &opts.energy_output {
        let file = BufWriter::new(File::create(path)?);
        run_energy(&action, &opts, mask, file)?;
    }
    Ok(())
}

fn run_latency<A, W>(action: &A, opts: &Opts, mask: ScenarioMask, out: W) -> Result<()>
where
    A: Action,
    W: Write + Send,
{
    let mut writer = LatencyWriter::new(out);
    writer.write_header()?;
    for scenario in mask.iter() {
        let cfg = LatencyConfig {
            scenario,
            measuring_cpu: opts.measuring_cpu,
            duration_secs: opts.duration_secs,
            nr_threads: DEFAULT_INTERFERING_THREADS,
        };
        latency::run(action, &cfg, &mut writer)?;
    }
    writer.flush()
}

fn run_energy<A, W>(action: &A, opts: &Opts, mask: ScenarioMask, out: W) -> Result<()>
where
    A: Action,
    W: Write + Send,
{
    let mut writer = EnergyWriter::new(out);
    writer.write_header()?;
    for scenario in mask.iter() {
        let cfg = EnergyConfig {
            scenario,
            measuring_cpu: opts.measuring_cpu,
            samples: opts.energy_samples,
            nr_threads: DEFAULT_INTERFERING_THREADS,
        };
        energy::run(action, &cfg, &mut writer)?;
    }
    writer.flush()
}

fn parse_or_exit() -> Opts {
    match Opts::try_parse() {
        Ok(opts) => opts,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            // Prints the "error: ..." message to stderr (help goes to stdout).
            let _ = err.print();
            process::exit(code);
        }
    }
}

fn init_logging() {
    // Warnings (unreachable scenario, missing MSR device) must reach
    // stderr without any environment setup.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}
