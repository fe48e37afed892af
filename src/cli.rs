//! Command-line surface shared by all benchmark binaries
//!
//! Every benchmark accepts the same short flags: `-m` measuring CPU, `-i`
//! interference selector (repeatable, union semantics), `-l` latency CSV
//! path, `-d` latency duration, `-e` energy CSV path, `-s` energy sample
//! count. Latency and energy mode may both be requested in one run.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::scenario::{Scenario, ScenarioMask};

/// Interference selector accepted by `-i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InterferenceArg {
    /// All four scenarios.
    All,
    /// Only the no-interference baseline.
    #[value(name = "none")]
    NoInterference,
    /// Co-runner on a sibling hardware thread of the same core.
    Smt,
    /// Co-runner on a different core of the same package.
    Mc,
    /// Co-runner on a different package.
    Numa,
}

impl InterferenceArg {
    fn mask(self) -> ScenarioMask {
        match self {
            InterferenceArg::All => ScenarioMask::all(),
            InterferenceArg::NoInterference => ScenarioMask::single(Scenario::NoInterference),
            InterferenceArg::Smt => ScenarioMask::single(Scenario::LocalCore),
            InterferenceArg::Mc => ScenarioMask::single(Scenario::RemoteCore),
            InterferenceArg::Numa => ScenarioMask::single(Scenario::RemotePackage),
        }
    }
}

/// Options common to every benchmark binary.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Opts {
    /// OS index of the CPU that runs the measuring thread.
    #[arg(short = 'm', long = "measuring-cpu", default_value_t = 0)]
    pub measuring_cpu: usize,

    /// Interference scenarios to run; may be given multiple times.
    #[arg(short = 'i', long = "interference", value_enum)]
    pub interference: Vec<InterferenceArg>,

    /// Write latency percentiles as CSV to this file.
    #[arg(short = 'l', long = "latency-output")]
    pub latency_output: Option<PathBuf>,

    /// Latency measurement window in seconds.
    #[arg(short = 'd', long = "duration", default_value_t = 30)]
    pub duration_secs: u64,

    /// Write energy-per-operation samples as CSV to this file.
    #[arg(short = 'e', long = "energy-output")]
    pub energy_output: Option<PathBuf>,

    /// Number of one-second energy samples per scenario.
    #[arg(short = 's', long = "energy-samples", default_value_t = 30)]
    pub energy_samples: u32,
}

impl Opts {
    /// Union of all `-i` selections; all four scenarios when none is given.
    pub fn scenario_mask(&self) -> ScenarioMask {
        if self.interference.is_empty() {
            return ScenarioMask::all();
        }
        self.interference
            .iter()
            .fold(ScenarioMask::EMPTY, |mask, arg| mask.union(arg.mask()))
    }
}
