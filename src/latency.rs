//! Latency measurement loop
//!
//! Runs a payload's measured operation on a pinned measuring thread until
//! the window alarm fires, recording every sample into an HDR histogram,
//! then emits the scenario's CSV rows and tears down the co-runners.

use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::thread;

use hdrhistogram::Histogram;

use crate::action::{Action, InterferingThreads};
use crate::error::{BenchError, Result};
use crate::output::LatencyWriter;
use crate::runner;
use crate::scenario::Scenario;
use crate::signals;
use crate::topology::{ProcessorUnit, Topology};

/// Histograms cover 1 ns up to 3.6 s; anything slower is not a latency.
const LATENCY_RANGE_MAX_NS: u64 = 3_600_000_000;
/// Significant decimal digits kept by the histogram.
const HISTOGRAM_SIGFIG: u8 = 3;

/// One latency run: a payload under one scenario.
#[derive(Clone, Debug)]
pub struct LatencyConfig {
    pub scenario: Scenario,
    /// OS index of the PU running the measuring thread.
    pub measuring_cpu: usize,
    /// Measurement window in seconds.
    pub duration_secs: u64,
    /// Number of interfering threads on the co-runner PU.
    pub nr_threads: usize,
}

/// Detect the machine topology and run one latency measurement.
pub fn run<A, W>(action: &A, cfg: &LatencyConfig, out: &mut LatencyWriter<W>) -> Result<()>
where
    A: Action,
    W: Write + Send,
{
    let topology = match Topology::detect() {
        Ok(t) => t,
        Err(e) => {
            log::warn!("{}: {}; skipping", cfg.scenario, e);
            return Ok(());
        }
    };
    run_on_topology(action, &topology, cfg, out)
}

/// Run one latency measurement against an explicit topology snapshot.
pub fn run_on_topology<A, W>(
    action: &A,
    topology: &Topology,
    cfg: &LatencyConfig,
    out: &mut LatencyWriter<W>,
) -> Result<()>
where
    A: Action,
    W: Write + Send,
{
    if cfg.scenario == Scenario::NoInterference && !action.supports_non_interference() {
        return Ok(());
    }
    let Some(measuring_pu) = topology.pu(cfg.measuring_cpu).copied() else {
        log::warn!(
            "{}: measuring CPU {} is not present; skipping",
            cfg.scenario,
            cfg.measuring_cpu
        );
        return Ok(());
    };
    let co_runner_pu = match topology.co_runner(&measuring_pu, cfg.scenario) {
        Some(pu) => Some(*pu),
        None if cfg.scenario == Scenario::NoInterference => None,
        None => {
            log::warn!(
                "{}: no suitable co-runner PU on this topology; skipping",
                cfg.scenario
            );
            return Ok(());
        }
    };

    let stop = AtomicBool::new(false);
    thread::scope(|scope| -> Result<()> {
        let threads =
            runner::spawn_interfering(scope, action, co_runner_pu, cfg.nr_threads, &stop)?;
        let measuring = {
            let threads = threads.clone();
            let stop = &stop;
            scope.spawn(move || measure(action, measuring_pu, &threads, cfg, out, stop))
        };
        let result = measuring
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        runner::stop_interfering(&stop, &threads);
        result
    })
}

fn measure<A, W>(
    action: &A,
    pu: ProcessorUnit,
    threads: &InterferingThreads,
    cfg: &LatencyConfig,
    out: &mut LatencyWriter<W>,
    stop: &AtomicBool,
) -> Result<()>
where
    A: Action,
    W: Write,
{
    Topology::bind_current_thread(&pu)?;
    let mut state = action.make_state(threads)?;
    let mut hist = Histogram::<u64>::new_with_bounds(1, LATENCY_RANGE_MAX_NS, HISTOGRAM_SIGFIG)
        .map_err(|e| BenchError::Histogram(e.to_string()))?;

    let mut dropped: u64 = 0;
    signals::clear_window_flags();
    signals::arm_alarm(cfg.duration_secs);
    while !signals::sigint_fired() && !signals::alarm_fired() {
        match action.measured_operation(&mut state) {
            // The clock is monotonic, so a zero diff only means the
            // operation outran the clock resolution; clamp to 1 ns.
            Ok(ns) => {
                if hist.record(ns.max(1)).is_err() {
                    dropped += 1;
                }
            }
            Err(BenchError::Interrupted) => {}
            Err(e) => {
                signals::cancel_alarm();
                stop.store(true, std::sync::atomic::Ordering::Relaxed);
                return Err(e);
            }
        }
    }
    signals::cancel_alarm();

    if dropped > 0 {
        log::warn!(
            "{}: dropped {} samples outside the histogram range",
            cfg.scenario,
            dropped
        );
    }
    out.write_scenario(cfg.scenario, &hist)?;
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    Ok(())
}
