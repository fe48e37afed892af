//! Energy-per-operation measurement via RAPL
//!
//! For each one-second sample the measuring thread aligns itself to a 1 ms
//! boundary (the RAPL update granularity), snapshots the package and DRAM
//! energy counters, runs the payload's raw operation in a tight loop until
//! the alarm fires, snapshots again, and emits one CSV row with the energy
//! divided by the number of operations completed.
//!
//! The counters are model-specific registers read through the per-CPU MSR
//! device. Energy measurement is an optional capability: a machine without
//! the device (non-x86, missing msr module, no permission) gets a warning
//! and the (benchmark, scenario) pair is skipped.

use std::fs::File;
use std::io::Write;
use std::os::unix::fs::FileExt;
use std::sync::atomic::AtomicBool;
use std::thread;

use crate::action::{Action, InterferingThreads};
use crate::clock;
use crate::error::{BenchError, Result};
use crate::output::EnergyWriter;
use crate::runner;
use crate::scenario::Scenario;
use crate::signals;
use crate::topology::{ProcessorUnit, Topology};

/// RAPL power unit register; bits 12:8 hold the energy unit exponent.
pub const MSR_RAPL_POWER_UNIT: u64 = 0x606;
/// Cumulative package energy counter.
pub const MSR_PKG_ENERGY_STATUS: u64 = 0x611;
/// Cumulative DRAM energy counter.
pub const MSR_DRAM_ENERGY_STATUS: u64 = 0x619;

/// Source of RAPL energy readings. The production implementation is
/// [`MsrProbe`]; tests substitute scripted readings.
pub trait RaplProbe {
    /// Joules per counter increment.
    fn energy_unit_joules(&self) -> f64;
    /// Current package energy counter value.
    fn package_energy(&mut self) -> Result<u64>;
    /// Current DRAM energy counter value.
    fn dram_energy(&mut self) -> Result<u64>;
}

/// RAPL reader backed by `/dev/cpu/<os_index>/msr`.
pub struct MsrProbe {
    dev: File,
    unit_joules: f64,
}

impl MsrProbe {
    /// Open the MSR device of the given CPU and derive the energy unit from
    /// the power-unit register.
    pub fn open(os_index: usize) -> Result<MsrProbe> {
        let dev = File::open(format!("/dev/cpu/{}/msr", os_index))?;
        let power_unit = read_msr(&dev, MSR_RAPL_POWER_UNIT)?;
        let exponent = ((power_unit >> 8) & 0x1f) as i32;
        Ok(MsrProbe {
            dev,
            unit_joules: 2f64.powi(-exponent),
        })
    }
}

impl RaplProbe for MsrProbe {
    fn energy_unit_joules(&self) -> f64 {
        self.unit_joules
    }

    fn package_energy(&mut self) -> Result<u64> {
        read_msr(&self.dev, MSR_PKG_ENERGY_STATUS)
    }

    fn dram_energy(&mut self) -> Result<u64> {
        read_msr(&self.dev, MSR_DRAM_ENERGY_STATUS)
    }
}

fn read_msr(dev: &File, offset: u64) -> Result<u64> {
    let mut buf = [0u8; 8];
    dev.read_exact_at(&mut buf, offset)?;
    Ok(u64::from_le_bytes(buf))
}

/// Energy consumed per operation in nanojoules.
///
/// The RAPL energy counters are 32-bit and wrap roughly once a minute, so
/// the delta is taken on the low 32 bits before widening. A one-second
/// sample window is always shorter than one wrap.
pub fn energy_per_op_nj(start: u64, end: u64, unit_joules: f64, operations: u64) -> f64 {
    let delta = end.wrapping_sub(start) & 0xffff_ffff;
    delta as f64 * unit_joules * 1e9 / operations as f64
}

/// One energy run: a payload under one scenario.
#[derive(Clone, Debug)]
pub struct EnergyConfig {
    pub scenario: Scenario,
    /// OS index of the PU running the measuring thread.
    pub measuring_cpu: usize,
    /// Number of one-second samples to take.
    pub samples: u32,
    /// Number of interfering threads on the co-runner PU.
    pub nr_threads: usize,
}

/// Detect the machine topology and run one energy measurement using the
/// real MSR probe.
pub fn run<A, W>(action: &A, cfg: &EnergyConfig, out: &mut EnergyWriter<W>) -> Result<()>
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
    let measuring_cpu = cfg.measuring_cpu;
    run_with_probe(action, &topology, cfg, out, move || MsrProbe::open(measuring_cpu))
}

/// Run one energy measurement with a caller-supplied probe constructor. The
/// constructor runs on the measuring thread, after binding, mirroring the
/// lazy per-CPU open of the MSR device.
pub fn run_with_probe<A, W, P, F>(
    action: &A,
    topology: &Topology,
    cfg: &EnergyConfig,
    out: &mut EnergyWriter<W>,
    make_probe: F,
) -> Result<()>
where
    A: Action,
    W: Write + Send,
    P: RaplProbe,
    F: FnOnce() -> Result<P> + Send,
{
    if !action.supports_energy_measurement() {
        return Ok(());
    }
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
            scope.spawn(move || measure(action, measuring_pu, &threads, cfg, out, stop, make_probe))
        };
        let result = measuring
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        runner::stop_interfering(&stop, &threads);
        result
    })
}

#[allow(clippy::too_many_arguments)]
fn measure<A, W, P, F>(
    action: &A,
    pu: ProcessorUnit,
    threads: &InterferingThreads,
    cfg: &EnergyConfig,
    out: &mut EnergyWriter<W>,
    stop: &AtomicBool,
    make_probe: F,
) -> Result<()>
where
    A: Action,
    W: Write,
    P: RaplProbe,
    F: FnOnce() -> Result<P>,
{
    Topology::bind_current_thread(&pu)?;
    let mut probe = match make_probe() {
        Ok(probe) => probe,
        Err(e) => {
            log::warn!(
                "{} [{}]: energy measurement unavailable ({}); skipping",
                action.name(),
                cfg.scenario,
                e
            );
            stop.store(true, std::sync::atomic::Ordering::Relaxed);
            return Ok(());
        }
    };
    let unit_joules = probe.energy_unit_joules();
    let mut state = action.make_state(threads)?;

    signals::clear_window_flags();
    for _ in 0..cfg.samples {
        if signals::sigint_fired() {
            break;
        }
        signals::clear_alarm_flag();
        signals::arm_alarm(1);
        clock::spin_until_next_millisecond();

        let start_ns = clock::monotonic_ns();
        let pkg_start = probe.package_energy()?;
        let dram_start = probe.dram_energy()?;

        let mut operations: u64 = 0;
        while !signals::alarm_fired() && !signals::sigint_fired() {
            match action.raw_operation(&mut state) {
                Ok(()) => operations += 1,
                Err(BenchError::Interrupted) => {}
                Err(e) => {
                    signals::cancel_alarm();
                    stop.store(true, std::sync::atomic::Ordering::Relaxed);
                    return Err(e);
                }
            }
        }

        let pkg_end = probe.package_energy()?;
        let dram_end = probe.dram_energy()?;
        let end_ns = clock::monotonic_ns();

        if operations == 0 {
            log::warn!(
                "{} [{}]: no operations completed within the sample window",
                action.name(),
                cfg.scenario
            );
            continue;
        }
        out.write_sample(
            action.name(),
            cfg.scenario,
            operations,
            (end_ns.saturating_sub(start_ns)) as f64 / operations as f64,
            energy_per_op_nj(pkg_start, pkg_end, unit_joules, operations),
            energy_per_op_nj(dram_start, dram_end, unit_joules, operations),
        )?;
    }
    signals::cancel_alarm();
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_per_op_matches_rapl_unit_scale() {
        // 1000 counts at 2^-16 J each over 1e6 operations.
        let nj = energy_per_op_nj(0, 1000, 2f64.powi(-16), 1_000_000);
        assert!((nj - 15.2587890625).abs() < 1e-9);
    }

    #[test]
    fn test_energy_delta_survives_32bit_wrap() {
        let nj = energy_per_op_nj(0xffff_fff0, 0x10, 1.0, 1);
        assert!((nj - 0x20 as f64 * 1e9).abs() < 1e-3);
    }

    #[test]
    fn test_energy_delta_ignores_high_bits() {
        // Reads may carry reserved high bits; only the low 32 count.
        let nj = energy_per_op_nj(0xdead_0000_0000_0100, 0xbeef_0000_0000_0200, 1.0, 1_000_000_000);
        assert!((nj - 0x100 as f64).abs() < 1e-6);
    }
}
