//! Energy loop tests with a scripted RAPL probe.
//!
//! The loop itself is real (alarm-driven one-second sample windows); only
//! the MSR source is substituted.

use std::collections::VecDeque;
use std::sync::Mutex;

use syslat::action::{Action, InterferingThreads};
use syslat::energy::{self, energy_per_op_nj, EnergyConfig, RaplProbe};
use syslat::error::{BenchError, Result};
use syslat::output::EnergyWriter;
use syslat::{ProcessorUnit, Scenario, Topology};

static HARNESS_LOCK: Mutex<()> = Mutex::new(());

const ENERGY_UNIT: f64 = 1.0 / 65536.0; // 2^-16 J per count

struct ScriptedProbe {
    package: VecDeque<u64>,
    dram: VecDeque<u64>,
}

impl RaplProbe for ScriptedProbe {
    fn energy_unit_joules(&self) -> f64 {
        ENERGY_UNIT
    }

    fn package_energy(&mut self) -> Result<u64> {
        self.package.pop_front().ok_or(BenchError::Interrupted)
    }

    fn dram_energy(&mut self) -> Result<u64> {
        self.dram.pop_front().ok_or(BenchError::Interrupted)
    }
}

struct GetPid;

impl Action for GetPid {
    type State = ();

    fn name(&self) -> &'static str {
        "getpid"
    }

    fn make_state(&self, _threads: &InterferingThreads) -> Result<()> {
        Ok(())
    }

    fn raw_operation(&self, _state: &mut ()) -> Result<()> {
        unsafe {
            libc::getpid();
        }
        Ok(())
    }
}

fn single_pu_topology() -> Topology {
    Topology::from_processors(vec![ProcessorUnit {
        os_index: 0,
        core_id: 0,
        package_id: 0,
    }])
}

#[test]
fn scripted_probe_produces_one_consistent_row() {
    let _guard = HARNESS_LOCK.lock().unwrap();
    syslat::signals::install().unwrap();

    let cfg = EnergyConfig {
        scenario: Scenario::NoInterference,
        measuring_cpu: 0,
        samples: 1,
        nr_threads: 1,
    };
    let mut writer = EnergyWriter::new(Vec::new());
    energy::run_with_probe(&GetPid, &single_pu_topology(), &cfg, &mut writer, || {
        Ok(ScriptedProbe {
            package: VecDeque::from([0, 1000]),
            dram: VecDeque::from([0, 500]),
        })
    })
    .unwrap();

    let csv = String::from_utf8(writer.into_inner()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Benchmark,Scenario,Operations,DurationPerOperation(ns),\
         PackageEnergyPerOperation(nJ),DRAMEnergyPerOperation(nJ)"
    );
    let row = lines.next().unwrap();
    assert!(lines.next().is_none());

    let fields: Vec<&str> = row.split(',').collect();
    assert_eq!(fields[0], "getpid");
    assert_eq!(fields[1], "No interference");

    let operations: u64 = fields[2].parse().unwrap();
    assert!(operations > 0, "a one second tight loop completes operations");

    // One second of getpid at a few hundred ns each.
    let ns_per_op: f64 = fields[3].parse().unwrap();
    assert!(ns_per_op > 1.0 && ns_per_op < 1_000_000.0, "ns/op was {ns_per_op}");

    // The emitted columns are the scripted deltas divided by the observed
    // operation count, rounded to whole nanojoules.
    let pkg: f64 = fields[4].parse().unwrap();
    let dram: f64 = fields[5].parse().unwrap();
    assert_eq!(pkg, energy_per_op_nj(0, 1000, ENERGY_UNIT, operations).round());
    assert_eq!(dram, energy_per_op_nj(0, 500, ENERGY_UNIT, operations).round());
}

#[test]
fn unavailable_probe_skips_the_pair_with_no_rows() {
    let _guard = HARNESS_LOCK.lock().unwrap();
    syslat::signals::install().unwrap();

    let cfg = EnergyConfig {
        scenario: Scenario::NoInterference,
        measuring_cpu: 0,
        samples: 3,
        nr_threads: 1,
    };
    let mut writer = EnergyWriter::new(Vec::new());
    energy::run_with_probe(
        &GetPid,
        &single_pu_topology(),
        &cfg,
        &mut writer,
        || -> Result<ScriptedProbe> {
            Err(BenchError::Sys {
                call: "open",
                source: std::io::Error::from_raw_os_error(libc::ENOENT),
            })
        },
    )
    .unwrap();

    let csv = String::from_utf8(writer.into_inner()).unwrap();
    assert!(csv.is_empty(), "unavailable RAPL must skip silently: {csv:?}");
}

#[test]
fn reference_energy_math() {
    // 1000 counts at 2^-16 J over 1e6 ops is 15.2587890625 nJ/op.
    let nj = energy_per_op_nj(0, 1000, ENERGY_UNIT, 1_000_000);
    assert!((nj - 15.2587890625).abs() < 1e-12);
    // The 32-bit counter wraps about once a minute; deltas must survive it.
    let wrapped = energy_per_op_nj(u32::MAX as u64 - 5, 10, 1.0, 1);
    assert!((wrapped - 16e9).abs() < 1.0);
}
