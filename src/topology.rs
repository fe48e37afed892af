//! CPU topology snapshot and scenario resolution
//!
//! A processing unit (PU) is the smallest schedulable logical CPU. Each PU
//! belongs to a physical core, and each core to a package (socket). The
//! snapshot is read from sysfs; a core is identified by its
//! `(package_id, core_id)` pair because `core_id` values repeat across
//! packages.
//!
//! The resolver picks the co-runner PU for an interference scenario by
//! walking PUs in OS-index order and returning the first one whose
//! relationship to the measuring PU matches. Some scenarios have no match on
//! a given machine (no second socket, SMT disabled); callers are expected to
//! skip those scenarios rather than fail.

use std::fs;

use nix::sched::{sched_setaffinity, CpuSet};
use nix::unistd::Pid;

use crate::error::{BenchError, Result};
use crate::scenario::Scenario;

const SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// One logical CPU and its position in the core/package hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessorUnit {
    /// OS index, as used by `sched_setaffinity` and `/dev/cpu/<n>/msr`.
    pub os_index: usize,
    /// Core id as reported by the kernel; only unique within a package.
    pub core_id: usize,
    /// Package (socket) id.
    pub package_id: usize,
}

impl ProcessorUnit {
    /// True if both PUs are hardware threads of the same physical core.
    pub fn same_core(&self, other: &ProcessorUnit) -> bool {
        self.package_id == other.package_id && self.core_id == other.core_id
    }

    /// True if both PUs live on the same package.
    pub fn same_package(&self, other: &ProcessorUnit) -> bool {
        self.package_id == other.package_id
    }
}

/// Snapshot of the machine's processing units.
#[derive(Clone, Debug)]
pub struct Topology {
    pus: Vec<ProcessorUnit>,
}

impl Topology {
    /// Read the topology of the running machine from sysfs.
    pub fn detect() -> Result<Topology> {
        let nr_cpus = num_cpus::get();
        let mut pus = Vec::with_capacity(nr_cpus);
        for os_index in 0..nr_cpus {
            pus.push(ProcessorUnit {
                os_index,
                core_id: read_topology_id(os_index, "core_id")?,
                package_id: read_topology_id(os_index, "physical_package_id")?,
            });
        }
        if pus.is_empty() {
            return Err(BenchError::Topology("no processing units found".into()));
        }
        Ok(Topology { pus })
    }

    /// Build a snapshot from an explicit PU list. Used by tests and useful
    /// for reasoning about machines other than the current one.
    pub fn from_processors(pus: Vec<ProcessorUnit>) -> Topology {
        Topology { pus }
    }

    /// Look up a PU by OS index.
    pub fn pu(&self, os_index: usize) -> Option<&ProcessorUnit> {
        self.pus.iter().find(|pu| pu.os_index == os_index)
    }

    /// All PUs in OS-index order.
    pub fn pus(&self) -> &[ProcessorUnit] {
        &self.pus
    }

    /// Resolve the co-runner PU for `scenario` given the measuring PU.
    ///
    /// Returns `None` when the scenario calls for no co-runner
    /// (`NoInterference`) or when the topology cannot satisfy it.
    pub fn co_runner(&self, measuring: &ProcessorUnit, scenario: Scenario) -> Option<&ProcessorUnit> {
        if scenario == Scenario::NoInterference {
            return None;
        }
        self.pus
            .iter()
            .filter(|pu| pu.os_index != measuring.os_index)
            .find(|pu| match scenario {
                Scenario::NoInterference => false,
                Scenario::LocalCore => pu.same_core(measuring),
                Scenario::RemoteCore => pu.same_package(measuring) && !pu.same_core(measuring),
                Scenario::RemotePackage => !pu.same_package(measuring),
            })
    }

    /// Pin the calling thread to `pu`.
    ///
    /// Binding is done from inside the target thread so its affinity is in
    /// place before any payload code runs on it.
    pub fn bind_current_thread(pu: &ProcessorUnit) -> Result<()> {
        let mut cpu_set = CpuSet::new();
        cpu_set.set(pu.os_index)?;
        sched_setaffinity(Pid::from_raw(0), &cpu_set)?;
        Ok(())
    }
}

fn read_topology_id(os_index: usize, leaf: &str) -> Result<usize> {
    let path = format!("{}/cpu{}/topology/{}", SYSFS_CPU_ROOT, os_index, leaf);
    let raw = fs::read_to_string(&path)
        .map_err(|e| BenchError::Topology(format!("reading {}: {}", path, e)))?;
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|e| BenchError::Topology(format!("parsing {}: {}", path, e)))?;
    // Some platforms report -1 for ids they do not implement.
    Ok(value.max(0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2 packages x 2 cores x 2 hardware threads, with the sibling threads
    /// enumerated after all cores the way Linux usually numbers them.
    fn two_socket_smt() -> Topology {
        let mut pus = Vec::new();
        for os_index in 0..8 {
            let package_id = (os_index / 2) % 2;
            let core_id = os_index % 2;
            pus.push(ProcessorUnit {
                os_index,
                core_id,
                package_id,
            });
        }
        // os 0..3 -> pkg0/core0, pkg0/core1, pkg1/core0, pkg1/core1;
        // os 4..7 repeat the same cores as SMT siblings.
        Topology::from_processors(pus)
    }

    #[test]
    fn test_remote_package_crosses_sockets() {
        let topo = two_socket_smt();
        for pu in topo.pus() {
            let other = topo.co_runner(pu, Scenario::RemotePackage).unwrap();
            assert!(!other.same_package(pu));
        }
    }

    #[test]
    fn test_remote_core_stays_on_package() {
        let topo = two_socket_smt();
        for pu in topo.pus() {
            let other = topo.co_runner(pu, Scenario::RemoteCore).unwrap();
            assert!(other.same_package(pu));
            assert!(!other.same_core(pu));
        }
    }

    #[test]
    fn test_local_core_is_a_distinct_sibling() {
        let topo = two_socket_smt();
        for pu in topo.pus() {
            let other = topo.co_runner(pu, Scenario::LocalCore).unwrap();
            assert!(other.same_core(pu));
            assert_ne!(other.os_index, pu.os_index);
        }
    }

    #[test]
    fn test_no_interference_never_resolves() {
        let topo = two_socket_smt();
        for pu in topo.pus() {
            assert!(topo.co_runner(pu, Scenario::NoInterference).is_none());
        }
    }

    #[test]
    fn test_single_socket_has_no_remote_package() {
        let topo = Topology::from_processors(vec![
            ProcessorUnit { os_index: 0, core_id: 0, package_id: 0 },
            ProcessorUnit { os_index: 1, core_id: 1, package_id: 0 },
        ]);
        let measuring = *topo.pu(0).unwrap();
        assert!(topo.co_runner(&measuring, Scenario::RemotePackage).is_none());
        assert!(topo.co_runner(&measuring, Scenario::LocalCore).is_none());
        assert!(topo.co_runner(&measuring, Scenario::RemoteCore).is_some());
    }

    #[test]
    fn test_pu_lookup() {
        let topo = two_socket_smt();
        assert_eq!(topo.pu(3).unwrap().os_index, 3);
        assert!(topo.pu(99).is_none());
    }
}
