//! Scenario resolver properties on synthetic topologies.

use proptest::prelude::*;

use syslat::{ProcessorUnit, Scenario, Topology};

/// Linux-style enumeration: all first hardware threads of every core, then
/// the second threads, and so on.
fn synthetic(packages: usize, cores_per_package: usize, threads_per_core: usize) -> Topology {
    let mut pus = Vec::new();
    let mut os_index = 0;
    for _thread in 0..threads_per_core {
        for package_id in 0..packages {
            for core_id in 0..cores_per_package {
                pus.push(ProcessorUnit {
                    os_index,
                    core_id,
                    package_id,
                });
                os_index += 1;
            }
        }
    }
    Topology::from_processors(pus)
}

#[test]
fn resolver_relations_hold_on_two_socket_smt_box() {
    let topo = synthetic(2, 2, 2);
    for pu in topo.pus() {
        let remote_pkg = topo.co_runner(pu, Scenario::RemotePackage).unwrap();
        assert_ne!(remote_pkg.package_id, pu.package_id);

        let remote_core = topo.co_runner(pu, Scenario::RemoteCore).unwrap();
        assert_eq!(remote_core.package_id, pu.package_id);
        assert_ne!(remote_core.core_id, pu.core_id);

        let local_core = topo.co_runner(pu, Scenario::LocalCore).unwrap();
        assert_eq!(local_core.package_id, pu.package_id);
        assert_eq!(local_core.core_id, pu.core_id);
        assert_ne!(local_core.os_index, pu.os_index);

        assert!(topo.co_runner(pu, Scenario::NoInterference).is_none());
    }
}

#[test]
fn resolver_reports_unreachable_scenarios_as_none() {
    // One socket, SMT off: nothing local, nothing remote-package.
    let topo = synthetic(1, 4, 1);
    let measuring = *topo.pu(0).unwrap();
    assert!(topo.co_runner(&measuring, Scenario::RemotePackage).is_none());
    assert!(topo.co_runner(&measuring, Scenario::LocalCore).is_none());
    assert!(topo.co_runner(&measuring, Scenario::RemoteCore).is_some());

    // A true single-PU machine can satisfy nothing at all.
    let tiny = synthetic(1, 1, 1);
    let only = *tiny.pu(0).unwrap();
    for scenario in Scenario::ALL {
        assert!(tiny.co_runner(&only, scenario).is_none());
    }
}

proptest! {
    /// Whatever the shape, a resolved PU satisfies its scenario relation and
    /// is never the measuring PU itself.
    #[test]
    fn resolved_pu_satisfies_scenario_relation(
        packages in 1usize..4,
        cores in 1usize..4,
        threads in 1usize..3,
        measuring_seed in 0usize..36,
    ) {
        let topo = synthetic(packages, cores, threads);
        let measuring = topo.pus()[measuring_seed % topo.pus().len()];
        for scenario in [Scenario::LocalCore, Scenario::RemoteCore, Scenario::RemotePackage] {
            if let Some(other) = topo.co_runner(&measuring, scenario) {
                prop_assert_ne!(other.os_index, measuring.os_index);
                match scenario {
                    Scenario::LocalCore => {
                        prop_assert!(other.same_core(&measuring));
                    }
                    Scenario::RemoteCore => {
                        prop_assert!(other.same_package(&measuring));
                        prop_assert!(!other.same_core(&measuring));
                    }
                    Scenario::RemotePackage => {
                        prop_assert!(!other.same_package(&measuring));
                    }
                    Scenario::NoInterference => unreachable!(),
                }
            } else {
                // No resolution must mean no candidate exists at all.
                let exists = topo.pus().iter().any(|pu| {
                    pu.os_index != measuring.os_index
                        && match scenario {
                            Scenario::LocalCore => pu.same_core(&measuring),
                            Scenario::RemoteCore => {
                                pu.same_package(&measuring) && !pu.same_core(&measuring)
                            }
                            Scenario::RemotePackage => !pu.same_package(&measuring),
                            Scenario::NoInterference => false,
                        }
                });
                prop_assert!(!exists);
            }
        }
    }
}
