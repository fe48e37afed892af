//! Interference scenarios
//!
//! A scenario describes where the interfering thread runs relative to the
//! measuring thread on the CPU topology: nowhere, on the same physical core
//! (SMT sibling), on another core of the same package, or on another package
//! (NUMA). Output rows are tagged with the scenario's label.

use std::fmt;

/// Placement of the interfering thread relative to the measuring thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// No interfering thread at all.
    NoInterference,
    /// Interfering thread on a sibling hardware thread of the same core (SMT).
    LocalCore,
    /// Interfering thread on a different core of the same package.
    RemoteCore,
    /// Interfering thread on a different package (NUMA).
    RemotePackage,
}

impl Scenario {
    /// All scenarios, in the order the harness runs them.
    pub const ALL: [Scenario; 4] = [
        Scenario::NoInterference,
        Scenario::LocalCore,
        Scenario::RemoteCore,
        Scenario::RemotePackage,
    ];

    /// The label used to tag CSV rows.
    pub fn label(self) -> &'static str {
        match self {
            Scenario::NoInterference => "No interference",
            Scenario::LocalCore => "SMT interference",
            Scenario::RemoteCore => "Multicore interference",
            Scenario::RemotePackage => "NUMA interference",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Scenario::NoInterference => 1 << 0,
            Scenario::LocalCore => 1 << 1,
            Scenario::RemoteCore => 1 << 2,
            Scenario::RemotePackage => 1 << 3,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of scenarios selected for a run. Selections made on the command line
/// are combined by bitwise union; the default is all four.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScenarioMask(u8);

impl ScenarioMask {
    /// The empty selection.
    pub const EMPTY: ScenarioMask = ScenarioMask(0);

    /// All four scenarios.
    pub fn all() -> ScenarioMask {
        Scenario::ALL
            .iter()
            .fold(ScenarioMask::EMPTY, |mask, &s| mask.with(s))
    }

    /// A mask holding a single scenario.
    pub fn single(scenario: Scenario) -> ScenarioMask {
        ScenarioMask(scenario.bit())
    }

    /// This mask plus `scenario`.
    pub fn with(self, scenario: Scenario) -> ScenarioMask {
        ScenarioMask(self.0 | scenario.bit())
    }

    /// Union of two masks.
    pub fn union(self, other: ScenarioMask) -> ScenarioMask {
        ScenarioMask(self.0 | other.0)
    }

    pub fn contains(self, scenario: Scenario) -> bool {
        self.0 & scenario.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Selected scenarios in harness run order.
    pub fn iter(self) -> impl Iterator<Item = Scenario> {
        Scenario::ALL.into_iter().filter(move |&s| self.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_labels_are_bit_exact() {
        assert_eq!(Scenario::NoInterference.label(), "No interference");
        assert_eq!(Scenario::LocalCore.label(), "SMT interference");
        assert_eq!(Scenario::RemoteCore.label(), "Multicore interference");
        assert_eq!(Scenario::RemotePackage.label(), "NUMA interference");
    }

    #[test]
    fn test_mask_union_and_contains() {
        let mask = ScenarioMask::single(Scenario::LocalCore)
            .union(ScenarioMask::single(Scenario::RemotePackage));
        assert!(mask.contains(Scenario::LocalCore));
        assert!(mask.contains(Scenario::RemotePackage));
        assert!(!mask.contains(Scenario::RemoteCore));
        assert!(!mask.contains(Scenario::NoInterference));
    }

    #[test]
    fn test_mask_all_iterates_in_run_order() {
        let order: Vec<Scenario> = ScenarioMask::all().iter().collect();
        assert_eq!(order, Scenario::ALL.to_vec());
    }

    #[test]
    fn test_empty_mask() {
        assert!(ScenarioMask::EMPTY.is_empty());
        assert_eq!(ScenarioMask::EMPTY.iter().count(), 0);
    }
}
