//! syslat: OS-primitive latency and energy micro-benchmarks
//!
//! Measures the latency and energy cost of operating-system primitives
//! (system calls, synchronization primitives, memory management, thread
//! wakeup) while a noisy co-runner thread is placed at a chosen distance on
//! the CPU topology: nowhere, on the same SMT core, on another core of the
//! same package, or on another package.
//!
//! The crate is organized into functional modules:
//! - **clock**: monotonic nanosecond timestamps
//! - **topology**: PU/core/package snapshot, scenario resolution, binding
//! - **scenario**: interference scenarios and command-line selection masks
//! - **action**: the payload contract plus symmetric adapters
//! - **signals**: process-wide signal flags and alarm control
//! - **latency** / **energy**: the two measurement loops
//! - **output**: CSV writers
//! - **cli** / **driver**: shared flag surface and benchmark entry point
//! - **payloads**: the built-in benchmarks behind the `bench-*` binaries

pub mod action;
pub mod cli;
pub mod clock;
pub mod driver;
pub mod energy;
pub mod error;
pub mod latency;
pub mod output;
pub mod payloads;
pub mod scenario;
pub mod signals;
pub mod topology;

mod runner;

pub use action::{Action, InterferingThreads, RawThread, Symmetric, SymmetricWithState};
pub use error::{BenchError, Result};
pub use scenario::{Scenario, ScenarioMask};
pub use topology::{ProcessorUnit, Topology};
