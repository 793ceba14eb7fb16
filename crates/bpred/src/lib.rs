//! Speculative branch prediction unit for cycle-level processor simulators.
//!
//! This crate implements the branch prediction front end of an out-of-order core with the following:
//! 1. **Core:** The prediction orchestrator, its per-thread history log, commit and recovery.
//! 2. **Units:** Direction predictors, branch target buffer, return address stack, and indirect target predictor.
//! 3. **ISA:** The control-instruction handle consumed by the unit and its branch classification.
//! 4. **Simulation:** Configuration, statistics, and a trace-replay driver.

/// Common types (addresses, sequence numbers, PC state, errors).
pub mod common;
/// Prediction unit configuration (defaults, enums, structures).
pub mod config;
/// Prediction orchestrator, history log, commit and recovery.
pub mod core;
/// Control-instruction handle and branch classification.
pub mod isa;
/// Trace-driven replay of branch streams through the unit.
pub mod sim;
/// Branch prediction statistics collection and reporting.
pub mod stats;
/// Prediction structures consulted by the orchestrator.
pub mod units;

/// Root configuration type; use `BpuConfig::default()` or deserialize from JSON.
pub use crate::config::BpuConfig;
/// The prediction orchestrator; see [`core::BranchPredUnit`].
pub use crate::core::{BranchPredUnit, DefaultBranchPredUnit};
