//! Trace-driven simulation.
//!
//! This module replays recorded branch streams through the prediction unit. It provides:
//! 1. **Trace Format:** `TraceRecord` and the loaders for JSON array and JSON Lines traces.
//! 2. **Driver:** `TraceDriver`, which predicts, resolves, corrects, and retires each record.

/// Trace replay driver.
pub mod driver;

/// Trace records and loaders.
pub mod trace;

pub use driver::{ReplaySummary, TraceDriver, replay};
pub use trace::{TraceError, TraceRecord, load_trace, parse_trace};
