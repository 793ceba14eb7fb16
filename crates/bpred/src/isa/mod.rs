//! Control-instruction interface.
//!
//! Decoding is outside the prediction unit; it only consumes the classification
//! predicates of a fetched control instruction plus the ability to advance a PC past it.

/// Control-instruction trait, branch kinds, and a static implementation.
pub mod control;

pub use control::{BranchKind, ControlInst, InstHandle, StaticControlInst};
