//! Error definitions for the branch prediction unit.
//!
//! The unit performs no I/O, so it has no recoverable runtime failures. It provides:
//! 1. **Consistency Violations:** Sequencing defects in the calling pipeline, raised through [`fatal`].
//! 2. **Configuration Errors:** Invalid sizing parameters, returned as ordinary `Result`s.

use thiserror::Error;

use super::{InstSeqNum, ThreadId};

/// A violation of the orchestrator's sequencing invariants.
///
/// Every variant indicates a defect in the caller's ordering of `predict`, `commit`,
/// and `squash` calls. None of them is a condition the simulator can continue from.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BpuError {
    /// Recovery was requested for a sequence number that is not the youngest
    /// outstanding prediction once younger history has been discarded.
    #[error("[tid:{tid}] squash sn:{squashed} does not match front of history sn:{front}")]
    SquashMismatch {
        /// Thread whose history was being corrected.
        tid: ThreadId,
        /// Sequence number at the front of the history after squashing.
        front: InstSeqNum,
        /// Sequence number recovery was requested for.
        squashed: InstSeqNum,
    },

    /// A drain boundary was reached with predictions still outstanding.
    #[error("[tid:{tid}] {outstanding} prediction(s) outstanding at drain")]
    OutstandingHistory {
        /// Thread with a non-empty history.
        tid: ThreadId,
        /// Number of entries still in the history.
        outstanding: usize,
    },

    /// A history entry carries return-stack state but no return stack is configured.
    #[error("[tid:{tid}] sn:{seq_num} holds return stack history without a return stack")]
    MissingReturnStack {
        /// Owning thread of the entry.
        tid: ThreadId,
        /// Sequence number of the entry.
        seq_num: InstSeqNum,
    },

    /// A prediction was issued that is not younger than the youngest outstanding one.
    #[error("[tid:{tid}] prediction sn:{seq_num} is not younger than front of history sn:{front}")]
    OutOfOrderPrediction {
        /// Thread the prediction was issued for.
        tid: ThreadId,
        /// Sequence number of the new prediction.
        seq_num: InstSeqNum,
        /// Sequence number currently at the front of the history.
        front: InstSeqNum,
    },

    /// An operation named a thread the unit was not built for.
    #[error("thread {tid} out of range, unit has {num_threads} thread(s)")]
    UnknownThread {
        /// Requested thread id.
        tid: ThreadId,
        /// Number of threads the unit tracks.
        num_threads: usize,
    },
}

/// Aborts the simulation on a consistency violation.
///
/// The error is logged through `tracing` before panicking with its message, so the
/// violation is visible in simulator logs even when the panic is caught by a harness.
///
/// # Panics
///
/// Always.
#[cold]
#[track_caller]
pub fn fatal(err: BpuError) -> ! {
    tracing::error!(%err, "branch predictor consistency violation");
    panic!("{err}");
}

/// Invalid prediction-unit configuration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The unit must track at least one hardware thread.
    #[error("num_threads must be at least 1")]
    NoThreads,

    /// A table size is not a power of two.
    #[error("{name} must be a non-zero power of two, got {value}")]
    NotPowerOfTwo {
        /// Configuration field that was rejected.
        name: &'static str,
        /// Value supplied.
        value: usize,
    },

    /// A field is outside its supported range.
    #[error("{name} must be in {min}..={max}, got {value}")]
    OutOfRange {
        /// Configuration field that was rejected.
        name: &'static str,
        /// Value supplied.
        value: usize,
        /// Smallest accepted value.
        min: usize,
        /// Largest accepted value.
        max: usize,
    },
}
