//! Common types used throughout the branch prediction unit.
//!
//! This module provides the fundamental building blocks shared by the orchestrator and
//! its collaborators. It includes:
//! 1. **Identifiers:** Instruction addresses, per-thread sequence numbers, and thread ids.
//! 2. **PC State:** The program-counter value threaded through prediction.
//! 3. **Error Handling:** Fatal consistency violations and configuration errors.

/// Error types and the fatal-violation helper.
pub mod error;

/// Program-counter state.
pub mod pc;

pub use error::{BpuError, ConfigError, fatal};
pub use pc::PcState;

/// An instruction address.
pub type Addr = u64;

/// Per-thread instruction sequence number; strictly increasing in program order.
pub type InstSeqNum = u64;

/// Hardware thread identifier, used to index per-thread state.
pub type ThreadId = usize;

/// Borrows `tid`'s slot of per-thread state, raising [`BpuError::UnknownThread`] when
/// `tid` is past the end.
pub(crate) fn thread_slot<T>(slots: &[T], tid: ThreadId) -> &T {
    slots.get(tid).unwrap_or_else(|| {
        fatal(BpuError::UnknownThread {
            tid,
            num_threads: slots.len(),
        })
    })
}
