//! Return Address Stack (RAS).
//!
//! The RAS is a specialized predictor for function return addresses. It operates
//! as a per-thread circular stack that pushes addresses on calls and pops them on
//! returns. Every speculative push or pop is recorded in a [`RasHistory`] so that
//! squashing the owning prediction restores the stack exactly.

use std::fmt;

use crate::common::{Addr, PcState, ThreadId, thread_slot};
use crate::isa::BranchKind;

/// Trait for speculative return address stacks.
///
/// History tokens are created only when the stack is actually mutated, so the
/// presence of a token on a prediction means "this prediction changed the stack".
pub trait ReturnAddrStack {
    /// Record of the mutation performed for one prediction.
    type History: fmt::Debug;

    /// Pops the predicted return address.
    ///
    /// On an empty stack nothing is mutated, `history` is left untouched, and `None`
    /// is returned.
    fn pop(&mut self, tid: ThreadId, history: &mut Option<Self::History>) -> Option<PcState>;

    /// Pushes `return_addr`, creating or extending `history`.
    fn push(&mut self, tid: ThreadId, return_addr: &PcState, history: &mut Option<Self::History>);

    /// Undoes the mutation recorded in `history`.
    fn squash(&mut self, tid: ThreadId, history: Self::History);

    /// Retires a prediction's stack effect.
    ///
    /// # Arguments
    ///
    /// * `tid` - Owning thread.
    /// * `mispredicted` - Whether the prediction was corrected before commit.
    /// * `kind` - Classification of the retiring branch.
    /// * `history` - The prediction's stack record, if it mutated the stack.
    fn commit(&mut self, tid: ThreadId, mispredicted: bool, kind: BranchKind, history: Option<Self::History>);
}

/// Snapshot taken before the first stack operation of a prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasHistory {
    /// Top-of-stack index before the operation.
    tos: usize,
    /// Valid entry count before the operation.
    used: usize,
    /// Slot written by a push and the value it held beforehand.
    pushed: Option<(usize, Addr)>,
    /// Whether a pop was performed.
    popped: bool,
}

impl RasHistory {
    const fn snapshot(stack: &ThreadStack) -> Self {
        Self {
            tos: stack.tos,
            used: stack.used,
            pushed: None,
            popped: false,
        }
    }

    /// Returns true if this record includes a push.
    pub const fn pushed(&self) -> bool {
        self.pushed.is_some()
    }

    /// Returns true if this record includes a pop.
    pub const fn popped(&self) -> bool {
        self.popped
    }
}

/// Per-thread stack storage.
#[derive(Clone, Debug)]
struct ThreadStack {
    /// Circular storage.
    entries: Vec<Addr>,
    /// Index of the current top entry.
    tos: usize,
    /// Number of valid entries, saturating at capacity.
    used: usize,
}

impl ThreadStack {
    fn new(capacity: usize) -> Self {
        Self {
            entries: vec![0; capacity],
            tos: 0,
            used: 0,
        }
    }

    const fn capacity(&self) -> usize {
        self.entries.len()
    }
}

/// Return-stack accounting collected at commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasCommitStats {
    /// Returns retired.
    pub returns: u64,
    /// Returns retired after a correction.
    pub returns_incorrect: u64,
}

/// Return Address Stack structure.
#[derive(Clone, Debug)]
pub struct Ras {
    /// One stack per hardware thread.
    stacks: Vec<ThreadStack>,
    /// Commit-time accounting.
    stats: RasCommitStats,
}

impl Ras {
    /// Creates a Return Address Stack per thread with the specified capacity.
    ///
    /// When the stack is full, a push overwrites the oldest entry.
    pub fn new(num_threads: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            stacks: (0..num_threads).map(|_| ThreadStack::new(capacity)).collect(),
            stats: RasCommitStats::default(),
        }
    }

    /// Peeks at the top of `tid`'s stack without modifying it.
    pub fn top(&self, tid: ThreadId) -> Option<Addr> {
        let s = thread_slot(&self.stacks, tid);
        (s.used > 0).then(|| s.entries[s.tos])
    }

    /// Number of valid entries on `tid`'s stack.
    pub fn depth(&self, tid: ThreadId) -> usize {
        thread_slot(&self.stacks, tid).used
    }

    /// Commit-time accounting.
    pub const fn commit_stats(&self) -> RasCommitStats {
        self.stats
    }
}

impl ReturnAddrStack for Ras {
    type History = RasHistory;

    fn pop(&mut self, tid: ThreadId, history: &mut Option<RasHistory>) -> Option<PcState> {
        let s = &mut self.stacks[tid];
        if s.used == 0 {
            return None;
        }
        let h = history.get_or_insert_with(|| RasHistory::snapshot(s));
        h.popped = true;

        let addr = s.entries[s.tos];
        s.tos = (s.tos + s.capacity() - 1) % s.capacity();
        s.used -= 1;
        Some(PcState::new(addr))
    }

    fn push(&mut self, tid: ThreadId, return_addr: &PcState, history: &mut Option<RasHistory>) {
        let s = &mut self.stacks[tid];
        let h = history.get_or_insert_with(|| RasHistory::snapshot(s));

        s.tos = (s.tos + 1) % s.capacity();
        debug_assert!(h.pushed.is_none(), "one push per prediction");
        h.pushed = Some((s.tos, s.entries[s.tos]));
        s.entries[s.tos] = return_addr.inst_addr();
        s.used = (s.used + 1).min(s.capacity());
    }

    fn squash(&mut self, tid: ThreadId, history: RasHistory) {
        let s = &mut self.stacks[tid];
        if let Some((slot, old)) = history.pushed {
            s.entries[slot] = old;
        }
        s.tos = history.tos;
        s.used = history.used;
    }

    fn commit(&mut self, _tid: ThreadId, mispredicted: bool, kind: BranchKind, _history: Option<RasHistory>) {
        if kind == BranchKind::Return {
            self.stats.returns += 1;
            if mispredicted {
                self.stats.returns_incorrect += 1;
            }
        }
    }
}
