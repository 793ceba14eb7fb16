//! Indirect Target Predictor.
//!
//! Predicts targets of register-indirect jumps and calls, whose destinations are not
//! encoded in the instruction. `SimpleIndirectPredictor` is a set-associative target
//! table indexed by the branch PC hashed with a per-thread path history of recent
//! taken targets. The path history advances speculatively on every prediction and is
//! restored from the [`IndirectHistory`] token when a prediction is squashed.

use std::fmt;

use crate::common::{Addr, InstSeqNum, PcState, ThreadId, thread_slot};
use crate::config::IndirectConfig;
use crate::isa::BranchKind;

/// Trait for indirect target predictors.
///
/// The orchestrator calls [`update`](IndirectPredictor::update) for every prediction,
/// resolved by this predictor or not, so the predictor can keep its speculative path
/// context in step with the fetch stream. Tokens are created lazily by whichever of
/// `lookup` or `update` runs first.
pub trait IndirectPredictor {
    /// Per-prediction speculative state.
    type History: fmt::Debug;

    /// Predicts the target of the indirect branch at `pc`.
    fn lookup(
        &mut self,
        tid: ThreadId,
        seq_num: InstSeqNum,
        pc: Addr,
        history: &mut Option<Self::History>,
    ) -> Option<PcState>;

    /// Records the realized outcome of a prediction.
    ///
    /// # Arguments
    ///
    /// * `tid` - Owning thread.
    /// * `seq_num` - Sequence number of the prediction.
    /// * `pc` - Address of the branch.
    /// * `corrected` - `false` at prediction time, `true` when called from recovery.
    /// * `taken` - Predicted (or corrected) direction.
    /// * `target` - Predicted (or corrected) next PC.
    /// * `kind` - Classification of the branch.
    /// * `history` - The prediction's token, created here if absent.
    fn update(
        &mut self,
        tid: ThreadId,
        seq_num: InstSeqNum,
        pc: Addr,
        corrected: bool,
        taken: bool,
        target: &PcState,
        kind: BranchKind,
        history: &mut Option<Self::History>,
    );

    /// Discards a prediction, restoring any speculative context it changed.
    fn squash(&mut self, tid: ThreadId, seq_num: InstSeqNum, history: Option<Self::History>);

    /// Retires a prediction.
    fn commit(&mut self, tid: ThreadId, seq_num: InstSeqNum, history: Option<Self::History>);
}

/// Speculative state captured for one prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndirectHistory {
    /// Path history before this prediction advanced it.
    path: u64,
    /// Whether the lookup (if any) found a target.
    hit: bool,
}

impl IndirectHistory {
    /// Returns true if a lookup for this prediction hit.
    pub const fn hit(&self) -> bool {
        self.hit
    }
}

/// An entry in the target table.
#[derive(Clone, Copy, Debug, Default)]
struct IndirectEntry {
    tag: Addr,
    tid: ThreadId,
    target: Addr,
    valid: bool,
}

/// Set-associative path-hashed indirect target predictor.
#[derive(Clone, Debug)]
pub struct SimpleIndirectPredictor {
    /// Path history per thread.
    path: Vec<u64>,
    /// `sets * ways` entries, set-major.
    table: Vec<IndirectEntry>,
    /// Round-robin victim way per set.
    victim: Vec<usize>,
    ways: usize,
    set_mask: u64,
    path_mask: u64,
    inst_shift_amt: u32,
}

impl SimpleIndirectPredictor {
    /// Creates a new indirect predictor.
    ///
    /// # Arguments
    ///
    /// * `num_threads` - Number of per-thread path histories.
    /// * `config` - Table geometry and path length.
    /// * `inst_shift_amt` - Number of low PC bits ignored when hashing.
    pub fn new(num_threads: usize, config: &IndirectConfig, inst_shift_amt: u32) -> Self {
        let sets = config.sets.max(1);
        let ways = config.ways.max(1);
        let path_mask = if config.path_bits >= 64 { u64::MAX } else { (1u64 << config.path_bits) - 1 };
        Self {
            path: vec![0; num_threads],
            table: vec![IndirectEntry::default(); sets * ways],
            victim: vec![0; sets],
            ways,
            set_mask: (sets as u64) - 1,
            path_mask,
            inst_shift_amt,
        }
    }

    const fn set_index(&self, pc: Addr, path: u64) -> usize {
        (((pc >> self.inst_shift_amt) ^ path) & self.set_mask) as usize
    }

    const fn shift_in(&self, path: u64, target: Addr) -> u64 {
        ((path << 2) ^ (target >> self.inst_shift_amt)) & self.path_mask
    }

    fn snapshot(&self, tid: ThreadId) -> IndirectHistory {
        IndirectHistory {
            path: self.path[tid],
            hit: false,
        }
    }

    fn find(&self, set: usize, tid: ThreadId, pc: Addr) -> Option<&IndirectEntry> {
        self.table[set * self.ways..(set + 1) * self.ways]
            .iter()
            .find(|e| e.valid && e.tag == pc && e.tid == tid)
    }

    fn record_target(&mut self, set: usize, tid: ThreadId, pc: Addr, target: Addr) {
        let base = set * self.ways;
        let slot = (base..base + self.ways)
            .find(|&i| {
                let e = self.table[i];
                e.valid && e.tag == pc && e.tid == tid
            })
            .unwrap_or_else(|| {
                let way = self.victim[set];
                self.victim[set] = (way + 1) % self.ways;
                base + way
            });
        self.table[slot] = IndirectEntry {
            tag: pc,
            tid,
            target,
            valid: true,
        };
    }

    /// Current speculative path history of `tid`.
    pub fn path(&self, tid: ThreadId) -> u64 {
        *thread_slot(&self.path, tid)
    }
}

impl IndirectPredictor for SimpleIndirectPredictor {
    type History = IndirectHistory;

    fn lookup(
        &mut self,
        tid: ThreadId,
        _seq_num: InstSeqNum,
        pc: Addr,
        history: &mut Option<IndirectHistory>,
    ) -> Option<PcState> {
        let snapshot = self.snapshot(tid);
        let h = history.get_or_insert(snapshot);
        let set = self.set_index(pc, h.path);
        let target = self.find(set, tid, pc).map(|e| PcState::new(e.target));
        h.hit = target.is_some();
        target
    }

    /// At prediction time, shifts a taken target into the path history. On
    /// correction, rebuilds the path from the snapshot and installs the corrected
    /// target of a taken indirect jump or call.
    fn update(
        &mut self,
        tid: ThreadId,
        _seq_num: InstSeqNum,
        pc: Addr,
        corrected: bool,
        taken: bool,
        target: &PcState,
        kind: BranchKind,
        history: &mut Option<IndirectHistory>,
    ) {
        let snapshot = self.snapshot(tid);
        let h = *history.get_or_insert(snapshot);

        self.path[tid] = if taken { self.shift_in(h.path, target.inst_addr()) } else { h.path };

        if corrected && taken && kind.is_indirect() && kind != BranchKind::Return {
            let set = self.set_index(pc, h.path);
            self.record_target(set, tid, pc, target.inst_addr());
        }
    }

    fn squash(&mut self, tid: ThreadId, _seq_num: InstSeqNum, history: Option<IndirectHistory>) {
        if let Some(h) = history {
            self.path[tid] = h.path;
        }
    }

    fn commit(&mut self, _tid: ThreadId, _seq_num: InstSeqNum, _history: Option<IndirectHistory>) {}
}
