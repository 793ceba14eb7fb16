//! GShare Branch Predictor.
//!
//! GShare correlates global branch history with the program counter using an XOR
//! hash. This allows the predictor to distinguish the same branch instruction
//! in different execution contexts.
//!
//! The global history register is updated speculatively at lookup with the predicted
//! direction. Each lookup hands out a [`GlobalHistory`] holding the register value it
//! hashed with, which is enough both to roll the register back on squash and to train
//! the exact counter that made the prediction at commit.
//!
//! # Performance
//!
//! - **Time Complexity:** O(1) for lookup, repair, squash, and update
//! - **Space Complexity:** O(2^N) 2-bit counters for N history bits

use super::DirectionPredictor;
use crate::common::{Addr, ThreadId, thread_slot};
use crate::isa::ControlInst;

/// Speculative state captured for one gshare prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlobalHistory {
    /// Global history register value before this prediction was shifted in.
    ghr: u64,
    /// Direction shifted into the history for this prediction.
    taken: bool,
    /// Unconditional branches do not train the pattern table.
    uncond: bool,
}

impl GlobalHistory {
    /// Direction currently recorded for this prediction.
    pub const fn taken(&self) -> bool {
        self.taken
    }

    /// History register value the prediction was made with.
    pub const fn ghr(&self) -> u64 {
        self.ghr
    }
}

/// GShare Predictor structure.
#[derive(Clone, Debug)]
pub struct GSharePredictor {
    /// Global History Register per thread.
    ghr: Vec<u64>,
    /// Pattern History Table containing 2-bit saturating counters.
    pht: Vec<u8>,
    /// Mask applied to both the history and the PC part of the index.
    mask: u64,
    /// Low PC bits dropped before hashing.
    inst_shift_amt: u32,
}

impl GSharePredictor {
    /// Creates a new GShare Predictor.
    ///
    /// # Arguments
    ///
    /// * `num_threads` - Number of per-thread history registers.
    /// * `history_bits` - History length; the table holds `2^history_bits` counters.
    /// * `inst_shift_amt` - Number of low PC bits ignored when hashing.
    pub fn new(num_threads: usize, history_bits: u32, inst_shift_amt: u32) -> Self {
        let size = 1usize << history_bits;
        Self {
            ghr: vec![0; num_threads],
            pht: vec![1; size],
            mask: (size as u64) - 1,
            inst_shift_amt,
        }
    }

    /// Calculates the index into the Pattern History Table.
    ///
    /// Computes the XOR of the PC (shifted) and the given history value.
    const fn index(&self, pc: Addr, ghr: u64) -> usize {
        let pc_part = (pc >> self.inst_shift_amt) & self.mask;
        ((pc_part ^ ghr) & self.mask) as usize
    }

    const fn shift_in(&self, ghr: u64, taken: bool) -> u64 {
        ((ghr << 1) | taken as u64) & self.mask
    }

    /// Current speculative history register of `tid`.
    pub fn ghr(&self, tid: ThreadId) -> u64 {
        *thread_slot(&self.ghr, tid)
    }

    /// Counter value that would be consulted for `pc` with history `ghr`.
    pub fn counter(&self, pc: Addr, ghr: u64) -> u8 {
        self.pht[self.index(pc, ghr)]
    }
}

impl DirectionPredictor for GSharePredictor {
    type History = GlobalHistory;

    /// Predicts taken if the 2-bit counter at the hashed index is 2 or 3.
    fn lookup(&mut self, tid: ThreadId, pc: Addr) -> (bool, GlobalHistory) {
        let ghr = self.ghr[tid];
        let taken = self.pht[self.index(pc, ghr)] >= 2;
        self.ghr[tid] = self.shift_in(ghr, taken);
        (
            taken,
            GlobalHistory {
                ghr,
                taken,
                uncond: false,
            },
        )
    }

    fn uncond_branch(&mut self, tid: ThreadId, _pc: Addr) -> GlobalHistory {
        let ghr = self.ghr[tid];
        self.ghr[tid] = self.shift_in(ghr, true);
        GlobalHistory {
            ghr,
            taken: true,
            uncond: true,
        }
    }

    /// Rewrites the speculatively shifted-in bit as not-taken.
    fn btb_update(&mut self, tid: ThreadId, _pc: Addr, history: &mut GlobalHistory) {
        history.taken = false;
        self.ghr[tid] = self.shift_in(history.ghr, false);
    }

    /// Updates the 2-bit saturating counter that made the prediction.
    fn update(
        &mut self,
        _tid: ThreadId,
        pc: Addr,
        taken: bool,
        history: GlobalHistory,
        _inst: &dyn ControlInst,
        _target: Addr,
    ) {
        if history.uncond {
            return;
        }
        let idx = self.index(pc, history.ghr);
        let counter = self.pht[idx];
        if taken && counter < 3 {
            self.pht[idx] += 1;
        } else if !taken && counter > 0 {
            self.pht[idx] -= 1;
        }
    }

    /// Rebuilds the history register as if the corrected direction had been predicted.
    fn repair(
        &mut self,
        tid: ThreadId,
        _pc: Addr,
        taken: bool,
        history: &mut GlobalHistory,
        _inst: &dyn ControlInst,
        _target: Addr,
    ) {
        history.taken = taken;
        self.ghr[tid] = self.shift_in(history.ghr, taken);
    }

    fn squash(&mut self, tid: ThreadId, history: GlobalHistory) {
        self.ghr[tid] = history.ghr;
    }
}
