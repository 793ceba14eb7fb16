//! Branch prediction unit (BRU) structures.
//!
//! This module contains the collaborator contracts consulted by the prediction
//! orchestrator together with their concrete implementations: static and gshare
//! direction predictors, the branch target buffer (BTB), the return address stack
//! (RAS), and a path-hashed indirect target predictor.

pub use self::branch_predictor::DirectionPredictor;
pub use self::btb::{BranchTargetBuffer, Btb};
pub use self::indirect::{IndirectPredictor, SimpleIndirectPredictor};
pub use self::ras::{Ras, ReturnAddrStack};

/// Direction predictor trait.
pub mod branch_predictor;

/// Branch Target Buffer for storing predicted branch targets.
pub mod btb;

/// Global history branch predictor (gshare algorithm).
pub mod gshare;

/// Indirect target predictor.
pub mod indirect;

/// Return Address Stack for predicting return addresses.
pub mod ras;

/// Static branch predictor (always not-taken).
pub mod static_bp;

use self::{
    gshare::{GSharePredictor, GlobalHistory},
    static_bp::{StaticHistory, StaticPredictor},
};
use crate::common::{Addr, ThreadId};
use crate::config::{BpuConfig, DirectionKind};
use crate::isa::ControlInst;

/// Enum wrapper for static dispatch of direction predictors.
/// This avoids vtable lookups in the critical fetch loop.
#[derive(Clone, Debug)]
pub enum DirectionPredictorWrapper {
    /// Always not-taken.
    Static(StaticPredictor),
    /// Global-history XOR-indexed counters.
    GShare(GSharePredictor),
}

/// History token of [`DirectionPredictorWrapper`].
///
/// A token is only ever returned to the predictor variant that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectionHistory {
    /// Produced by the static predictor.
    Static(StaticHistory),
    /// Produced by the gshare predictor.
    GShare(GlobalHistory),
}

impl DirectionPredictorWrapper {
    /// Creates the direction predictor selected by configuration.
    pub fn new(config: &BpuConfig) -> Self {
        match config.direction {
            DirectionKind::Static => Self::Static(StaticPredictor::new()),
            DirectionKind::GShare => Self::GShare(GSharePredictor::new(
                config.num_threads,
                config.gshare_history_bits,
                config.inst_shift_amt,
            )),
        }
    }
}

impl DirectionPredictor for DirectionPredictorWrapper {
    type History = DirectionHistory;

    #[inline(always)]
    fn lookup(&mut self, tid: ThreadId, pc: Addr) -> (bool, DirectionHistory) {
        match self {
            Self::Static(bp) => {
                let (taken, h) = bp.lookup(tid, pc);
                (taken, DirectionHistory::Static(h))
            }
            Self::GShare(bp) => {
                let (taken, h) = bp.lookup(tid, pc);
                (taken, DirectionHistory::GShare(h))
            }
        }
    }

    #[inline(always)]
    fn uncond_branch(&mut self, tid: ThreadId, pc: Addr) -> DirectionHistory {
        match self {
            Self::Static(bp) => DirectionHistory::Static(bp.uncond_branch(tid, pc)),
            Self::GShare(bp) => DirectionHistory::GShare(bp.uncond_branch(tid, pc)),
        }
    }

    #[inline(always)]
    fn btb_update(&mut self, tid: ThreadId, pc: Addr, history: &mut DirectionHistory) {
        match (self, history) {
            (Self::Static(bp), DirectionHistory::Static(h)) => bp.btb_update(tid, pc, h),
            (Self::GShare(bp), DirectionHistory::GShare(h)) => bp.btb_update(tid, pc, h),
            _ => unreachable!("history token from a different predictor"),
        }
    }

    #[inline(always)]
    fn update(
        &mut self,
        tid: ThreadId,
        pc: Addr,
        taken: bool,
        history: DirectionHistory,
        inst: &dyn ControlInst,
        target: Addr,
    ) {
        match (self, history) {
            (Self::Static(bp), DirectionHistory::Static(h)) => bp.update(tid, pc, taken, h, inst, target),
            (Self::GShare(bp), DirectionHistory::GShare(h)) => bp.update(tid, pc, taken, h, inst, target),
            _ => unreachable!("history token from a different predictor"),
        }
    }

    #[inline(always)]
    fn repair(
        &mut self,
        tid: ThreadId,
        pc: Addr,
        taken: bool,
        history: &mut DirectionHistory,
        inst: &dyn ControlInst,
        target: Addr,
    ) {
        match (self, history) {
            (Self::Static(bp), DirectionHistory::Static(h)) => bp.repair(tid, pc, taken, h, inst, target),
            (Self::GShare(bp), DirectionHistory::GShare(h)) => bp.repair(tid, pc, taken, h, inst, target),
            _ => unreachable!("history token from a different predictor"),
        }
    }

    #[inline(always)]
    fn squash(&mut self, tid: ThreadId, history: DirectionHistory) {
        match (self, history) {
            (Self::Static(bp), DirectionHistory::Static(h)) => bp.squash(tid, h),
            (Self::GShare(bp), DirectionHistory::GShare(h)) => bp.squash(tid, h),
            _ => unreachable!("history token from a different predictor"),
        }
    }
}
