//! Static Branch Predictor.
//!
//! Implements a simple "Always Not Taken" prediction policy for conditional branches.
//! It keeps no speculative context, so its history token is empty and squash, repair,
//! and update are all no-ops.

use super::DirectionPredictor;
use crate::common::{Addr, ThreadId};
use crate::isa::ControlInst;

/// Empty history token of the static predictor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StaticHistory;

/// Static Branch Predictor structure.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticPredictor;

impl StaticPredictor {
    /// Creates a new Static Predictor.
    pub const fn new() -> Self {
        Self
    }
}

impl DirectionPredictor for StaticPredictor {
    type History = StaticHistory;

    /// Always predicts conditional branches as not taken.
    fn lookup(&mut self, _tid: ThreadId, _pc: Addr) -> (bool, StaticHistory) {
        (false, StaticHistory)
    }

    fn uncond_branch(&mut self, _tid: ThreadId, _pc: Addr) -> StaticHistory {
        StaticHistory
    }

    fn btb_update(&mut self, _tid: ThreadId, _pc: Addr, _history: &mut StaticHistory) {}

    fn update(
        &mut self,
        _tid: ThreadId,
        _pc: Addr,
        _taken: bool,
        _history: StaticHistory,
        _inst: &dyn ControlInst,
        _target: Addr,
    ) {
    }

    fn repair(
        &mut self,
        _tid: ThreadId,
        _pc: Addr,
        _taken: bool,
        _history: &mut StaticHistory,
        _inst: &dyn ControlInst,
        _target: Addr,
    ) {
    }

    fn squash(&mut self, _tid: ThreadId, _history: StaticHistory) {}
}
