//! Direction Predictor Interface.
//!
//! This module defines the `DirectionPredictor` trait that every taken/not-taken
//! predictor implements. A lookup hands back an opaque history token owned by the
//! prediction's history entry until it is returned through `update` (at commit) or
//! `squash` (on a discarded prediction).

use std::fmt;

use crate::common::{Addr, ThreadId};
use crate::isa::ControlInst;

/// Trait for branch direction prediction algorithms.
///
/// Implementations keep speculative context (e.g. global history) that advances on
/// every lookup and is rolled back through the returned history token. Only
/// [`update`](DirectionPredictor::update) may train permanent tables.
pub trait DirectionPredictor {
    /// Per-prediction state needed to train or roll back the predictor.
    type History: fmt::Debug;

    /// Predicts the direction of the conditional branch at `pc`.
    ///
    /// # Returns
    ///
    /// A tuple `(taken, history)`; the history must later be passed to exactly one
    /// of `update` or `squash`.
    fn lookup(&mut self, tid: ThreadId, pc: Addr) -> (bool, Self::History);

    /// Records an unconditional control transfer at `pc`.
    ///
    /// No direction is predicted; the predictor only advances its speculative context.
    fn uncond_branch(&mut self, tid: ThreadId, pc: Addr) -> Self::History;

    /// Informs the predictor that a taken prediction was overridden to not-taken
    /// because no target was available.
    fn btb_update(&mut self, tid: ThreadId, pc: Addr, history: &mut Self::History);

    /// Trains the predictor with the final outcome of a retiring branch.
    ///
    /// # Arguments
    ///
    /// * `tid` - Owning thread.
    /// * `pc` - Address of the branch.
    /// * `taken` - Final (possibly corrected) direction.
    /// * `history` - The token produced at prediction time; consumed.
    /// * `inst` - The retiring instruction.
    /// * `target` - Final (possibly corrected) next PC.
    fn update(
        &mut self,
        tid: ThreadId,
        pc: Addr,
        taken: bool,
        history: Self::History,
        inst: &dyn ControlInst,
        target: Addr,
    );

    /// Repairs speculative context after a misprediction of the branch at `pc`.
    ///
    /// Called with the corrected outcome once all younger predictions have been
    /// squashed. Must not touch the permanent tables; those are trained by the
    /// commit-time `update` with the corrected direction.
    fn repair(
        &mut self,
        tid: ThreadId,
        pc: Addr,
        taken: bool,
        history: &mut Self::History,
        inst: &dyn ControlInst,
        target: Addr,
    );

    /// Discards a prediction, restoring the speculative context it changed.
    fn squash(&mut self, tid: ThreadId, history: Self::History);
}
