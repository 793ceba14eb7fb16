//! Forward path: form a prediction and record its history.
//!
//! Target resolution priority is RAS, then BTB, then indirect predictor. A taken
//! prediction with no resolvable target is flipped to not-taken and falls through; the
//! flip is recorded in the entry so commit and recovery see the realized direction.

use std::sync::Arc;

use tracing::{debug, trace};

use super::{BranchPredUnit, Entry, PredictorHistory, check_thread, squash_ras, thread_log};
use crate::common::{InstSeqNum, PcState, ThreadId};
use crate::isa::InstHandle;
use crate::units::bru::{BranchTargetBuffer, DirectionPredictor, IndirectPredictor, ReturnAddrStack};

impl<D, B, R, I> BranchPredUnit<D, B, R, I>
where
    D: DirectionPredictor,
    B: BranchTargetBuffer,
    R: ReturnAddrStack,
    I: IndirectPredictor,
{
    /// Predicts the control instruction `inst` at `pc`.
    ///
    /// On return `pc` holds the predicted next PC: the resolved target when predicted
    /// taken, otherwise the sequential successor.
    ///
    /// # Arguments
    ///
    /// * `inst` - The fetched control instruction.
    /// * `seq_num` - Its sequence number; must be greater than every outstanding one of `tid`.
    /// * `pc` - PC state of the instruction, updated in place.
    /// * `tid` - Owning thread.
    ///
    /// # Returns
    ///
    /// The final taken/not-taken decision, after any target-miss override.
    ///
    /// # Panics
    ///
    /// On an unknown thread or an out-of-order sequence number.
    pub fn predict(&mut self, inst: &InstHandle, seq_num: InstSeqNum, pc: &mut PcState, tid: ThreadId) -> bool {
        check_thread(self.pred_hist.len(), tid);
        let pc_addr = pc.inst_addr();
        let mut target = *pc;

        self.stats.lookups += 1;

        let (mut pred_taken, dir_history) = if inst.is_uncond_ctrl() {
            debug!(tid, sn = seq_num, "unconditional control");
            (true, self.dir.uncond_branch(tid, pc_addr))
        } else {
            self.stats.cond_predicted += 1;
            let (taken, h) = self.dir.lookup(tid, pc_addr);
            debug!(tid, sn = seq_num, pc = %pc, taken, "direction predicted");
            (taken, h)
        };

        let mut record: Entry<D, R, I> =
            PredictorHistory::new(seq_num, pc_addr, pred_taken, Arc::clone(inst), dir_history, tid);

        if pred_taken {
            // A coroutine-style return may both pop and push.
            if inst.is_return() {
                self.stats.ras_used += 1;
                let popped = self.ras.as_mut().and_then(|ras| ras.pop(tid, &mut record.ras_history));
                match popped {
                    Some(ret) => target = ret,
                    None => inst.advance_pc(&mut target),
                }
                debug!(tid, sn = seq_num, pc = %pc, target = %target, "return predicted from RAS");
            }

            if inst.is_call()
                && let Some(ras) = self.ras.as_mut()
            {
                let return_addr = inst.build_return_address(pc, pc);
                ras.push(tid, &return_addr, &mut record.ras_history);
                debug!(tid, sn = seq_num, pc = %pc, ret = %return_addr, "call pushed return address");
            }

            if !inst.is_return() {
                let kind = inst.branch_kind();
                match self.ipred.as_mut() {
                    Some(ipred) if !inst.is_direct_ctrl() => {
                        self.stats.indirect_lookups += 1;
                        match ipred.lookup(tid, seq_num, pc_addr, &mut record.indirect_history) {
                            Some(itarget) => {
                                self.stats.indirect_hits += 1;
                                record.was_indirect = true;
                                target = itarget;
                                debug!(tid, sn = seq_num, pc = %pc, target = %target, "indirect target predicted");
                            }
                            None => {
                                self.stats.indirect_misses += 1;
                                pred_taken = false;
                                record.pred_taken = false;
                                debug!(tid, sn = seq_num, pc = %pc, "no indirect target");
                                if inst.is_call() && !inst.is_uncond_ctrl() {
                                    undo_call_push(self.ras.as_mut(), &mut record);
                                }
                                inst.advance_pc(&mut target);
                            }
                        }
                    }
                    _ => {
                        self.stats.btb_lookups += 1;
                        if let Some(btb_target) = self.btb.lookup(tid, pc_addr, kind) {
                            self.stats.btb_hits += 1;
                            target = btb_target;
                            debug!(tid, sn = seq_num, pc = %pc, target = %target, "BTB target predicted");
                        } else {
                            debug!(tid, sn = seq_num, pc = %pc, "BTB miss");
                            pred_taken = false;
                            record.pred_taken = false;
                            if !inst.is_call() {
                                self.dir.btb_update(tid, pc_addr, &mut record.dir_history);
                                trace!(tid, sn = seq_num, "btb_update sent to direction predictor");
                            } else if !inst.is_uncond_ctrl() {
                                undo_call_push(self.ras.as_mut(), &mut record);
                            }
                            inst.advance_pc(&mut target);
                        }
                    }
                }
            }
        } else {
            inst.advance_pc(&mut target);
        }

        record.target = target.inst_addr();
        pc.set(&target);

        if let Some(ipred) = self.ipred.as_mut() {
            ipred.update(
                tid,
                seq_num,
                record.pc,
                false,
                record.pred_taken,
                &target,
                inst.branch_kind(),
                &mut record.indirect_history,
            );
        }

        let log = thread_log(&mut self.pred_hist, tid);
        log.push_front(record);
        trace!(tid, sn = seq_num, outstanding = log.len(), "history entry added");

        pred_taken
    }
}

/// Reverts the speculative return-address push of a call whose target missed.
fn undo_call_push<DH, IH, R: ReturnAddrStack>(
    ras: Option<&mut R>,
    record: &mut PredictorHistory<DH, IH, R::History>,
) {
    if let Some(h) = record.ras_history.take() {
        squash_ras(ras, record.tid, record.seq_num, h);
    }
}
