//! Recovery: discard younger speculation and correct a mispredicted entry.
//!
//! Recovery runs in two phases. [`squash`](BranchPredUnit::squash) pops every entry
//! younger than the squash point and hands its tokens back for rollback.
//! [`squash_and_correct`](BranchPredUnit::squash_and_correct) then rewrites the entry at
//! the squash point in place with the resolved outcome and reconciles each structure
//! with it. The corrected entry stays in the log and is later retired by `commit`.

use tracing::debug;

use super::{BranchPredUnit, squash_ras, thread_log};
use crate::common::{BpuError, InstSeqNum, PcState, ThreadId, fatal};
use crate::units::bru::{BranchTargetBuffer, DirectionPredictor, IndirectPredictor, ReturnAddrStack};

impl<D, B, R, I> BranchPredUnit<D, B, R, I>
where
    D: DirectionPredictor,
    B: BranchTargetBuffer,
    R: ReturnAddrStack,
    I: IndirectPredictor,
{
    /// Discards every prediction of `tid` younger than `squashed_sn`.
    ///
    /// Each removed entry returns its RAS token (if any), its direction token, and
    /// its indirect token (if an indirect predictor is configured) for rollback.
    /// Entries at or older than `squashed_sn` are untouched.
    ///
    /// # Panics
    ///
    /// On an unknown thread, or an entry holding RAS state with no RAS configured.
    pub fn squash(&mut self, squashed_sn: InstSeqNum, tid: ThreadId) {
        let log = thread_log(&mut self.pred_hist, tid);

        while let Some(entry) = log.pop_front_after(squashed_sn) {
            if let Some(h) = entry.ras_history {
                debug!(tid, squash_sn = squashed_sn, sn = entry.seq_num, pc = entry.pc, "incorrect call/return, fix RAS");
                squash_ras(self.ras.as_mut(), tid, entry.seq_num, h);
            }

            self.dir.squash(tid, entry.dir_history);

            if let Some(ipred) = self.ipred.as_mut() {
                ipred.squash(tid, entry.seq_num, entry.indirect_history);
            }

            self.stats.squashed += 1;
            debug!(
                tid,
                squash_sn = squashed_sn,
                sn = entry.seq_num,
                pc = entry.pc,
                outstanding = log.len(),
                "removed history"
            );
        }
    }

    /// Recovers from a misprediction of the branch `squashed_sn`.
    ///
    /// Younger predictions are squashed first. The entry at `squashed_sn` must then be
    /// the youngest outstanding one; it is overwritten with the corrected outcome,
    /// flagged as mispredicted, and every structure is repaired to match:
    ///
    /// 1. The direction predictor repairs speculative context without training.
    /// 2. The indirect predictor (if any) is told the corrected outcome.
    /// 3. The RAS is popped or pushed if the corrected taken outcome needs a stack
    ///    operation the prediction skipped, or rolled back if the corrected not-taken
    ///    outcome makes one it performed wrong.
    /// 4. A corrected taken outcome updates the BTB, unless the target came from the
    ///    indirect predictor.
    ///
    /// If the log is empty after squashing (recovery triggered by a non-branch event),
    /// nothing is corrected.
    ///
    /// # Arguments
    ///
    /// * `squashed_sn` - Sequence number of the mispredicted branch.
    /// * `corr_target` - Resolved next PC.
    /// * `actually_taken` - Resolved direction.
    /// * `tid` - Owning thread.
    ///
    /// # Panics
    ///
    /// Raises [`BpuError::SquashMismatch`] if the log is non-empty and its youngest
    /// entry is not `squashed_sn`.
    pub fn squash_and_correct(
        &mut self,
        squashed_sn: InstSeqNum,
        corr_target: &PcState,
        actually_taken: bool,
        tid: ThreadId,
    ) {
        self.stats.cond_incorrect += 1;
        debug!(tid, squash_sn = squashed_sn, target = %corr_target, "squashing from sequence number");

        self.squash(squashed_sn, tid);

        let log = thread_log(&mut self.pred_hist, tid);
        let Some(entry) = log.front_mut() else {
            debug!(tid, sn = squashed_sn, "history empty, nothing to correct");
            return;
        };

        if entry.seq_num != squashed_sn {
            fatal(BpuError::SquashMismatch {
                tid,
                front: entry.seq_num,
                squashed: squashed_sn,
            });
        }

        if entry.ras_history.is_some() {
            self.stats.ras_incorrect += 1;
            debug!(tid, squash_sn = squashed_sn, "incorrect RAS");
        }

        entry.pred_taken = actually_taken;
        entry.target = corr_target.inst_addr();
        entry.mispredict = true;

        self.dir.repair(
            tid,
            entry.pc,
            actually_taken,
            &mut entry.dir_history,
            entry.inst.as_ref(),
            entry.target,
        );

        let kind = entry.inst.branch_kind();

        if let Some(ipred) = self.ipred.as_mut() {
            ipred.update(
                tid,
                squashed_sn,
                entry.pc,
                true,
                actually_taken,
                corr_target,
                kind,
                &mut entry.indirect_history,
            );
        }

        match self.ras.as_mut() {
            Some(ras) if actually_taken && entry.ras_history.is_none() => {
                if entry.inst.is_return() {
                    debug!(tid, squash_sn = squashed_sn, pc = entry.pc, "incorrectly predicted return");
                    let _ = ras.pop(tid, &mut entry.ras_history);
                }
                if entry.inst.is_call() {
                    let return_addr = entry.inst.build_return_address(corr_target, corr_target);
                    debug!(
                        tid,
                        squash_sn = squashed_sn,
                        pc = entry.pc,
                        ret = %return_addr,
                        "incorrectly predicted call, push return address"
                    );
                    ras.push(tid, &return_addr, &mut entry.ras_history);
                }
            }
            Some(ras) if !actually_taken => {
                if let Some(h) = entry.ras_history.take() {
                    ras.squash(tid, h);
                }
            }
            Some(_) => {}
            None if entry.ras_history.is_some() => fatal(BpuError::MissingReturnStack {
                tid,
                seq_num: squashed_sn,
            }),
            None => {}
        }

        if actually_taken {
            if entry.was_indirect {
                self.stats.indirect_mispredicted += 1;
            } else {
                debug!(tid, squash_sn = squashed_sn, pc = entry.pc, "BTB update");
                self.stats.btb_updates += 1;
                self.btb.update(tid, entry.pc, corr_target, kind);
            }
        }
    }
}
