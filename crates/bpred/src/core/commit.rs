//! Retirement: train the structures with final outcomes, oldest first.

use tracing::{debug, trace};

use super::{BranchPredUnit, thread_log};
use crate::common::{BpuError, InstSeqNum, ThreadId, fatal};
use crate::units::bru::{BranchTargetBuffer, DirectionPredictor, IndirectPredictor, ReturnAddrStack};

impl<D, B, R, I> BranchPredUnit<D, B, R, I>
where
    D: DirectionPredictor,
    B: BranchTargetBuffer,
    R: ReturnAddrStack,
    I: IndirectPredictor,
{
    /// Retires every outstanding prediction of `tid` with sequence number at most `done_sn`.
    ///
    /// Entries are removed strictly oldest first. For each, the direction predictor is
    /// trained with the entry's final direction and target, and the indirect predictor
    /// and return stack commit their tokens. This is the only path that trains
    /// permanent prediction tables. A call with nothing to retire is a no-op.
    ///
    /// # Panics
    ///
    /// On an unknown thread.
    pub fn commit(&mut self, done_sn: InstSeqNum, tid: ThreadId) {
        debug!(tid, done_sn, "committing branches");
        let log = thread_log(&mut self.pred_hist, tid);

        while let Some(entry) = log.pop_back_through(done_sn) {
            let kind = entry.inst.branch_kind();
            trace!(tid, sn = entry.seq_num, pc = entry.pc, taken = entry.pred_taken, "retiring prediction");

            self.dir.update(
                tid,
                entry.pc,
                entry.pred_taken,
                entry.dir_history,
                entry.inst.as_ref(),
                entry.target,
            );

            if let Some(ipred) = self.ipred.as_mut() {
                ipred.commit(tid, entry.seq_num, entry.indirect_history);
            }

            match self.ras.as_mut() {
                Some(ras) => ras.commit(tid, entry.mispredict, kind, entry.ras_history),
                None if entry.ras_history.is_some() => fatal(BpuError::MissingReturnStack {
                    tid,
                    seq_num: entry.seq_num,
                }),
                None => {}
            }

            self.stats.committed += 1;
        }
    }
}
