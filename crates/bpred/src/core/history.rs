//! Prediction history.
//!
//! Every prediction made by the orchestrator leaves a [`PredictorHistory`] entry in its
//! thread's [`HistoryLog`] until the branch retires or is squashed. The log is ordered
//! by sequence number, youngest at the front:
//!
//! ```text
//!   front (youngest)                                   back (oldest)
//!   [sn 42] -> [sn 37] -> [sn 31] -> ... -> [sn 12]
//!     ^ predict pushes / squash pops         ^ commit pops
//! ```

use std::collections::VecDeque;

use crate::common::{Addr, BpuError, InstSeqNum, ThreadId, fatal};
use crate::isa::InstHandle;

/// Record of one outstanding prediction.
///
/// Generic over the history tokens of the direction predictor (`D`), the indirect
/// predictor (`I`) and the return address stack (`R`). The entry owns its tokens until
/// they are handed back at commit or squash.
#[derive(Debug)]
pub struct PredictorHistory<D, I, R> {
    /// Sequence number of the predicted instruction.
    pub seq_num: InstSeqNum,
    /// Address of the predicted instruction.
    pub pc: Addr,
    /// Current belief of the direction; overwritten on correction.
    pub pred_taken: bool,
    /// Predicted next PC; overwritten on correction.
    pub target: Addr,
    /// The predicted instruction.
    pub inst: InstHandle,
    /// Direction predictor token.
    pub dir_history: D,
    /// Indirect predictor token, present once the indirect predictor has seen this prediction.
    pub indirect_history: Option<I>,
    /// Return stack token, present exactly when this prediction pushed or popped the RAS.
    pub ras_history: Option<R>,
    /// The indirect predictor supplied the target.
    pub was_indirect: bool,
    /// Set by recovery when the prediction was corrected.
    pub mispredict: bool,
    /// Owning thread.
    pub tid: ThreadId,
}

impl<D, I, R> PredictorHistory<D, I, R> {
    /// Creates an entry with no indirect or return stack state.
    ///
    /// The target is filled in once target resolution is complete.
    pub fn new(
        seq_num: InstSeqNum,
        pc: Addr,
        pred_taken: bool,
        inst: InstHandle,
        dir_history: D,
        tid: ThreadId,
    ) -> Self {
        Self {
            seq_num,
            pc,
            pred_taken,
            target: 0,
            inst,
            dir_history,
            indirect_history: None,
            ras_history: None,
            was_indirect: false,
            mispredict: false,
            tid,
        }
    }
}

/// A thread's outstanding predictions, youngest first.
#[derive(Debug)]
pub struct HistoryLog<D, I, R> {
    entries: VecDeque<PredictorHistory<D, I, R>>,
}

impl<D, I, R> Default for HistoryLog<D, I, R> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<D, I, R> HistoryLog<D, I, R> {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the youngest prediction.
    ///
    /// # Panics
    ///
    /// Raises [`BpuError::OutOfOrderPrediction`] if `entry` is not strictly younger than
    /// the current front.
    pub fn push_front(&mut self, entry: PredictorHistory<D, I, R>) {
        if let Some(front) = self.entries.front()
            && entry.seq_num <= front.seq_num
        {
            fatal(BpuError::OutOfOrderPrediction {
                tid: entry.tid,
                seq_num: entry.seq_num,
                front: front.seq_num,
            });
        }
        self.entries.push_front(entry);
    }

    /// Removes the oldest entry if its sequence number is at most `done_sn`.
    pub fn pop_back_through(&mut self, done_sn: InstSeqNum) -> Option<PredictorHistory<D, I, R>> {
        if self.entries.back()?.seq_num <= done_sn {
            self.entries.pop_back()
        } else {
            None
        }
    }

    /// Removes the youngest entry if its sequence number is greater than `squashed_sn`.
    pub fn pop_front_after(&mut self, squashed_sn: InstSeqNum) -> Option<PredictorHistory<D, I, R>> {
        if self.entries.front()?.seq_num > squashed_sn {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Youngest entry.
    pub fn front(&self) -> Option<&PredictorHistory<D, I, R>> {
        self.entries.front()
    }

    /// Youngest entry, for in-place correction.
    pub fn front_mut(&mut self) -> Option<&mut PredictorHistory<D, I, R>> {
        self.entries.front_mut()
    }

    /// Oldest entry.
    pub fn back(&self) -> Option<&PredictorHistory<D, I, R>> {
        self.entries.back()
    }

    /// Number of outstanding predictions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no predictions are outstanding.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates from youngest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &PredictorHistory<D, I, R>> {
        self.entries.iter()
    }

    /// Sequence numbers from youngest to oldest.
    pub fn seq_nums(&self) -> Vec<InstSeqNum> {
        self.entries.iter().map(|e| e.seq_num).collect()
    }
}
