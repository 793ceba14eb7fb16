//! Trace Replay Driver.
//!
//! Models an in-order front end with immediate branch resolution and delayed
//! retirement. Each record is:
//! 1. **Predicted:** The unit predicts direction and target from the fetch PC.
//! 2. **Resolved:** The prediction is compared with the recorded outcome; on divergence
//!    the unit is told to squash and correct.
//! 3. **Retired:** Once more than `window` predictions of a thread are in flight, the
//!    oldest are committed.
//!
//! At the end of the trace every thread is drained and the unit's drain check is run.

use std::collections::VecDeque;

use serde::Serialize;
use tracing::{debug, info};

use super::trace::{TraceError, TraceRecord};
use crate::BpuConfig;
use crate::common::{InstSeqNum, PcState};
use crate::core::DefaultBranchPredUnit;
use crate::stats::BpStats;

/// Outcome counts of a replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Records replayed.
    pub predictions: u64,
    /// Records whose predicted direction was wrong.
    pub direction_mispredicts: u64,
    /// Records with the right direction but the wrong next PC.
    pub target_mispredicts: u64,
}

impl ReplaySummary {
    /// Total records that needed correction.
    pub const fn mispredicts(&self) -> u64 {
        self.direction_mispredicts + self.target_mispredicts
    }

    /// Fraction of records predicted correctly, or 0.0 for an empty replay.
    pub fn accuracy(&self) -> f64 {
        if self.predictions == 0 {
            0.0
        } else {
            (self.predictions - self.mispredicts()) as f64 / self.predictions as f64
        }
    }
}

/// Feeds trace records through a [`DefaultBranchPredUnit`].
#[derive(Debug)]
pub struct TraceDriver {
    unit: DefaultBranchPredUnit,
    /// Maximum predictions in flight per thread before the oldest is retired.
    window: usize,
    /// Sequence numbers in flight, oldest at the front.
    inflight: Vec<VecDeque<InstSeqNum>>,
    /// Last sequence number seen per thread.
    last_seq: Vec<Option<InstSeqNum>>,
    summary: ReplaySummary,
}

impl TraceDriver {
    /// Builds a driver around a freshly configured unit.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Config`] if `config` fails validation.
    pub fn new(config: &BpuConfig, window: usize) -> Result<Self, TraceError> {
        let unit = DefaultBranchPredUnit::from_config(config)?;
        let n = unit.num_threads();
        Ok(Self {
            unit,
            window,
            inflight: vec![VecDeque::new(); n],
            last_seq: vec![None; n],
            summary: ReplaySummary::default(),
        })
    }

    /// Predicts, resolves, and possibly retires one record.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::UnknownThread`] or [`TraceError::OutOfOrder`] for a record
    /// the unit cannot accept. The unit is not touched in either case.
    pub fn step(&mut self, rec: &TraceRecord) -> Result<(), TraceError> {
        let num_threads = self.unit.num_threads();
        if rec.tid >= num_threads {
            return Err(TraceError::UnknownThread {
                tid: rec.tid,
                num_threads,
            });
        }
        if let Some(last) = self.last_seq[rec.tid]
            && rec.seq <= last
        {
            return Err(TraceError::OutOfOrder {
                tid: rec.tid,
                seq: rec.seq,
                last,
            });
        }
        self.last_seq[rec.tid] = Some(rec.seq);

        let inst = rec.inst.clone().into_handle();
        let mut pc = PcState::new(rec.pc);
        let pred_taken = self.unit.predict(&inst, rec.seq, &mut pc, rec.tid);
        self.summary.predictions += 1;

        let actual = rec.next_pc();
        if pred_taken != rec.taken {
            self.summary.direction_mispredicts += 1;
            debug!(tid = rec.tid, sn = rec.seq, pc = rec.pc, pred_taken, "direction mispredict");
            self.unit.squash_and_correct(rec.seq, &actual, rec.taken, rec.tid);
        } else if pc != actual {
            self.summary.target_mispredicts += 1;
            debug!(tid = rec.tid, sn = rec.seq, predicted = %pc, actual = %actual, "target mispredict");
            self.unit.squash_and_correct(rec.seq, &actual, rec.taken, rec.tid);
        }

        let inflight = &mut self.inflight[rec.tid];
        inflight.push_back(rec.seq);
        while inflight.len() > self.window {
            if let Some(sn) = inflight.pop_front() {
                self.unit.commit(sn, rec.tid);
            }
        }
        Ok(())
    }

    /// Counts so far.
    pub const fn summary(&self) -> &ReplaySummary {
        &self.summary
    }

    /// The unit being driven.
    pub const fn unit(&self) -> &DefaultBranchPredUnit {
        &self.unit
    }

    /// Retires everything in flight, checks the unit drained, and returns the results.
    ///
    /// # Panics
    ///
    /// If the unit still holds history after every thread has been committed through.
    pub fn finish(mut self) -> (ReplaySummary, BpStats) {
        for tid in 0..self.unit.num_threads() {
            self.unit.commit(InstSeqNum::MAX, tid);
            self.inflight[tid].clear();
        }
        self.unit.drain_sanity_check();
        info!(
            predictions = self.summary.predictions,
            mispredicts = self.summary.mispredicts(),
            "replay complete"
        );
        (self.summary, *self.unit.stats())
    }
}

/// Replays `records` through a unit built from `config`.
///
/// # Errors
///
/// Returns the first configuration or record error; see [`TraceDriver::step`].
pub fn replay(
    config: &BpuConfig,
    records: &[TraceRecord],
    window: usize,
) -> Result<(ReplaySummary, BpStats), TraceError> {
    let mut driver = TraceDriver::new(config, window)?;
    for rec in records {
        driver.step(rec)?;
    }
    Ok(driver.finish())
}
