//! Prediction orchestrator.
//!
//! `BranchPredUnit` sits between the fetch stage and the prediction structures. It
//! performs the following:
//! 1. **Predict:** Consults the direction predictor, RAS, BTB, and indirect predictor and
//!    records a history entry per prediction (`predict.rs`).
//! 2. **Commit:** Retires the oldest entries and trains the structures (`commit.rs`).
//! 3. **Recover:** Discards younger speculative entries and corrects the mispredicted one
//!    (`squash.rs`).
//!
//! The unit is driven by a single-threaded, step-based simulation loop. Each hardware
//! thread has an independent [`HistoryLog`].

/// History entries and the per-thread log.
pub mod history;

mod commit;
mod predict;
mod squash;

pub use history::{HistoryLog, PredictorHistory};

use std::fmt::Write;

use crate::common::{BpuError, ConfigError, InstSeqNum, ThreadId, fatal};
use crate::config::BpuConfig;
use crate::stats::BpStats;
use crate::units::bru::{
    BranchTargetBuffer, Btb, DirectionPredictor, DirectionPredictorWrapper, IndirectPredictor, Ras,
    ReturnAddrStack, SimpleIndirectPredictor,
};

/// History entry type of a unit built from `D`, `R`, and `I`.
pub type Entry<D, R, I> = PredictorHistory<
    <D as DirectionPredictor>::History,
    <I as IndirectPredictor>::History,
    <R as ReturnAddrStack>::History,
>;

/// Log type of a unit built from `D`, `R`, and `I`.
pub type Log<D, R, I> = HistoryLog<
    <D as DirectionPredictor>::History,
    <I as IndirectPredictor>::History,
    <R as ReturnAddrStack>::History,
>;

/// Unit assembled from the crate's own structures, as built by [`BranchPredUnit::from_config`].
pub type DefaultBranchPredUnit = BranchPredUnit<DirectionPredictorWrapper, Btb, Ras, SimpleIndirectPredictor>;

/// Speculative branch prediction unit.
///
/// Generic over the direction predictor `D`, the target buffer `B`, the return address
/// stack `R` and the indirect target predictor `I`. The RAS and the indirect predictor
/// are optional; every call site branches on their presence.
#[derive(Debug)]
pub struct BranchPredUnit<D, B, R = Ras, I = SimpleIndirectPredictor>
where
    D: DirectionPredictor,
    B: BranchTargetBuffer,
    R: ReturnAddrStack,
    I: IndirectPredictor,
{
    /// One log of outstanding predictions per thread.
    pred_hist: Vec<Log<D, R, I>>,
    /// Direction predictor.
    dir: D,
    /// Branch target buffer.
    btb: B,
    /// Return address stack.
    ras: Option<R>,
    /// Indirect target predictor.
    ipred: Option<I>,
    /// Side-channel counters.
    stats: BpStats,
}

impl<D, B, R, I> BranchPredUnit<D, B, R, I>
where
    D: DirectionPredictor,
    B: BranchTargetBuffer,
    R: ReturnAddrStack,
    I: IndirectPredictor,
{
    /// Creates a unit with an empty history log per thread.
    ///
    /// # Arguments
    ///
    /// * `num_threads` - Number of hardware threads.
    /// * `dir` - Direction predictor.
    /// * `btb` - Branch target buffer.
    /// * `ras` - Return address stack, or `None` to run without one.
    /// * `ipred` - Indirect target predictor, or `None` to resolve all targets through the BTB.
    pub fn new(num_threads: usize, dir: D, btb: B, ras: Option<R>, ipred: Option<I>) -> Self {
        Self {
            pred_hist: (0..num_threads).map(|_| HistoryLog::new()).collect(),
            dir,
            btb,
            ras,
            ipred,
            stats: BpStats::default(),
        }
    }

    /// Number of hardware threads tracked.
    pub fn num_threads(&self) -> usize {
        self.pred_hist.len()
    }

    /// Outstanding predictions of `tid`, youngest first.
    ///
    /// # Panics
    ///
    /// Raises [`BpuError::UnknownThread`] if `tid` is out of range.
    pub fn history(&self, tid: ThreadId) -> &Log<D, R, I> {
        let num_threads = self.pred_hist.len();
        self.pred_hist
            .get(tid)
            .unwrap_or_else(|| fatal(BpuError::UnknownThread { tid, num_threads }))
    }

    /// Returns true if no thread has outstanding predictions.
    pub fn is_drained(&self) -> bool {
        self.pred_hist.iter().all(HistoryLog::is_empty)
    }

    /// Asserts that every thread's history is empty.
    ///
    /// Called at drain boundaries; outstanding speculative state must never survive one.
    ///
    /// # Panics
    ///
    /// Raises [`BpuError::OutstandingHistory`] for the first thread with a non-empty log.
    pub fn drain_sanity_check(&self) {
        for (tid, log) in self.pred_hist.iter().enumerate() {
            if !log.is_empty() {
                fatal(BpuError::OutstandingHistory {
                    tid,
                    outstanding: log.len(),
                });
            }
        }
    }

    /// Renders every non-empty thread history, youngest entry first.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (tid, log) in self.pred_hist.iter().enumerate() {
            if log.is_empty() {
                continue;
            }
            let _ = writeln!(out, "predHist[{tid}].size(): {}", log.len());
            for e in log.iter() {
                let _ = writeln!(
                    out,
                    "sn:{}, PC:{:#x}, tid:{}, predTaken:{}, target:{:#x}, mispredict:{}, ras:{}",
                    e.seq_num,
                    e.pc,
                    e.tid,
                    e.pred_taken,
                    e.target,
                    e.mispredict,
                    e.ras_history.is_some(),
                );
            }
            out.push('\n');
        }
        out
    }

    /// Statistics collected so far.
    pub const fn stats(&self) -> &BpStats {
        &self.stats
    }

    /// Clears all statistics.
    pub fn reset_stats(&mut self) {
        self.stats = BpStats::default();
    }

    /// Direction predictor.
    pub const fn direction_predictor(&self) -> &D {
        &self.dir
    }

    /// Branch target buffer.
    pub const fn btb(&self) -> &B {
        &self.btb
    }

    /// Return address stack, if configured.
    pub const fn ras(&self) -> Option<&R> {
        self.ras.as_ref()
    }

    /// Indirect target predictor, if configured.
    pub const fn indirect_predictor(&self) -> Option<&I> {
        self.ipred.as_ref()
    }
}

impl DefaultBranchPredUnit {
    /// Builds a unit from configuration using the crate's own structures.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] reported by [`BpuConfig::validate`].
    pub fn from_config(config: &BpuConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ras = (config.ras_size > 0).then(|| Ras::new(config.num_threads, config.ras_size));
        let ipred = config
            .indirect
            .as_ref()
            .map(|c| SimpleIndirectPredictor::new(config.num_threads, c, config.inst_shift_amt));
        tracing::debug!(
            threads = config.num_threads,
            direction = ?config.direction,
            btb = config.btb_size,
            ras = config.ras_size,
            indirect = ipred.is_some(),
            "building branch prediction unit"
        );
        Ok(Self::new(
            config.num_threads,
            DirectionPredictorWrapper::new(config),
            Btb::new(config.btb_size, config.inst_shift_amt),
            ras,
            ipred,
        ))
    }
}

/// Returns `tid`'s log, raising [`BpuError::UnknownThread`] if it does not exist.
fn thread_log<T>(logs: &mut [T], tid: ThreadId) -> &mut T {
    let num_threads = logs.len();
    logs.get_mut(tid)
        .unwrap_or_else(|| fatal(BpuError::UnknownThread { tid, num_threads }))
}

/// Raises [`BpuError::UnknownThread`] unless `tid < num_threads`.
fn check_thread(num_threads: usize, tid: ThreadId) {
    if tid >= num_threads {
        fatal(BpuError::UnknownThread { tid, num_threads });
    }
}

/// Hands a return stack token back for squashing.
///
/// A token can only exist if a stack was configured when it was created, so a missing
/// stack here is a consistency violation.
fn squash_ras<R: ReturnAddrStack>(
    ras: Option<&mut R>,
    tid: ThreadId,
    seq_num: InstSeqNum,
    history: R::History,
) {
    match ras {
        Some(ras) => ras.squash(tid, history),
        None => fatal(BpuError::MissingReturnStack { tid, seq_num }),
    }
}
