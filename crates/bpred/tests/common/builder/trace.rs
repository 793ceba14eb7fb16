//! Trace stream builder.
//!
//! Assigns consecutive sequence numbers per thread so tests only describe control flow.

use std::collections::HashMap;

use bpred_core::common::{Addr, InstSeqNum, ThreadId};
use bpred_core::isa::StaticControlInst;
use bpred_core::sim::TraceRecord;

#[derive(Debug, Default)]
pub struct TraceBuilder {
    records: Vec<TraceRecord>,
    next_seq: HashMap<ThreadId, InstSeqNum>,
    tid: ThreadId,
}

impl TraceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subsequent records belong to `tid`.
    pub fn thread(mut self, tid: ThreadId) -> Self {
        self.tid = tid;
        self
    }

    fn push(mut self, pc: Addr, inst: StaticControlInst, taken: bool, target: Addr) -> Self {
        let seq = self.next_seq.entry(self.tid).or_insert(0);
        *seq += 1;
        self.records.push(TraceRecord {
            seq: *seq,
            tid: self.tid,
            pc,
            inst,
            taken,
            target,
        });
        self
    }

    pub fn taken(self, pc: Addr, inst: StaticControlInst, target: Addr) -> Self {
        self.push(pc, inst, true, target)
    }

    pub fn not_taken(self, pc: Addr, inst: StaticControlInst) -> Self {
        self.push(pc, inst, false, 0)
    }

    /// `n` copies of a taken record.
    pub fn repeat_taken(mut self, n: usize, pc: Addr, inst: &StaticControlInst, target: Addr) -> Self {
        for _ in 0..n {
            self = self.taken(pc, inst.clone(), target);
        }
        self
    }

    pub fn build(self) -> Vec<TraceRecord> {
        self.records
    }
}
