//! Branch Target Buffer (BTB).
//!
//! The BTB is a direct-mapped cache that stores target addresses for control flow
//! instructions. It allows the fetch stage to redirect to a taken target before the
//! instruction is decoded. Entries are tagged with the full PC and the owning thread.

use crate::common::{Addr, PcState, ThreadId};
use crate::isa::BranchKind;

/// Trait for branch target caches consulted on taken predictions.
pub trait BranchTargetBuffer {
    /// Looks up the most recently observed taken target for `pc`.
    ///
    /// # Returns
    ///
    /// The predicted target if a matching entry exists, otherwise `None`.
    fn lookup(&mut self, tid: ThreadId, pc: Addr, kind: BranchKind) -> Option<PcState>;

    /// Records `target` as the taken target of the branch at `pc`.
    fn update(&mut self, tid: ThreadId, pc: Addr, target: &PcState, kind: BranchKind);
}

/// An entry in the Branch Target Buffer.
#[derive(Clone, Copy, Debug, Default)]
struct BtbEntry {
    /// Full PC of the branch, compared on lookup.
    tag: Addr,
    /// Thread that installed the entry.
    tid: ThreadId,
    /// The predicted target address.
    target: Addr,
    /// Indicates if this entry contains valid data.
    valid: bool,
}

/// Direct-mapped Branch Target Buffer.
#[derive(Clone, Debug)]
pub struct Btb {
    /// The table of BTB entries.
    table: Vec<BtbEntry>,
    /// Index mask (`size - 1`).
    mask: usize,
    /// Low PC bits dropped before indexing (instruction alignment).
    inst_shift_amt: u32,
}

impl Btb {
    /// Creates a new Branch Target Buffer.
    ///
    /// # Arguments
    ///
    /// * `size` - The number of entries. Must be a power of 2; validated by
    ///   [`BpuConfig::validate`](crate::config::BpuConfig::validate).
    /// * `inst_shift_amt` - Number of low PC bits ignored when indexing.
    pub fn new(size: usize, inst_shift_amt: u32) -> Self {
        let size = size.max(1);
        Self {
            table: vec![BtbEntry::default(); size],
            mask: size - 1,
            inst_shift_amt,
        }
    }

    /// Calculates the table index for a given program counter.
    const fn index(&self, pc: Addr) -> usize {
        ((pc >> self.inst_shift_amt) as usize) & self.mask
    }

    /// Returns true if a valid entry for `pc` owned by `tid` is present.
    pub fn contains(&self, tid: ThreadId, pc: Addr) -> bool {
        let e = self.table[self.index(pc)];
        e.valid && e.tag == pc && e.tid == tid
    }

    /// Number of entries.
    pub fn capacity(&self) -> usize {
        self.table.len()
    }
}

impl BranchTargetBuffer for Btb {
    /// The buffer is unified across branch kinds; `kind` is accepted but unused.
    fn lookup(&mut self, tid: ThreadId, pc: Addr, _kind: BranchKind) -> Option<PcState> {
        let e = self.table[self.index(pc)];
        if e.valid && e.tag == pc && e.tid == tid {
            Some(PcState::new(e.target))
        } else {
            None
        }
    }

    /// Writes a new entry or overwrites whatever currently maps to the same index.
    fn update(&mut self, tid: ThreadId, pc: Addr, target: &PcState, _kind: BranchKind) {
        let idx = self.index(pc);
        self.table[idx] = BtbEntry {
            tag: pc,
            tid,
            target: target.inst_addr(),
            valid: true,
        };
    }
}
