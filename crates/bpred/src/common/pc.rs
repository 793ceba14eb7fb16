//! Program-counter state.
//!
//! The orchestrator never interprets a PC beyond cloning it, comparing it, and handing
//! it to the instruction for advancement. Instruction length lives with the
//! instruction handle, not here.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Addr;

/// The program-counter value of an instruction being predicted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PcState {
    pc: Addr,
}

impl PcState {
    /// Creates a PC state pointing at `pc`.
    #[inline]
    pub const fn new(pc: Addr) -> Self {
        Self { pc }
    }

    /// Returns the address of the instruction this state points at.
    #[inline]
    pub const fn inst_addr(&self) -> Addr {
        self.pc
    }

    /// Overwrites this state with `other`.
    #[inline]
    pub const fn set(&mut self, other: &Self) {
        self.pc = other.pc;
    }

    /// Moves the PC forward by `bytes`, wrapping at the top of the address space.
    #[inline]
    pub const fn advance(&mut self, bytes: u64) {
        self.pc = self.pc.wrapping_add(bytes);
    }
}

impl fmt::Display for PcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.pc)
    }
}

impl From<Addr> for PcState {
    fn from(pc: Addr) -> Self {
        Self::new(pc)
    }
}
