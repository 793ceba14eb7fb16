//! Control-Instruction Handle.
//!
//! This module defines the `ControlInst` trait through which the orchestrator inspects
//! the instruction it is predicting, the `BranchKind` classification derived from it,
//! and `StaticControlInst`, a decoded-flags implementation used by trace replay.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::PcState;

/// Default instruction length in bytes.
const DEFAULT_INST_SIZE: u64 = 4;

/// Classification of a control-transfer instruction.
///
/// Passed to the target buffer, return stack, and indirect predictor so they can
/// partition or account by branch type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchKind {
    /// Conditional branch with a PC-relative target.
    DirectCond,
    /// Unconditional jump with a PC-relative target.
    DirectUncond,
    /// Conditional branch with a register target.
    IndirectCond,
    /// Unconditional jump with a register target.
    IndirectUncond,
    /// Call with a PC-relative target.
    CallDirect,
    /// Call with a register target.
    CallIndirect,
    /// Function return.
    Return,
}

impl BranchKind {
    /// Classifies an instruction from its control predicates.
    ///
    /// Returns take precedence over calls, and calls over plain jumps, so a
    /// coroutine-style return-and-call classifies as [`BranchKind::Return`].
    pub const fn from_flags(is_return: bool, is_call: bool, is_uncond: bool, is_direct: bool) -> Self {
        if is_return {
            Self::Return
        } else if is_call {
            if is_direct { Self::CallDirect } else { Self::CallIndirect }
        } else if is_direct {
            if is_uncond { Self::DirectUncond } else { Self::DirectCond }
        } else if is_uncond {
            Self::IndirectUncond
        } else {
            Self::IndirectCond
        }
    }

    /// Returns true if the target is not encoded in the instruction.
    pub const fn is_indirect(self) -> bool {
        matches!(self, Self::IndirectCond | Self::IndirectUncond | Self::CallIndirect | Self::Return)
    }

    /// Returns true for calls of either flavour.
    pub const fn is_call(self) -> bool {
        matches!(self, Self::CallDirect | Self::CallIndirect)
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DirectCond => "direct_cond",
            Self::DirectUncond => "direct_uncond",
            Self::IndirectCond => "indirect_cond",
            Self::IndirectUncond => "indirect_uncond",
            Self::CallDirect => "call_direct",
            Self::CallIndirect => "call_indirect",
            Self::Return => "return",
        };
        f.write_str(name)
    }
}

/// A fetched control instruction as seen by the prediction unit.
///
/// The unit holds a shared handle to the instruction from prediction until the
/// history entry is retired or squashed.
pub trait ControlInst: fmt::Debug {
    /// Returns true if the instruction is a function return.
    fn is_return(&self) -> bool;

    /// Returns true if the instruction is a function call.
    fn is_call(&self) -> bool;

    /// Returns true if the instruction always transfers control.
    fn is_uncond_ctrl(&self) -> bool;

    /// Returns true if the target is encoded in the instruction.
    fn is_direct_ctrl(&self) -> bool;

    /// Length of the instruction in bytes.
    fn size(&self) -> u64;

    /// Short name used in trace output.
    fn mnemonic(&self) -> &str {
        "ctrl"
    }

    /// Advances `pc` to the sequential successor of this instruction.
    fn advance_pc(&self, pc: &mut PcState) {
        pc.advance(self.size());
    }

    /// Builds the return address a call pushes onto the return stack.
    ///
    /// # Arguments
    ///
    /// * `_cur` - PC state at the point of prediction.
    /// * `call` - PC state of the call; the return address is its sequential successor.
    fn build_return_address(&self, _cur: &PcState, call: &PcState) -> PcState {
        let mut ret = *call;
        self.advance_pc(&mut ret);
        ret
    }

    /// Classifies the instruction from its predicates.
    fn branch_kind(&self) -> BranchKind {
        BranchKind::from_flags(
            self.is_return(),
            self.is_call(),
            self.is_uncond_ctrl(),
            self.is_direct_ctrl(),
        )
    }
}

/// Shared handle to an instruction under prediction.
pub type InstHandle = Arc<dyn ControlInst>;

/// Control instruction described by its decoded flags.
///
/// Deserializes from trace files; every flag defaults to `false` and the size to
/// four bytes, so a bare `{}` is a direct conditional branch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticControlInst {
    /// Mnemonic for logging.
    pub mnemonic: String,
    /// Function return.
    pub is_return: bool,
    /// Function call.
    pub is_call: bool,
    /// Always transfers control.
    pub is_uncond: bool,
    /// Register-target (indirect) control transfer.
    pub is_indirect: bool,
    /// Encoded length in bytes; zero means the default of four.
    pub size: u64,
}

impl StaticControlInst {
    fn with_flags(mnemonic: &str, is_return: bool, is_call: bool, is_uncond: bool, is_indirect: bool) -> Self {
        Self {
            mnemonic: mnemonic.to_owned(),
            is_return,
            is_call,
            is_uncond,
            is_indirect,
            size: DEFAULT_INST_SIZE,
        }
    }

    /// Conditional PC-relative branch (`beq`).
    pub fn cond_branch() -> Self {
        Self::with_flags("beq", false, false, false, false)
    }

    /// Conditional register-target branch.
    pub fn cond_indirect() -> Self {
        Self::with_flags("bx.cond", false, false, false, true)
    }

    /// Unconditional PC-relative jump (`j`).
    pub fn jump() -> Self {
        Self::with_flags("j", false, false, true, false)
    }

    /// Unconditional register-target jump (`jr`).
    pub fn jump_indirect() -> Self {
        Self::with_flags("jr", false, false, true, true)
    }

    /// Unconditional PC-relative call (`jal ra`).
    pub fn call() -> Self {
        Self::with_flags("jal", false, true, true, false)
    }

    /// Conditional PC-relative call, as found on ISAs with predicated `bl`.
    pub fn cond_call() -> Self {
        Self::with_flags("bl.cond", false, true, false, false)
    }

    /// Unconditional register-target call (`jalr ra`).
    pub fn call_indirect() -> Self {
        Self::with_flags("jalr", false, true, true, true)
    }

    /// Conditional register-target call.
    pub fn cond_call_indirect() -> Self {
        Self::with_flags("blr.cond", false, true, false, true)
    }

    /// Function return (`ret`).
    pub fn ret() -> Self {
        Self::with_flags("ret", true, false, true, true)
    }

    /// Conditional function return.
    pub fn cond_ret() -> Self {
        Self::with_flags("ret.cond", true, false, false, true)
    }

    /// Overrides the encoded length.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Wraps the instruction in a shared handle.
    pub fn into_handle(self) -> InstHandle {
        Arc::new(self)
    }
}

impl ControlInst for StaticControlInst {
    fn is_return(&self) -> bool {
        self.is_return
    }

    fn is_call(&self) -> bool {
        self.is_call
    }

    fn is_uncond_ctrl(&self) -> bool {
        self.is_uncond
    }

    fn is_direct_ctrl(&self) -> bool {
        !self.is_indirect
    }

    fn size(&self) -> u64 {
        if self.size == 0 { DEFAULT_INST_SIZE } else { self.size }
    }

    fn mnemonic(&self) -> &str {
        if self.mnemonic.is_empty() { "ctrl" } else { &self.mnemonic }
    }
}
