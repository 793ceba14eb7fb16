//! Configuration for the branch prediction unit.
//!
//! This module defines the configuration structures used to size and select the
//! unit's collaborators. It provides:
//! 1. **Defaults:** Baseline table sizes and history lengths.
//! 2. **Structures:** `BpuConfig` and the optional `IndirectConfig`.
//! 3. **Validation:** Power-of-two and range checks reported as `ConfigError`.
//!
//! Configuration is supplied as JSON; every field is optional and falls back to its default.

use serde::{Deserialize, Serialize};

use crate::common::ConfigError;

/// Default configuration constants.
mod defaults {
    /// Hardware threads tracked by the unit.
    pub const NUM_THREADS: usize = 1;

    /// Branch Target Buffer entries.
    pub const BTB_SIZE: usize = 4096;

    /// Return Address Stack entries per thread.
    pub const RAS_SIZE: usize = 16;

    /// Low PC bits dropped before indexing (4-byte instructions).
    pub const INST_SHIFT_AMT: u32 = 2;

    /// GShare global history length (4096 counters).
    pub const GSHARE_HISTORY_BITS: u32 = 12;

    /// Indirect predictor sets.
    pub const INDIRECT_SETS: usize = 256;

    /// Indirect predictor ways per set.
    pub const INDIRECT_WAYS: usize = 2;

    /// Indirect predictor path history length in bits.
    pub const INDIRECT_PATH_BITS: u32 = 16;
}

/// Largest supported gshare history length.
const MAX_GSHARE_HISTORY_BITS: u32 = 24;

/// Largest PC shift that still leaves a bit to index with.
const MAX_INST_SHIFT_AMT: u32 = 63;

/// Largest supported indirect predictor associativity.
const MAX_INDIRECT_WAYS: usize = 64;

/// Direction prediction algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionKind {
    /// Always predict not-taken.
    Static,
    /// Global history XOR PC indexed 2-bit counters.
    #[default]
    GShare,
}

/// Branch prediction unit configuration.
///
/// # Examples
///
/// ```
/// use bpred_core::config::{BpuConfig, DirectionKind};
///
/// let config: BpuConfig = serde_json::from_str(r#"{
///     "num_threads": 2,
///     "direction": "Static",
///     "indirect": { "sets": 64 }
/// }"#).unwrap();
///
/// assert_eq!(config.num_threads, 2);
/// assert_eq!(config.direction, DirectionKind::Static);
/// assert_eq!(config.indirect.unwrap().ways, 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpuConfig {
    /// Number of hardware threads with independent history.
    #[serde(default = "BpuConfig::default_num_threads")]
    pub num_threads: usize,

    /// Direction predictor type.
    #[serde(default)]
    pub direction: DirectionKind,

    /// Branch Target Buffer size (power of two).
    #[serde(default = "BpuConfig::default_btb_size")]
    pub btb_size: usize,

    /// Return Address Stack size per thread; zero disables the RAS.
    #[serde(default = "BpuConfig::default_ras_size")]
    pub ras_size: usize,

    /// Low PC bits ignored when indexing tables.
    #[serde(default = "BpuConfig::default_inst_shift_amt")]
    pub inst_shift_amt: u32,

    /// GShare global history length in bits.
    #[serde(default = "BpuConfig::default_gshare_history_bits")]
    pub gshare_history_bits: u32,

    /// Indirect target predictor; absent disables indirect prediction.
    #[serde(default)]
    pub indirect: Option<IndirectConfig>,
}

impl BpuConfig {
    fn default_num_threads() -> usize {
        defaults::NUM_THREADS
    }

    fn default_btb_size() -> usize {
        defaults::BTB_SIZE
    }

    fn default_ras_size() -> usize {
        defaults::RAS_SIZE
    }

    fn default_inst_shift_amt() -> u32 {
        defaults::INST_SHIFT_AMT
    }

    fn default_gshare_history_bits() -> u32 {
        defaults::GSHARE_HISTORY_BITS
    }

    /// Checks table geometry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for zero threads, a non-power-of-two BTB, an
    /// instruction shift above 63, a gshare history length outside `1..=24`, or an
    /// invalid indirect geometry (see [`IndirectConfig::validate`]).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        if !self.btb_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: "btb_size",
                value: self.btb_size,
            });
        }
        if self.inst_shift_amt > MAX_INST_SHIFT_AMT {
            return Err(ConfigError::OutOfRange {
                name: "inst_shift_amt",
                value: self.inst_shift_amt as usize,
                min: 0,
                max: MAX_INST_SHIFT_AMT as usize,
            });
        }
        if self.direction == DirectionKind::GShare
            && !(1..=MAX_GSHARE_HISTORY_BITS).contains(&self.gshare_history_bits)
        {
            return Err(ConfigError::OutOfRange {
                name: "gshare_history_bits",
                value: self.gshare_history_bits as usize,
                min: 1,
                max: MAX_GSHARE_HISTORY_BITS as usize,
            });
        }
        if let Some(indirect) = &self.indirect {
            indirect.validate()?;
        }
        Ok(())
    }
}

impl Default for BpuConfig {
    /// Single thread, gshare, default-sized BTB and RAS, no indirect predictor.
    fn default() -> Self {
        Self {
            num_threads: defaults::NUM_THREADS,
            direction: DirectionKind::default(),
            btb_size: defaults::BTB_SIZE,
            ras_size: defaults::RAS_SIZE,
            inst_shift_amt: defaults::INST_SHIFT_AMT,
            gshare_history_bits: defaults::GSHARE_HISTORY_BITS,
            indirect: None,
        }
    }
}

/// Indirect target predictor configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndirectConfig {
    /// Number of sets (power of two).
    #[serde(default = "IndirectConfig::default_sets")]
    pub sets: usize,

    /// Associativity.
    #[serde(default = "IndirectConfig::default_ways")]
    pub ways: usize,

    /// Path history length in bits.
    #[serde(default = "IndirectConfig::default_path_bits")]
    pub path_bits: u32,
}

impl IndirectConfig {
    fn default_sets() -> usize {
        defaults::INDIRECT_SETS
    }

    fn default_ways() -> usize {
        defaults::INDIRECT_WAYS
    }

    fn default_path_bits() -> u32 {
        defaults::INDIRECT_PATH_BITS
    }

    /// Checks table geometry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a non-power-of-two set count, ways outside
    /// `1..=64`, a table whose `sets * ways` entries overflow `usize`, or a path
    /// length outside `1..=64`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sets.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: "indirect.sets",
                value: self.sets,
            });
        }
        if !(1..=MAX_INDIRECT_WAYS).contains(&self.ways) {
            return Err(ConfigError::OutOfRange {
                name: "indirect.ways",
                value: self.ways,
                min: 1,
                max: MAX_INDIRECT_WAYS,
            });
        }
        if self.sets.checked_mul(self.ways).is_none() {
            return Err(ConfigError::OutOfRange {
                name: "indirect.sets",
                value: self.sets,
                min: 1,
                max: usize::MAX / self.ways,
            });
        }
        if !(1..=64).contains(&self.path_bits) {
            return Err(ConfigError::OutOfRange {
                name: "indirect.path_bits",
                value: self.path_bits as usize,
                min: 1,
                max: 64,
            });
        }
        Ok(())
    }
}

impl Default for IndirectConfig {
    fn default() -> Self {
        Self {
            sets: defaults::INDIRECT_SETS,
            ways: defaults::INDIRECT_WAYS,
            path_bits: defaults::INDIRECT_PATH_BITS,
        }
    }
}
