//! Branch Trace Records.
//!
//! A trace is the committed control-flow stream of a program: one record per control
//! instruction, with its resolved direction and target. Two encodings are accepted:
//! a JSON array of records, or JSON Lines (one record per line, blank lines and lines
//! starting with `#` ignored).
//!
//! ```text
//! {"seq": 1, "pc": 4096, "inst": {"mnemonic": "beq"}, "taken": true, "target": 4160}
//! {"seq": 2, "pc": 4160, "inst": {"is_call": true, "is_uncond": true}, "taken": true, "target": 8192}
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::{Addr, ConfigError, InstSeqNum, PcState, ThreadId};
use crate::isa::{ControlInst, StaticControlInst};

/// Errors raised while loading or replaying a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace file could not be read.
    #[error("failed to read trace {path}: {source}")]
    Io {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A record could not be decoded.
    #[error("malformed trace record at line {line}: {source}")]
    Parse {
        /// One-based line of the offending record (1 for array traces).
        line: usize,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A record is not younger than the previous record of its thread.
    #[error("[tid:{tid}] trace sn:{seq} follows sn:{last}")]
    OutOfOrder {
        /// Thread of the record.
        tid: ThreadId,
        /// Sequence number of the record.
        seq: InstSeqNum,
        /// Sequence number of the previous record of the thread.
        last: InstSeqNum,
    },

    /// A record names a thread the unit was not configured for.
    #[error("trace record for thread {tid}, unit has {num_threads} thread(s)")]
    UnknownThread {
        /// Thread of the record.
        tid: ThreadId,
        /// Configured thread count.
        num_threads: usize,
    },

    /// The unit configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One resolved control instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Sequence number; strictly increasing per thread.
    pub seq: InstSeqNum,
    /// Hardware thread.
    #[serde(default)]
    pub tid: ThreadId,
    /// Address of the instruction.
    pub pc: Addr,
    /// Decoded control flags.
    #[serde(default)]
    pub inst: StaticControlInst,
    /// Resolved direction.
    pub taken: bool,
    /// Resolved taken target; ignored when not taken.
    #[serde(default)]
    pub target: Addr,
}

impl TraceRecord {
    /// The PC execution actually continued at.
    pub fn next_pc(&self) -> PcState {
        if self.taken {
            PcState::new(self.target)
        } else {
            let mut pc = PcState::new(self.pc);
            self.inst.advance_pc(&mut pc);
            pc
        }
    }
}

/// Decodes a trace from text.
///
/// Text whose first non-blank character is `[` is read as a JSON array, anything else
/// as JSON Lines.
///
/// # Errors
///
/// Returns [`TraceError::Parse`] for the first record that fails to decode.
pub fn parse_trace(text: &str) -> Result<Vec<TraceRecord>, TraceError> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).map_err(|source| TraceError::Parse {
            line: source.line(),
            source,
        });
    }

    text.lines()
        .enumerate()
        .filter(|(_, l)| {
            let l = l.trim();
            !l.is_empty() && !l.starts_with('#')
        })
        .map(|(i, l)| serde_json::from_str(l).map_err(|source| TraceError::Parse { line: i + 1, source }))
        .collect()
}

/// Reads and decodes the trace at `path`.
///
/// # Errors
///
/// Returns [`TraceError::Io`] if the file cannot be read, or [`TraceError::Parse`] for
/// a malformed record.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceRecord>, TraceError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_trace(&text)?;
    tracing::debug!(path = %path.display(), records = records.len(), "trace loaded");
    Ok(records)
}
