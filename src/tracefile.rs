//! Chrome/Perfetto trace event files (JSON array form) read/write.

use serde::ser::Serializer as _;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::{KernTraceError, KernTraceResult, WorkerRole, write_atomic};

/// Trace event phase. Only complete events (`"X"`) are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "X")]
    Complete,
}

/// One worker's execution interval for one instruction slot on one SM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub name: String,
    pub ph: Phase,
    /// Start, microseconds.
    pub ts: f64,
    /// Duration, microseconds.
    pub dur: f64,
    /// SM index.
    pub pid: usize,
    /// Worker role name.
    pub tid: WorkerRole,
    pub args: TraceArgs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceArgs {
    pub sm_id: usize,
    pub instruction_index: usize,
    pub opcode: i64,
    pub operation: String,
    pub start_cycles: i64,
    pub end_cycles: i64,
    pub start_us: f64,
    pub end_us: f64,
}

/// Serialize `events` as a pretty-printed JSON array to `path`, replacing
/// any existing file. Returns the written path.
pub fn write_trace(events: &[TraceEvent], path: &Path) -> KernTraceResult<PathBuf> {
    let buf = to_json_array(events)?;
    write_atomic(path, &buf)?;
    Ok(path.to_path_buf())
}

pub(crate) fn to_json_array<T: Serialize>(items: &[T]) -> KernTraceResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(items.len().saturating_mul(320));
    {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        use serde::ser::SerializeSeq as _;
        let mut seq = ser.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(item)?;
        }
        seq.end()?;
    }
    Ok(buf)
}

pub fn read_trace(path: &Path) -> KernTraceResult<Vec<TraceEvent>> {
    let bytes = std::fs::read(path).map_err(|e| KernTraceError::io_at(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| KernTraceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
