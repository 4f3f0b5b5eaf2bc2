//! Concatenate trace event arrays from several files into one.

use std::path::{Path, PathBuf};

use crate::tracefile::to_json_array;
use crate::{KernTraceError, KernTraceResult, write_atomic};

/// Read every input before writing anything; a bad input aborts the merge
/// with no output file.
pub fn merge_traces<P: AsRef<Path>>(inputs: &[P], output: &Path) -> KernTraceResult<PathBuf> {
    let mut all_events: Vec<serde_json::Value> = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        let events = read_event_array(input)?;
        tracing::debug!("{}: {} events", input.display(), events.len());
        all_events.extend(events);
    }

    let buf = to_json_array(&all_events)?;
    write_atomic(output, &buf)?;
    tracing::info!(
        "merged {} traces ({} events) into {}",
        inputs.len(),
        all_events.len(),
        output.display()
    );
    Ok(output.to_path_buf())
}

fn read_event_array(path: &Path) -> KernTraceResult<Vec<serde_json::Value>> {
    let bytes = std::fs::read(path).map_err(|e| KernTraceError::io_at(path, e))?;
    // Events stay opaque so traces from other tools merge unchanged.
    serde_json::from_slice(&bytes).map_err(|source| KernTraceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
