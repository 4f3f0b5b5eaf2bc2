//! Single- and multi-worker timeline export.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::{ClockRateMhz, KernTraceResult, Schedule, WorkerRole, build_events, write_trace};

/// Export the timeline of one worker to `output`.
///
/// The role is checked before anything is built, and events are assembled in
/// memory before the file is written, so a failure leaves no output.
pub fn export_worker(
    schedule: &Schedule,
    worker: &str,
    output: &Path,
    clock: ClockRateMhz,
) -> KernTraceResult<PathBuf> {
    let role: WorkerRole = worker.parse()?;
    export_role(schedule, role, output, clock)
}

pub fn export_role(
    schedule: &Schedule,
    role: WorkerRole,
    output: &Path,
    clock: ClockRateMhz,
) -> KernTraceResult<PathBuf> {
    let events = build_events(&schedule.timings, &schedule.instructions, role, clock)?;
    let path = write_trace(&events, output)?;
    tracing::info!("exported {} {role} events to {}", events.len(), path.display());
    Ok(path)
}

pub fn worker_output_path(output_dir: &Path, role: WorkerRole) -> PathBuf {
    output_dir.join(format!("timeline_{role}.json"))
}

/// Export every known worker to `<output_dir>/timeline_<role>.json`.
///
/// A failing role is logged and left out of the result; it does not stop the
/// others.
pub fn export_all_workers(
    schedule: &Schedule,
    output_dir: &Path,
    clock: ClockRateMhz,
) -> BTreeMap<WorkerRole, PathBuf> {
    let mut results = BTreeMap::new();
    for role in WorkerRole::ALL {
        let output = worker_output_path(output_dir, role);
        match export_role(schedule, role, &output, clock) {
            Ok(path) => {
                results.insert(role, path);
            }
            Err(err) => tracing::warn!("failed to export {role}: {err}"),
        }
    }
    tracing::info!(
        "exported {} of {} workers",
        results.len(),
        WorkerRole::ALL.len()
    );
    results
}
