//! Timeline CLI commands (`kerntrace export|export-all|merge|workers|clock`).

use clap::Subcommand;
use serde::Serialize;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{
    ClockRateMhz, ClockRateResolver, Config, EventSlots, KernTraceResult, Schedule, WorkerRole,
    expand_inputs, export_all_workers, export_worker, known_opcodes, merge_traces,
};

#[derive(Debug, Subcommand)]
pub enum TraceCommand {
    /// Export one worker's timeline as Chrome/Perfetto trace JSON.
    Export {
        /// Schedule dump with `timings` and `instructions` tensors.
        #[arg(long)]
        schedule: PathBuf,
        #[arg(long, default_value = "consumer")]
        worker: String,
        #[arg(long, default_value = "timeline.json")]
        out: PathBuf,
        #[command(flatten)]
        clock: ClockArgs,
    },
    /// Export every worker to `<out-dir>/timeline_<worker>.json`.
    ExportAll {
        #[arg(long)]
        schedule: PathBuf,
        /// Defaults to `output_dir` from the config.
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        clock: ClockArgs,
    },
    /// Concatenate trace files (paths or glob patterns) into one.
    Merge {
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<String>,
        #[arg(long, default_value = "merged_trace.json")]
        out: PathBuf,
    },
    /// List worker roles, their event slots and known opcodes.
    Workers,
    /// Resolve the GPU clock rate.
    Clock {
        #[arg(long)]
        gpu_index: Option<u32>,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct ClockArgs {
    /// Clock rate in MHz; detected from the GPU when omitted.
    #[arg(long)]
    pub clock_mhz: Option<f64>,
    #[arg(long)]
    pub gpu_index: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WorkerInfo {
    name: WorkerRole,
    slots: EventSlots,
}

#[derive(Debug, Serialize)]
struct OpcodeInfo {
    opcode: i64,
    operation: &'static str,
}

#[derive(Debug, Serialize)]
struct ExportAllOutput {
    clock_mhz: ClockRateMhz,
    exported: BTreeMap<WorkerRole, PathBuf>,
    failed: Vec<WorkerRole>,
}

pub fn trace_command(config: &Config, command: &TraceCommand) -> KernTraceResult<serde_json::Value> {
    match command {
        TraceCommand::Export {
            schedule,
            worker,
            out,
            clock,
        } => {
            // Reject unknown roles before touching the GPU or the schedule.
            let role: WorkerRole = worker.parse()?;
            let clock = resolve_clock(config, clock)?;
            let schedule = Schedule::read_json(schedule)?;
            let path = export_worker(&schedule, role.as_str(), out, clock)?;
            Ok(serde_json::json!({
                "worker": role,
                "clock_mhz": clock,
                "output": path,
            }))
        }

        TraceCommand::ExportAll {
            schedule,
            out_dir,
            clock,
        } => {
            let clock = resolve_clock(config, clock)?;
            let schedule = Schedule::read_json(schedule)?;
            let out_dir = out_dir.as_ref().unwrap_or(&config.output_dir);
            let exported = export_all_workers(&schedule, out_dir, clock);
            let failed = WorkerRole::ALL
                .into_iter()
                .filter(|r| !exported.contains_key(r))
                .collect();
            Ok(serde_json::to_value(ExportAllOutput {
                clock_mhz: clock,
                exported,
                failed,
            })?)
        }

        TraceCommand::Merge { inputs, out } => {
            let paths = expand_inputs(inputs)?;
            let path = merge_traces(&paths, out)?;
            Ok(serde_json::json!({
                "inputs": paths,
                "output": path,
            }))
        }

        TraceCommand::Workers => {
            let workers: Vec<WorkerInfo> = WorkerRole::ALL
                .into_iter()
                .map(|role| WorkerInfo {
                    name: role,
                    slots: role.slots(),
                })
                .collect();
            let opcodes: Vec<OpcodeInfo> = known_opcodes()
                .map(|(opcode, operation)| OpcodeInfo { opcode, operation })
                .collect();
            Ok(serde_json::json!({
                "workers": workers,
                "opcodes": opcodes,
            }))
        }

        TraceCommand::Clock { gpu_index } => {
            let gpu_index = gpu_index.unwrap_or(config.gpu_index);
            let clock = ClockRateResolver::with_defaults(&config.smi_program).resolve(gpu_index)?;
            Ok(serde_json::json!({
                "gpu_index": gpu_index,
                "clock_mhz": clock,
            }))
        }
    }
}

/// `--clock-mhz`, then the config's `clock_mhz`, then detection.
fn resolve_clock(config: &Config, args: &ClockArgs) -> KernTraceResult<ClockRateMhz> {
    if let Some(mhz) = args.clock_mhz.or(config.clock_mhz) {
        return ClockRateMhz::new(mhz);
    }
    let gpu_index = args.gpu_index.unwrap_or(config.gpu_index);
    let clock = ClockRateResolver::with_defaults(&config.smi_program).resolve(gpu_index)?;
    tracing::info!("detected clock rate {clock} on gpu {gpu_index}");
    Ok(clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KernTraceError, Tensor3};
    use uuid::Uuid;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kerntrace-cmd-{name}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    fn write_schedule(dir: &std::path::Path) -> PathBuf {
        let mut timings = Tensor3::zeros([1, 2, 13]);
        timings.set(0, 0, 0, 5).expect("start");
        timings.set(0, 0, 4, 15).expect("end");
        timings.set(0, 1, 11, 100).expect("start");
        timings.set(0, 1, 12, 300).expect("end");
        let mut instructions = Tensor3::zeros([1, 2, 1]);
        instructions.set(0, 0, 0, 3).expect("opcode");
        let path = dir.join("schedule.json");
        let bytes = serde_json::to_vec(&Schedule::new(timings, instructions)).expect("json");
        std::fs::write(&path, bytes).expect("write");
        path
    }

    fn fixed_clock(mhz: f64) -> ClockArgs {
        ClockArgs {
            clock_mhz: Some(mhz),
            gpu_index: None,
        }
    }

    #[test]
    fn export_then_merge_through_commands() {
        let dir = temp_dir("flow");
        let schedule = write_schedule(&dir);
        let config = Config::default();

        let out = trace_command(
            &config,
            &TraceCommand::ExportAll {
                schedule,
                out_dir: Some(dir.clone()),
                clock: fixed_clock(10.0),
            },
        )
        .expect("export-all");
        assert_eq!(out["clock_mhz"], 10.0);
        assert_eq!(out["exported"].as_object().expect("map").len(), 5);
        assert_eq!(out["failed"], serde_json::json!([]));

        let merged = dir.join("merged.json");
        trace_command(
            &config,
            &TraceCommand::Merge {
                inputs: vec![format!("{}/timeline_*.json", dir.display())],
                out: merged.clone(),
            },
        )
        .expect("merge");
        let events = crate::read_trace(&merged).expect("read");
        // Sorted glob order puts consumer before controller.
        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Op0:consumer", "AttentionReduction:controller"]);
        assert_eq!(events[1].ts, 0.5);
        assert_eq!(events[1].dur, 1.0);
    }

    #[test]
    fn export_rejects_unknown_worker_before_reading_schedule() {
        let dir = temp_dir("unknown");
        let out = dir.join("timeline.json");
        let err = trace_command(
            &Config::default(),
            &TraceCommand::Export {
                schedule: dir.join("missing.json"),
                worker: "gpu_core".to_string(),
                out: out.clone(),
                clock: fixed_clock(1800.0),
            },
        )
        .expect_err("unknown worker");
        assert!(matches!(err, KernTraceError::UnknownWorker(_)));
        assert!(!out.exists());
    }

    #[test]
    fn config_clock_is_used_when_flag_is_absent() {
        let config = Config {
            clock_mhz: Some(1500.0),
            ..Config::default()
        };
        let args = ClockArgs {
            clock_mhz: None,
            gpu_index: None,
        };
        assert_eq!(resolve_clock(&config, &args).expect("clock").mhz(), 1500.0);
        assert_eq!(resolve_clock(&config, &fixed_clock(900.0)).expect("clock").mhz(), 900.0);
        assert!(resolve_clock(&config, &fixed_clock(0.0)).is_err());
    }

    #[test]
    fn workers_lists_registry_in_order() {
        let out = trace_command(&Config::default(), &TraceCommand::Workers).expect("workers");
        assert_eq!(out["workers"][0]["name"], "controller");
        assert_eq!(out["workers"][4]["slots"], serde_json::json!({"start": 11, "end": 12}));
        assert_eq!(out["opcodes"][2]["operation"], "AttentionReduction");
    }
}
