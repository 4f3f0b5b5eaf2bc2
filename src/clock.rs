//! GPU core clock resolution (MHz), used to turn cycle counts into time.
//!
//! Resolution walks an ordered list of [`ClockSource`]s and takes the first
//! positive reading:
//!
//! 1. `KERNTRACE_CLOCK_MHZ` environment override
//! 2. NVML telemetry (SM clock, then graphics clock; needs the `nvml` feature)
//! 3. `nvidia-smi --query-gpu=clocks.current.sm`, then `clocks.current.graphics`

use serde::{Deserialize, Serialize};

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use crate::{KernTraceError, KernTraceResult};

pub const CLOCK_ENV_VAR: &str = "KERNTRACE_CLOCK_MHZ";

/// A positive, finite clock frequency in MHz.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ClockRateMhz(f64);

impl ClockRateMhz {
    pub fn new(mhz: f64) -> KernTraceResult<Self> {
        if mhz.is_finite() && mhz > 0.0 {
            Ok(Self(mhz))
        } else {
            Err(KernTraceError::InvalidArgument(format!(
                "clock rate must be a positive number of MHz, got {mhz}"
            )))
        }
    }

    pub fn mhz(self) -> f64 {
        self.0
    }

    /// Cycles at this frequency, in microseconds.
    pub fn cycles_to_us(self, cycles: i64) -> f64 {
        cycles as f64 / self.0
    }
}

impl TryFrom<f64> for ClockRateMhz {
    type Error = KernTraceError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClockRateMhz> for f64 {
    fn from(value: ClockRateMhz) -> Self {
        value.0
    }
}

impl fmt::Display for ClockRateMhz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz", self.0)
    }
}

/// One way of reading the current clock. `None` means "no answer here, try
/// the next source".
pub trait ClockSource {
    fn name(&self) -> &'static str;
    fn query(&self, gpu_index: u32) -> Option<f64>;
}

pub struct EnvOverride {
    var: String,
}

impl EnvOverride {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl ClockSource for EnvOverride {
    fn name(&self) -> &'static str {
        "env"
    }

    fn query(&self, _gpu_index: u32) -> Option<f64> {
        let raw = std::env::var(&self.var).ok()?;
        match raw.trim().parse::<f64>() {
            Ok(mhz) => Some(mhz),
            Err(err) => {
                tracing::warn!("ignoring {}={raw:?}: {err}", self.var);
                None
            }
        }
    }
}

pub struct NvmlTelemetry;

impl ClockSource for NvmlTelemetry {
    fn name(&self) -> &'static str {
        "nvml"
    }

    #[cfg(feature = "nvml")]
    fn query(&self, gpu_index: u32) -> Option<f64> {
        use nvml_wrapper::Nvml;
        use nvml_wrapper::enum_wrappers::device::Clock;

        let nvml = match Nvml::init() {
            Ok(nvml) => nvml,
            Err(err) => {
                tracing::debug!("nvml init failed: {err}");
                return None;
            }
        };
        let device = match nvml.device_by_index(gpu_index) {
            Ok(device) => device,
            Err(err) => {
                tracing::debug!("nvml device {gpu_index} unavailable: {err}");
                return None;
            }
        };
        [Clock::SM, Clock::Graphics]
            .into_iter()
            .filter_map(|clock| device.clock_info(clock).ok())
            .find(|&mhz| mhz > 0)
            .map(f64::from)
    }

    #[cfg(not(feature = "nvml"))]
    fn query(&self, _gpu_index: u32) -> Option<f64> {
        tracing::debug!("built without the `nvml` feature; skipping telemetry");
        None
    }
}

/// Shells out to an `nvidia-smi` compatible tool.
pub struct SmiQuery {
    program: PathBuf,
}

pub const SMI_FIELDS: [&str; 2] = ["clocks.current.sm", "clocks.current.graphics"];

impl SmiQuery {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn query_field(&self, field: &str, gpu_index: u32) -> Option<f64> {
        let output = Command::new(&self.program)
            .arg(format!("--query-gpu={field}"))
            .arg("--format=csv,noheader,nounits")
            .output();
        let output = match output {
            Ok(o) if o.status.success() => o,
            Ok(o) => {
                tracing::debug!("{} exited with {} for {field}", self.program.display(), o.status);
                return None;
            }
            Err(err) => {
                tracing::debug!("failed to run {}: {err}", self.program.display());
                return None;
            }
        };
        parse_smi_output(&String::from_utf8_lossy(&output.stdout), gpu_index)
    }
}

impl ClockSource for SmiQuery {
    fn name(&self) -> &'static str {
        "smi"
    }

    fn query(&self, gpu_index: u32) -> Option<f64> {
        SMI_FIELDS
            .iter()
            .filter_map(|field| self.query_field(field, gpu_index))
            .find(|&mhz| mhz > 0.0)
    }
}

/// One value per GPU, one GPU per line.
pub fn parse_smi_output(stdout: &str, gpu_index: u32) -> Option<f64> {
    let line = stdout.trim().lines().nth(gpu_index as usize)?;
    line.trim().parse::<f64>().ok()
}

pub struct ClockRateResolver {
    sources: Vec<Box<dyn ClockSource>>,
}

impl ClockRateResolver {
    pub fn new(sources: Vec<Box<dyn ClockSource>>) -> Self {
        Self { sources }
    }

    /// Env override, NVML, then the given smi program.
    pub fn with_defaults(smi_program: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Box::new(EnvOverride::new(CLOCK_ENV_VAR)),
            Box::new(NvmlTelemetry),
            Box::new(SmiQuery::new(smi_program)),
        ])
    }

    pub fn resolve(&self, gpu_index: u32) -> KernTraceResult<ClockRateMhz> {
        for source in &self.sources {
            match source.query(gpu_index) {
                Some(mhz) if mhz.is_finite() && mhz > 0.0 => {
                    tracing::debug!("clock rate {mhz} MHz from {}", source.name());
                    return ClockRateMhz::new(mhz);
                }
                Some(mhz) => {
                    tracing::debug!("{} reported non-positive clock {mhz}", source.name());
                }
                None => tracing::debug!("{} gave no clock for gpu {gpu_index}", source.name()),
            }
        }
        Err(KernTraceError::ClockRateUnavailable { gpu_index })
    }
}

impl Default for ClockRateResolver {
    fn default() -> Self {
        Self::with_defaults("nvidia-smi")
    }
}
