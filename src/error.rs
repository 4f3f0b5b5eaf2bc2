//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

pub type KernTraceResult<T> = Result<T, KernTraceError>;

#[derive(Debug, Error)]
pub enum KernTraceError {
    #[error("cannot detect clock rate for gpu {gpu_index} (telemetry and smi fallback both failed)")]
    ClockRateUnavailable { gpu_index: u32 },

    #[error("unknown worker {0:?} (available: {available})", available = crate::list_available_workers().join(", "))]
    UnknownWorker(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("io error at {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl KernTraceError {
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            source,
        }
    }
}
