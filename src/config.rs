//! `kerntrace.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::KernTraceResult;

pub const DEFAULT_CONFIG_PATH: &str = "kerntrace.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// GPU whose clock is queried when no rate is given.
    #[serde(default)]
    pub gpu_index: u32,

    /// Default directory for exported timelines.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Fixed clock rate in MHz; skips detection when set.
    #[serde(default)]
    pub clock_mhz: Option<f64>,

    /// `nvidia-smi` compatible tool used as the last clock source.
    #[serde(default = "default_smi_program")]
    pub smi_program: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_smi_program() -> PathBuf {
    PathBuf::from("nvidia-smi")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gpu_index: 0,
            output_dir: default_output_dir(),
            clock_mhz: None,
            smi_program: default_smi_program(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> KernTraceResult<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<Config>(&s)?)
    }

    pub fn load_optional(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("failed to load config {}: {err}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kerntrace-config-{name}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("kerntrace.toml");
        std::fs::write(&path, contents).expect("write");
        path
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = Config::load_optional(Path::new("/nonexistent/kerntrace.toml"));
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.output_dir, PathBuf::from("."));
        assert_eq!(cfg.gpu_index, 0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_file("partial", "gpu_index = 2\nclock_mhz = 1410.0\n");
        let cfg = Config::load_optional(&path);
        assert_eq!(cfg.gpu_index, 2);
        assert_eq!(cfg.clock_mhz, Some(1410.0));
        assert_eq!(cfg.smi_program, PathBuf::from("nvidia-smi"));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let path = temp_file("invalid", "gpu_index = \"zero\"\n");
        assert!(Config::load(&path).is_err());
        assert_eq!(Config::load_optional(&path), Config::default());
    }
}
