use anyhow::Context;
use dadcore::prelude::{EngineConfig, InterpolationMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default pause between project scans while watching.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    pub poll_interval_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .engine
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Command-line values win over file values.
    pub fn with_overrides(
        mut self,
        resolution: Option<f64>,
        interpolation: Option<InterpolationMode>,
        time_column: Option<String>,
    ) -> anyhow::Result<Self> {
        if let Some(resolution) = resolution {
            self.engine.resolution = resolution;
        }
        if let Some(interpolation) = interpolation {
            self.engine.interpolation = interpolation;
        }
        if let Some(time_column) = time_column {
            self.engine.time_column = time_column;
        }
        self.engine.validate().context("validating overrides")?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"resolution: 0.5\ninterpolation: linear\npoll_interval_ms: 2000\n")
            .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.engine.resolution, 0.5);
        assert_eq!(cfg.engine.interpolation, InterpolationMode::Linear);
        assert_eq!(cfg.engine.time_column, "time");
        assert_eq!(cfg.poll_interval_ms, 2000);
    }

    #[test]
    fn config_load_rejects_invalid_resolution() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"resolution: 0\n").unwrap();
        let path = temp.into_temp_path();
        assert!(WorkflowConfig::load(&path).is_err());
    }

    #[test]
    fn overrides_replace_file_values() {
        let cfg = WorkflowConfig::default()
            .with_overrides(Some(2.0), Some(InterpolationMode::Linear), Some("min".into()))
            .unwrap();
        assert_eq!(cfg.engine.resolution, 2.0);
        assert_eq!(cfg.engine.interpolation, InterpolationMode::Linear);
        assert_eq!(cfg.engine.time_column, "min");

        let untouched = WorkflowConfig::default().with_overrides(None, None, None).unwrap();
        assert_eq!(untouched, WorkflowConfig::default());
    }

    #[test]
    fn sub_tenth_resolution_override_is_rejected() {
        assert!(WorkflowConfig::default()
            .with_overrides(Some(1e-9), None, None)
            .is_err());
    }
}
