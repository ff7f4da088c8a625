use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default maximum spacing (nm) between adjacent wavelength columns.
pub const DEFAULT_RESOLUTION: f64 = 1.0;
/// Finest usable resolution (nm); wavelength keys are stored in tenths.
pub const MIN_RESOLUTION: f64 = 0.1;
/// Directory tag of a per-run result directory.
pub const RESULT_DIR_SUFFIX: &str = ".sirslt";
/// Directory tag of the exported per-wavelength CSV files.
pub const RAW_DATA_DIR_SUFFIX: &str = ".rsltcsv";
/// Suffix appended to the run prefix to name the compiled table.
pub const OUTPUT_FILE_SUFFIX: &str = "3D_UV_Data.csv";
/// Header of the leading time column in the compiled table.
pub const DEFAULT_TIME_COLUMN: &str = "time";

/// How synthetic columns are valued when a wavelength gap is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// Every inserted column is the mean of the two bounding columns.
    #[default]
    Midpoint,
    /// Inserted columns are weighted by their distance to each bounding column.
    Linear,
}

/// Configuration shared by every stage of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub resolution: f64,
    pub interpolation: InterpolationMode,
    pub time_column: String,
    pub raw_dir_suffix: String,
    pub output_suffix: String,
    /// Abort on the first unreadable source file or malformed key instead of skipping it.
    pub fail_fast: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            interpolation: InterpolationMode::Midpoint,
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            raw_dir_suffix: RAW_DATA_DIR_SUFFIX.to_string(),
            output_suffix: OUTPUT_FILE_SUFFIX.to_string(),
            fail_fast: false,
        }
    }
}

impl EngineConfig {
    pub fn with_resolution(resolution: f64) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        check_resolution(self.resolution)?;
        if self.time_column.is_empty() {
            return Err(EngineError::InvalidConfig(
                "time column name must not be empty".into(),
            ));
        }
        if self.raw_dir_suffix.is_empty() || self.output_suffix.is_empty() {
            return Err(EngineError::InvalidConfig(
                "directory and output suffixes must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Resolutions finer than [`MIN_RESOLUTION`] cannot produce distinct keys.
pub(crate) fn check_resolution(resolution: f64) -> EngineResult<()> {
    if !resolution.is_finite() || resolution < MIN_RESOLUTION {
        return Err(EngineError::InvalidConfig(format!(
            "resolution must be a finite number of nanometers no smaller than {MIN_RESOLUTION}, got {resolution}"
        )));
    }
    Ok(())
}

/// Why a single source file did not contribute a column.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: missing column {column}")]
    MissingColumn { row: usize, column: usize },
    #[error("row {row}: '{value}' is not a number")]
    NotNumeric { row: usize, value: String },
    #[error("file holds no data rows")]
    Empty,
    #[error("expected {expected} samples, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("malformed wavelength key '{0}'")]
    MalformedKey(String),
}

/// Common error type for engine execution.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("no '*{suffix}' sub-directory in {}", dir.display())]
    MissingSourceDirectory { dir: PathBuf, suffix: String },
    #[error("no readable per-wavelength file in {} to establish a time axis", dir.display())]
    MissingTimeAxis { dir: PathBuf },
    #[error("unreadable source file {}: {reason}", path.display())]
    UnreadableSourceFile {
        path: PathBuf,
        #[source]
        reason: SourceError,
    },
    #[error("malformed wavelength key '{0}'")]
    MalformedWavelengthKey(String),
    #[error("column {key} holds {found} values, time axis holds {expected}")]
    LengthMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A single step of the compile pipeline.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, config: &EngineConfig) -> EngineResult<()>;
    fn execute(&mut self, input: Self::Input) -> EngineResult<Self::Output>;
    fn cleanup(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.resolution, 1.0);
        assert_eq!(config.interpolation, InterpolationMode::Midpoint);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_positive_resolution_is_rejected() {
        for resolution in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = EngineConfig::with_resolution(resolution);
            assert!(matches!(
                config.validate(),
                Err(EngineError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn resolution_finer_than_a_tenth_is_rejected() {
        for resolution in [0.05, 1e-5, 1e-300] {
            let config = EngineConfig::with_resolution(resolution);
            assert!(
                matches!(config.validate(), Err(EngineError::InvalidConfig(_))),
                "{resolution} should be rejected"
            );
        }
        assert!(EngineConfig::with_resolution(MIN_RESOLUTION).validate().is_ok());
    }
}
