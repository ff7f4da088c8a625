use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::Regex;

use crate::prelude::{EngineConfig, EngineError, EngineResult, ProcessingStage, SourceError};
use crate::spectra::TimeAxis;

/// File name of a single-wavelength export:
/// `<prefix>DAD<n> <wavelength>;<bandwidth> Ref <reference>.CSV`.
pub const SOURCE_FILE_PATTERN: &str = r"^(.*)DAD\d+ (\d+\.\d);\d+ Ref .*\.CSV$";

/// Parts of a file name that matched [`SOURCE_FILE_PATTERN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileMatch {
    pub prefix: String,
    pub wavelength_key: String,
}

#[derive(Debug, Clone)]
pub struct SourceFilePattern(Regex);

impl SourceFilePattern {
    pub fn new() -> EngineResult<Self> {
        Regex::new(SOURCE_FILE_PATTERN)
            .map(Self)
            .map_err(|e| EngineError::Internal(format!("compiling source file pattern: {e}")))
    }

    pub fn matches(&self, file_name: &str) -> Option<SourceFileMatch> {
        let captures = self.0.captures(file_name)?;
        Some(SourceFileMatch {
            prefix: captures[1].to_string(),
            wavelength_key: captures[2].to_string(),
        })
    }
}

/// Absorbance trace read from one export file, keyed by its raw wavelength text.
#[derive(Debug, Clone)]
pub struct SourceTrace {
    pub path: PathBuf,
    pub key: String,
    pub values: Vec<f64>,
}

/// A source file that contributed no column, and why.
#[derive(Debug)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: SourceError,
}

impl SkippedSource {
    pub(crate) fn log(path: PathBuf, reason: SourceError) -> Self {
        warn!("skipping {}: {}", path.display(), reason);
        Self { path, reason }
    }
}

/// Everything discovery extracts from one result directory, in traversal order.
#[derive(Debug)]
pub struct DiscoveredSources {
    pub source_dir: PathBuf,
    pub prefix: String,
    pub time_axis: TimeAxis,
    pub traces: Vec<SourceTrace>,
    pub skipped: Vec<SkippedSource>,
}

/// Columns read from one export file. `time` is empty unless requested.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrace {
    pub time: Vec<f64>,
    pub absorbance: Vec<f64>,
}

/// First sub-directory of `result_dir` (by name) whose name ends with `suffix`.
pub fn find_raw_data_dir(result_dir: &Path, suffix: &str) -> EngineResult<PathBuf> {
    let io_err = |source| EngineError::Io {
        path: result_dir.to_path_buf(),
        source,
    };
    let mut candidates = Vec::new();
    for entry in fs::read_dir(result_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let is_match = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(suffix));
        if is_match && entry.file_type().map_err(io_err)?.is_dir() {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    if candidates.len() > 1 {
        warn!(
            "{} '*{}' directories in {}, using {}",
            candidates.len(),
            suffix,
            result_dir.display(),
            candidates[0].display()
        );
    }
    candidates
        .into_iter()
        .next()
        .ok_or_else(|| EngineError::MissingSourceDirectory {
            dir: result_dir.to_path_buf(),
            suffix: suffix.to_string(),
        })
}

/// Read the second column (and the first, if `read_time`) of a headerless export.
pub fn read_trace(path: &Path, read_time: bool) -> Result<RawTrace, SourceError> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut time = Vec::new();
    let mut absorbance = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if read_time {
            time.push(parse_cell(&record, row, 0)?);
        }
        absorbance.push(parse_cell(&record, row, 1)?);
    }

    if absorbance.is_empty() {
        return Err(SourceError::Empty);
    }
    Ok(RawTrace { time, absorbance })
}

fn parse_cell(record: &csv::StringRecord, row: usize, column: usize) -> Result<f64, SourceError> {
    let value = record
        .get(column)
        .ok_or(SourceError::MissingColumn { row, column })?;
    value.parse().map_err(|_| SourceError::NotNumeric {
        row,
        value: value.to_string(),
    })
}

struct SourceCandidate {
    path: PathBuf,
    matched: SourceFileMatch,
}

/// Walk `dir` recursively: files in name order, then sub-directories in name order.
fn collect_candidates(
    dir: &Path,
    pattern: &SourceFilePattern,
    out: &mut Vec<SourceCandidate>,
) -> io::Result<()> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }
    files.sort();
    dirs.sort();

    for path in files {
        let matched = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| pattern.matches(name));
        if let Some(matched) = matched {
            out.push(SourceCandidate { path, matched });
        }
    }
    for sub_dir in dirs {
        collect_candidates(&sub_dir, pattern, out)?;
    }
    Ok(())
}

/// Locates the export files of a result directory and reads their traces.
#[derive(Default)]
pub struct DiscoveryStage {
    config: Option<EngineConfig>,
    pattern: Option<SourceFilePattern>,
}

impl DiscoveryStage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessingStage for DiscoveryStage {
    type Input = PathBuf;
    type Output = DiscoveredSources;

    fn initialize(&mut self, config: &EngineConfig) -> EngineResult<()> {
        self.config = Some(config.clone());
        self.pattern = Some(SourceFilePattern::new()?);
        Ok(())
    }

    fn execute(&mut self, result_dir: PathBuf) -> EngineResult<DiscoveredSources> {
        let (config, pattern) = match (&self.config, &self.pattern) {
            (Some(config), Some(pattern)) => (config, pattern),
            _ => return Err(EngineError::Internal("stage not initialized".into())),
        };

        let source_dir = find_raw_data_dir(&result_dir, &config.raw_dir_suffix)?;
        let mut candidates = Vec::new();
        collect_candidates(&source_dir, pattern, &mut candidates).map_err(|source| {
            EngineError::Io {
                path: source_dir.clone(),
                source,
            }
        })?;
        debug!(
            "{} per-wavelength files under {}",
            candidates.len(),
            source_dir.display()
        );

        let mut established: Option<(TimeAxis, String)> = None;
        let mut traces = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();

        for SourceCandidate { path, matched } in candidates {
            let read_time = established.is_none();
            let RawTrace { time, absorbance } = match read_trace(&path, read_time) {
                Ok(trace) => trace,
                Err(reason) if config.fail_fast => {
                    return Err(EngineError::UnreadableSourceFile { path, reason })
                }
                Err(reason) => {
                    skipped.push(SkippedSource::log(path, reason));
                    continue;
                }
            };

            match established.as_ref().map(|(axis, _)| axis.len()) {
                Some(expected) if expected != absorbance.len() => {
                    let reason = SourceError::LengthMismatch {
                        expected,
                        found: absorbance.len(),
                    };
                    if config.fail_fast {
                        return Err(EngineError::UnreadableSourceFile { path, reason });
                    }
                    skipped.push(SkippedSource::log(path, reason));
                    continue;
                }
                Some(_) => {}
                None => {
                    debug!(
                        "time axis of {} samples from {}",
                        time.len(),
                        path.display()
                    );
                    established = Some((TimeAxis::new(time), matched.prefix));
                }
            }

            debug!("matched {} nm in {}", matched.wavelength_key, path.display());
            traces.push(SourceTrace {
                path,
                key: matched.wavelength_key,
                values: absorbance,
            });
        }

        let (time_axis, prefix) = established.ok_or_else(|| EngineError::MissingTimeAxis {
            dir: source_dir.clone(),
        })?;

        Ok(DiscoveredSources {
            source_dir,
            prefix,
            time_axis,
            traces,
            skipped,
        })
    }

    fn cleanup(&mut self) {
        self.config = None;
        self.pattern = None;
    }
}
