//! Entry points that run discovery, assembly and interpolation for one
//! result directory.
//!
//! Each call builds its matrix from scratch and blocks until done. Callers
//! must not run two compilations against the same directory at once.

use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::prelude::{EngineConfig, EngineResult, ProcessingStage};
use crate::processing::assembly::{AssembledRun, AssemblyStage};
use crate::processing::discovery::{DiscoveryStage, SkippedSource};
use crate::processing::export::{output_path, write_matrix_file};
use crate::processing::interpolation::{InterpolatedMatrix, InterpolationReport, InterpolationStage};
use crate::spectra::{SpectraMatrix, Wavelength};

/// Result of compiling one result directory.
#[derive(Debug)]
pub struct Compilation {
    pub result_dir: PathBuf,
    pub source_dir: PathBuf,
    pub prefix: String,
    pub matrix: SpectraMatrix,
    pub skipped: Vec<SkippedSource>,
    pub interpolation: InterpolationReport,
    /// Set once the matrix has been written.
    pub output_path: Option<PathBuf>,
}

impl Compilation {
    /// Write the matrix to `<result_dir>/<prefix><output_suffix>`.
    pub fn persist(&mut self, config: &EngineConfig) -> EngineResult<PathBuf> {
        let path = output_path(&self.result_dir, &self.prefix, &config.output_suffix);
        write_matrix_file(&self.matrix, &path)?;
        info!(
            "wrote {} rows x {} wavelengths to {}",
            self.matrix.row_count(),
            self.matrix.column_count(),
            path.display()
        );
        self.output_path = Some(path.clone());
        Ok(path)
    }

    pub fn summary(&self) -> CompilationSummary {
        let interpolated = self
            .matrix
            .columns()
            .iter()
            .filter(|c| !c.is_measured())
            .count();
        CompilationSummary {
            result_dir: self.result_dir.clone(),
            prefix: self.prefix.clone(),
            rows: self.matrix.row_count(),
            measured_columns: self.matrix.column_count() - interpolated,
            interpolated_columns: interpolated,
            wavelength_range: self
                .matrix
                .columns()
                .first()
                .zip(self.matrix.columns().last())
                .map(|(lo, hi)| (lo.wavelength, hi.wavelength)),
            inserted: self.interpolation.inserted.clone(),
            skipped: self
                .skipped
                .iter()
                .map(|s| SkippedSummary {
                    path: s.path.clone(),
                    reason: s.reason.to_string(),
                })
                .collect(),
            output_path: self.output_path.clone(),
        }
    }
}

/// Serializable overview of a [`Compilation`].
#[derive(Debug, Clone, Serialize)]
pub struct CompilationSummary {
    pub result_dir: PathBuf,
    pub prefix: String,
    pub rows: usize,
    pub measured_columns: usize,
    pub interpolated_columns: usize,
    pub wavelength_range: Option<(Wavelength, Wavelength)>,
    pub inserted: Vec<Wavelength>,
    pub skipped: Vec<SkippedSummary>,
    pub output_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSummary {
    pub path: PathBuf,
    pub reason: String,
}

/// Discover, assemble and interpolate without writing anything.
pub fn assemble_directory(result_dir: &Path, config: &EngineConfig) -> EngineResult<Compilation> {
    config.validate()?;

    let mut discovery = DiscoveryStage::new();
    discovery.initialize(config)?;
    let sources = discovery.execute(result_dir.to_path_buf());
    discovery.cleanup();

    let mut assembly = AssemblyStage::new();
    assembly.initialize(config)?;
    let AssembledRun {
        source_dir,
        prefix,
        matrix,
        skipped,
    } = assembly.execute(sources?)?;
    assembly.cleanup();

    let mut interpolation = InterpolationStage::new();
    interpolation.initialize(config)?;
    let InterpolatedMatrix { matrix, report } = interpolation.execute(matrix)?;
    interpolation.cleanup();

    info!(
        "assembled {}: {} samples, {} measured + {} interpolated wavelengths, {} skipped files",
        result_dir.display(),
        matrix.row_count(),
        matrix.column_count() - report.inserted.len(),
        report.inserted.len(),
        skipped.len()
    );

    Ok(Compilation {
        result_dir: result_dir.to_path_buf(),
        source_dir,
        prefix,
        matrix,
        skipped,
        interpolation: report,
        output_path: None,
    })
}

/// Assemble `result_dir` and write `<prefix>3D_UV_Data.csv` into it.
///
/// Use [`assemble_directory`] plus [`Compilation::persist`] to keep the
/// in-memory matrix when writing fails.
pub fn compile_directory(result_dir: &Path, config: &EngineConfig) -> EngineResult<Compilation> {
    let mut compilation = assemble_directory(result_dir, config)?;
    compilation.persist(config)?;
    Ok(compilation)
}
