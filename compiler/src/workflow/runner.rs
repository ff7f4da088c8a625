use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use dadcore::telemetry::MetricsRecorder;
use dadcore::{
    compile_directory, is_result_directory, needs_compilation, Compilation, DirectoryListing,
    EngineConfig,
};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of one pass over a project directory.
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub compiled: Vec<PathBuf>,
    pub failed: Vec<ScanFailure>,
}

#[derive(Debug, Serialize)]
pub struct ScanFailure {
    pub result_dir: PathBuf,
    pub error: String,
}

/// Drives the engine for single result directories or whole projects.
#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.config.engine
    }

    pub fn compile(&self, result_dir: &Path) -> anyhow::Result<Compilation> {
        match compile_directory(result_dir, &self.config.engine) {
            Ok(compilation) => {
                self.metrics.record_compiled(
                    compilation.skipped.len(),
                    compilation.interpolation.inserted.len(),
                );
                Ok(compilation)
            }
            Err(err) => {
                self.metrics.record_failure();
                Err(err).with_context(|| format!("compiling {}", result_dir.display()))
            }
        }
    }

    /// Result directories directly under `project_dir` that are waiting for compilation.
    pub fn pending_result_dirs(&self, project_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();
        let entries = fs::read_dir(project_dir)
            .with_context(|| format!("listing project {}", project_dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("listing project {}", project_dir.display()))?;
            let is_candidate = entry.file_name().to_str().is_some_and(is_result_directory)
                && entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_candidate {
                candidates.push(entry.path());
            }
        }
        Ok(self.ready_dirs(candidates))
    }

    /// Candidates the readiness check accepts, sorted. A directory that cannot
    /// be listed is logged and left for the next pass.
    pub fn ready_dirs<I>(&self, candidates: I) -> Vec<PathBuf>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut ready = Vec::new();
        for path in candidates {
            match DirectoryListing::read(&path) {
                Ok(listing) => {
                    if needs_compilation(&listing, &self.config.engine) {
                        ready.push(path);
                    }
                }
                Err(err) => warn!("cannot list {}: {}", path.display(), err),
            }
        }
        ready.sort();
        ready
    }

    /// Compile every pending result directory once, one after another.
    pub fn scan(&self, project_dir: &Path) -> anyhow::Result<ScanReport> {
        let pending = self.pending_result_dirs(project_dir)?;
        Ok(self.compile_all(pending))
    }

    pub fn compile_all<I>(&self, result_dirs: I) -> ScanReport
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut report = ScanReport::default();
        for result_dir in result_dirs {
            info!("processing {}", result_dir.display());
            match self.compile(&result_dir) {
                Ok(compilation) => {
                    info!(
                        "3D DAD data created for {}",
                        compilation.prefix.trim_end()
                    );
                    report.compiled.push(result_dir);
                }
                Err(err) => {
                    warn!("{:#}", err);
                    report.failed.push(ScanFailure {
                        result_dir,
                        error: format!("{:#}", err),
                    });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{write_result_directory, GeneratorConfig};
    use tempfile::tempdir;

    fn generate(project: &Path, name: &str) -> PathBuf {
        let config = GeneratorConfig {
            name: name.into(),
            samples: 30,
            ..Default::default()
        };
        write_result_directory(project, &config, &WorkflowConfig::default().engine)
            .unwrap()
            .result_dir
    }

    #[test]
    fn runner_compiles_generated_run() {
        let project = tempdir().unwrap();
        let result_dir = generate(project.path(), "Run A");
        let runner = Runner::new(WorkflowConfig::default());

        let compilation = runner.compile(&result_dir).unwrap();
        assert_eq!(compilation.matrix.row_count(), 30);
        // 210..300 nm at 1 nm resolution.
        assert_eq!(compilation.matrix.column_count(), 91);
        assert!(result_dir.join("Run A 3D_UV_Data.csv").exists());
        assert_eq!(runner.metrics().snapshot().compiled, 1);
    }

    #[test]
    fn scan_compiles_each_pending_directory_once() {
        let project = tempdir().unwrap();
        generate(project.path(), "Run A");
        generate(project.path(), "Run B");
        fs::create_dir(project.path().join("Run C.sirslt")).unwrap();
        fs::create_dir(project.path().join("unrelated")).unwrap();
        let runner = Runner::new(WorkflowConfig::default());

        let first = runner.scan(project.path()).unwrap();
        assert_eq!(first.compiled.len(), 2);
        assert!(first.failed.is_empty());

        let second = runner.scan(project.path()).unwrap();
        assert!(second.compiled.is_empty());
        assert_eq!(runner.metrics().snapshot().compiled, 2);
    }

    #[test]
    fn scan_reports_failures_without_stopping() {
        let project = tempdir().unwrap();
        generate(project.path(), "Run A");
        let broken = project.path().join("Run B.sirslt");
        fs::create_dir_all(broken.join("Run B.rsltcsv")).unwrap();
        let runner = Runner::new(WorkflowConfig::default());

        let report = runner.scan(project.path()).unwrap();
        assert_eq!(report.compiled.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].result_dir, broken);
        assert_eq!(runner.metrics().snapshot().failed, 1);
    }

    #[test]
    fn unlistable_directory_does_not_hide_the_others() {
        let project = tempdir().unwrap();
        let ready = generate(project.path(), "Run A");
        let vanished = project.path().join("Gone.sirslt");
        let runner = Runner::new(WorkflowConfig::default());

        let pending = runner.ready_dirs(vec![vanished, ready.clone()]);
        assert_eq!(pending, vec![ready]);
    }
}
