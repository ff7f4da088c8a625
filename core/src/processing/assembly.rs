use std::path::PathBuf;

use log::debug;

use crate::prelude::{EngineConfig, EngineError, EngineResult, ProcessingStage, SourceError};
use crate::processing::discovery::{DiscoveredSources, SkippedSource};
use crate::spectra::{SpectraMatrix, Wavelength, WavelengthColumn};

/// Discovered traces merged into one matrix on the shared time axis.
#[derive(Debug)]
pub struct AssembledRun {
    pub source_dir: PathBuf,
    pub prefix: String,
    pub matrix: SpectraMatrix,
    pub skipped: Vec<SkippedSource>,
}

/// Keys each trace by its canonical wavelength. Column order stays in
/// discovery order; a later trace with the same wavelength replaces the
/// earlier one.
#[derive(Default)]
pub struct AssemblyStage {
    config: Option<EngineConfig>,
}

impl AssemblyStage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessingStage for AssemblyStage {
    type Input = DiscoveredSources;
    type Output = AssembledRun;

    fn initialize(&mut self, config: &EngineConfig) -> EngineResult<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, sources: DiscoveredSources) -> EngineResult<AssembledRun> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| EngineError::Internal("stage not initialized".into()))?;

        let DiscoveredSources {
            source_dir,
            prefix,
            time_axis,
            traces,
            mut skipped,
        } = sources;
        let mut matrix = SpectraMatrix::new(config.time_column.clone(), time_axis);

        for trace in traces {
            let wavelength: Wavelength = match trace.key.parse() {
                Ok(wavelength) => wavelength,
                Err(err) if config.fail_fast => return Err(err),
                Err(_) => {
                    skipped.push(SkippedSource::log(
                        trace.path,
                        SourceError::MalformedKey(trace.key),
                    ));
                    continue;
                }
            };

            match matrix.insert_column(WavelengthColumn::measured(wavelength, trace.values)) {
                Ok(Some(_)) => debug!(
                    "{} replaces an earlier {} nm column",
                    trace.path.display(),
                    wavelength
                ),
                Ok(None) => {}
                Err(EngineError::LengthMismatch {
                    expected, found, ..
                }) if !config.fail_fast => {
                    skipped.push(SkippedSource::log(
                        trace.path,
                        SourceError::LengthMismatch { expected, found },
                    ));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(AssembledRun {
            source_dir,
            prefix,
            matrix,
            skipped,
        })
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}
