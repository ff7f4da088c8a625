//! Assembly and interpolation engine for diode-array detector exports.
//!
//! A chromatography data system exports one CSV per detection wavelength.
//! The engine discovers those files inside a result directory, aligns them on
//! the shared time axis, fills wavelength gaps wider than the configured
//! resolution and writes a single time x wavelength table.

pub mod engine;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod readiness;
pub mod spectra;
pub mod telemetry;

pub use engine::{assemble_directory, compile_directory, Compilation, CompilationSummary};
pub use prelude::{EngineConfig, EngineError, EngineResult, InterpolationMode, ProcessingStage};
pub use readiness::{is_result_directory, needs_compilation, DirectoryListing};
pub use spectra::{SpectraMatrix, TimeAxis, Wavelength, WavelengthColumn};
