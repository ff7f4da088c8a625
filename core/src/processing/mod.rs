pub mod assembly;
pub mod discovery;
pub mod export;
pub mod interpolation;

pub use assembly::{AssembledRun, AssemblyStage};
pub use discovery::{DiscoveredSources, DiscoveryStage, SkippedSource, SourceTrace};
pub use export::{output_path, write_matrix, write_matrix_file};
pub use interpolation::{fill_wavelength_gaps, InterpolationReport, InterpolationStage};
