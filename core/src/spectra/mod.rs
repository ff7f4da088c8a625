pub mod matrix;
pub mod wavelength;

pub use matrix::{ColumnOrigin, SpectraMatrix, TimeAxis, WavelengthColumn};
pub use wavelength::Wavelength;
