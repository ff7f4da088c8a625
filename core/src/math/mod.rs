pub mod blend;
pub mod matrix;

pub use blend::BlendHelper;
pub use matrix::MatrixHelper;
