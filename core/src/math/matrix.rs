use ndarray::Array2;

pub struct MatrixHelper;

impl MatrixHelper {
    /// Stack equally long columns side by side into a `rows x columns` array.
    ///
    /// Missing cells (a column shorter than `rows`) are filled with NaN.
    pub fn column_stack(columns: &[&[f64]], rows: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, columns.len()), |(row, col)| {
            columns[col].get(row).copied().unwrap_or(f64::NAN)
        })
    }
}
