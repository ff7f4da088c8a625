use std::io;
use std::path::{Path, PathBuf};

use crate::prelude::{EngineError, EngineResult};
use crate::spectra::SpectraMatrix;

/// `<result_dir>/<prefix><suffix>`, e.g. `Run 1 3D_UV_Data.csv`.
pub fn output_path(result_dir: &Path, prefix: &str, suffix: &str) -> PathBuf {
    result_dir.join(format!("{prefix}{suffix}"))
}

/// Shortest round-trip decimal form, always with a fractional part (`2.0`, `0.125`).
fn format_value(value: f64) -> String {
    format!("{value:?}")
}

/// Write the header row and one row per time sample, in current column order.
pub fn write_matrix<W: io::Write>(matrix: &SpectraMatrix, writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(matrix.header())?;

    for (row, time) in matrix.time_axis().values().iter().enumerate() {
        let cells = std::iter::once(format_value(*time)).chain(
            matrix
                .columns()
                .iter()
                .map(|column| format_value(column.values[row])),
        );
        writer.write_record(cells)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_matrix_file(matrix: &SpectraMatrix, path: &Path) -> EngineResult<()> {
    let output_error = |source: csv::Error| EngineError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(|e| output_error(e.into()))?;
    write_matrix(matrix, io::BufWriter::new(file)).map_err(output_error)
}
