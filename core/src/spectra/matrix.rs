use ndarray::Array2;
use serde::Serialize;

use crate::math::matrix::MatrixHelper;
use crate::prelude::{EngineError, EngineResult};
use crate::spectra::wavelength::Wavelength;

/// Whether a column was read from an export file or synthesized by interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnOrigin {
    Measured,
    Interpolated,
}

/// Absorbance trace for one detection wavelength, one value per time sample.
#[derive(Debug, Clone, PartialEq)]
pub struct WavelengthColumn {
    pub wavelength: Wavelength,
    pub values: Vec<f64>,
    pub origin: ColumnOrigin,
}

impl WavelengthColumn {
    pub fn measured(wavelength: Wavelength, values: Vec<f64>) -> Self {
        Self {
            wavelength,
            values,
            origin: ColumnOrigin::Measured,
        }
    }

    pub fn interpolated(wavelength: Wavelength, values: Vec<f64>) -> Self {
        Self {
            wavelength,
            values,
            origin: ColumnOrigin::Interpolated,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_measured(&self) -> bool {
        self.origin == ColumnOrigin::Measured
    }
}

/// Sample timestamps shared by every column of one assembly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeAxis(Vec<f64>);

impl TimeAxis {
    pub fn new(samples: Vec<f64>) -> Self {
        Self(samples)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

/// Time axis plus wavelength columns keyed by unique [`Wavelength`] values.
///
/// Columns keep insertion order until [`SpectraMatrix::sort_columns`] runs.
/// Every column holds exactly `time_axis().len()` values.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectraMatrix {
    time_column: String,
    time: TimeAxis,
    columns: Vec<WavelengthColumn>,
}

impl SpectraMatrix {
    pub fn new(time_column: impl Into<String>, time: TimeAxis) -> Self {
        Self {
            time_column: time_column.into(),
            time,
            columns: Vec::new(),
        }
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn time_axis(&self) -> &TimeAxis {
        &self.time
    }

    pub fn row_count(&self) -> usize {
        self.time.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[WavelengthColumn] {
        &self.columns
    }

    pub fn column(&self, wavelength: Wavelength) -> Option<&WavelengthColumn> {
        self.columns.iter().find(|c| c.wavelength == wavelength)
    }

    pub fn contains(&self, wavelength: Wavelength) -> bool {
        self.column(wavelength).is_some()
    }

    /// Wavelengths in current column order.
    pub fn wavelengths(&self) -> Vec<Wavelength> {
        self.columns.iter().map(|c| c.wavelength).collect()
    }

    /// Insert a column, replacing any column with the same wavelength in place.
    ///
    /// Returns the replaced column, if any.
    pub fn insert_column(
        &mut self,
        column: WavelengthColumn,
    ) -> EngineResult<Option<WavelengthColumn>> {
        if column.len() != self.row_count() {
            return Err(EngineError::LengthMismatch {
                key: column.wavelength.key(),
                expected: self.row_count(),
                found: column.len(),
            });
        }
        match self
            .columns
            .iter_mut()
            .find(|c| c.wavelength == column.wavelength)
        {
            Some(slot) => Ok(Some(std::mem::replace(slot, column))),
            None => {
                self.columns.push(column);
                Ok(None)
            }
        }
    }

    /// Order wavelength columns ascending.
    pub fn sort_columns(&mut self) {
        self.columns.sort_by_key(|c| c.wavelength);
    }

    pub fn is_sorted(&self) -> bool {
        self.columns
            .windows(2)
            .all(|pair| pair[0].wavelength < pair[1].wavelength)
    }

    /// Output header: the time column name followed by each wavelength key.
    pub fn header(&self) -> Vec<String> {
        std::iter::once(self.time_column.clone())
            .chain(self.columns.iter().map(|c| c.wavelength.key()))
            .collect()
    }

    /// The time value followed by every column's value at `index`.
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        let time = *self.time.values().get(index)?;
        let mut row = Vec::with_capacity(self.columns.len() + 1);
        row.push(time);
        row.extend(self.columns.iter().map(|c| c.values[index]));
        Some(row)
    }

    /// Dense `time samples x wavelengths` absorbance array, in column order.
    pub fn to_array(&self) -> Array2<f64> {
        let columns: Vec<&[f64]> = self.columns.iter().map(|c| c.values.as_slice()).collect();
        MatrixHelper::column_stack(&columns, self.row_count())
    }
}
