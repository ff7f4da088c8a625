use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::math::blend::BlendHelper;
use crate::prelude::{
    check_resolution, EngineConfig, EngineError, EngineResult, InterpolationMode, ProcessingStage,
};
use crate::spectra::{SpectraMatrix, Wavelength, WavelengthColumn};

/// Absorbs floating point noise when a gap is an exact multiple of the resolution.
const GAP_TOLERANCE: f64 = 1e-9;

/// What a gap-filling pass inserted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterpolationReport {
    pub gaps_filled: usize,
    pub inserted: Vec<Wavelength>,
}

/// Insert synthetic columns so that no two adjacent wavelengths are more than
/// `resolution` nm apart, then sort every wavelength column ascending.
///
/// A gap of `g` nm receives `floor(g / resolution) - 1` columns at
/// `current + k * resolution`. Only columns already present in `matrix` act
/// as endpoints, and a synthetic wavelength that is already present is left
/// alone.
pub fn fill_wavelength_gaps(
    matrix: &mut SpectraMatrix,
    resolution: f64,
    mode: InterpolationMode,
) -> EngineResult<InterpolationReport> {
    check_resolution(resolution)?;

    let mut keys = matrix.wavelengths();
    keys.sort();

    let mut report = InterpolationReport::default();
    let mut pending: Vec<WavelengthColumn> = Vec::new();
    let mut pending_keys: HashSet<Wavelength> = HashSet::new();

    for pair in keys.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let gap = next.nm() - current.nm();
        if gap <= resolution + GAP_TOLERANCE {
            continue;
        }

        let (Some(lower), Some(upper)) = (matrix.column(current), matrix.column(next)) else {
            continue;
        };

        // No more than one synthetic key fits in each tenth between the bounds.
        let free_keys = next.tenths() - current.tenths() - 1;
        let missing_count = (((gap / resolution) + GAP_TOLERANCE).floor() as usize - 1)
            .min(free_keys as usize);
        let mut filled = false;
        for step in 1..=missing_count {
            let missing = Wavelength::from_nm(current.nm() + step as f64 * resolution)?;
            if missing <= current || missing >= next || !pending_keys.insert(missing) {
                continue;
            }

            let values = match mode {
                InterpolationMode::Midpoint => BlendHelper::midpoint(&lower.values, &upper.values),
                InterpolationMode::Linear => {
                    let fraction = (missing.nm() - current.nm()) / gap;
                    BlendHelper::linear(&lower.values, &upper.values, fraction)
                }
            };
            pending.push(WavelengthColumn::interpolated(missing, values));
            filled = true;
        }

        if filled {
            debug!("filled {current}..{next} nm gap of {gap:.1} nm");
            report.gaps_filled += 1;
        }
    }

    for column in pending {
        report.inserted.push(column.wavelength);
        matrix.insert_column(column)?;
    }
    report.inserted.sort();
    matrix.sort_columns();

    Ok(report)
}

/// Matrix after gap filling, with the report of what was inserted.
#[derive(Debug)]
pub struct InterpolatedMatrix {
    pub matrix: SpectraMatrix,
    pub report: InterpolationReport,
}

#[derive(Default)]
pub struct InterpolationStage {
    config: Option<EngineConfig>,
}

impl InterpolationStage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessingStage for InterpolationStage {
    type Input = SpectraMatrix;
    type Output = InterpolatedMatrix;

    fn initialize(&mut self, config: &EngineConfig) -> EngineResult<()> {
        config.validate()?;
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, mut matrix: SpectraMatrix) -> EngineResult<InterpolatedMatrix> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| EngineError::Internal("stage not initialized".into()))?;

        let report = fill_wavelength_gaps(&mut matrix, config.resolution, config.interpolation)?;
        Ok(InterpolatedMatrix { matrix, report })
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectra::TimeAxis;

    fn wl(nm: f64) -> Wavelength {
        Wavelength::from_nm(nm).unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{actual:?} != {expected:?}");
        }
    }

    fn matrix(columns: &[(f64, [f64; 3])]) -> SpectraMatrix {
        let mut matrix = SpectraMatrix::new("time", TimeAxis::new(vec![0.0, 1.0, 2.0]));
        for (nm, values) in columns {
            matrix
                .insert_column(WavelengthColumn::measured(wl(*nm), values.to_vec()))
                .unwrap();
        }
        matrix
    }

    #[test]
    fn three_nm_gap_gets_two_midpoint_columns() {
        let mut m = matrix(&[(280.0, [1.0, 2.0, 3.0]), (283.0, [4.0, 5.0, 6.0])]);
        let report = fill_wavelength_gaps(&mut m, 1.0, InterpolationMode::Midpoint).unwrap();

        assert_eq!(m.header(), vec!["time", "280.0", "281.0", "282.0", "283.0"]);
        assert_eq!(m.column(wl(281.0)).unwrap().values, vec![2.5, 3.5, 4.5]);
        assert_eq!(m.column(wl(282.0)).unwrap().values, vec![2.5, 3.5, 4.5]);
        assert!(!m.column(wl(281.0)).unwrap().is_measured());
        assert_eq!(report.gaps_filled, 1);
        assert_eq!(report.inserted, vec![wl(281.0), wl(282.0)]);
    }

    #[test]
    fn linear_mode_weights_by_distance() {
        let mut m = matrix(&[(280.0, [1.0, 2.0, 3.0]), (283.0, [4.0, 5.0, 6.0])]);
        fill_wavelength_gaps(&mut m, 1.0, InterpolationMode::Linear).unwrap();

        assert_close(&m.column(wl(281.0)).unwrap().values, &[2.0, 3.0, 4.0]);
        assert_close(&m.column(wl(282.0)).unwrap().values, &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn inserted_count_follows_floor_rule() {
        // 2.5 nm gap at 1 nm resolution: floor(2.5) - 1 = 1 column.
        let mut m = matrix(&[(250.0, [0.0; 3]), (252.5, [1.0; 3])]);
        let report = fill_wavelength_gaps(&mut m, 1.0, InterpolationMode::Midpoint).unwrap();
        assert_eq!(report.inserted, vec![wl(251.0)]);

        // 10 nm gap at 2 nm resolution: 4 columns.
        let mut m = matrix(&[(200.0, [0.0; 3]), (210.0, [1.0; 3])]);
        let report = fill_wavelength_gaps(&mut m, 2.0, InterpolationMode::Midpoint).unwrap();
        assert_eq!(
            report.inserted,
            vec![wl(202.0), wl(204.0), wl(206.0), wl(208.0)]
        );
    }

    #[test]
    fn exact_multiple_in_tenths_is_not_lost_to_rounding() {
        let mut m = matrix(&[(250.1, [0.0; 3]), (250.4, [3.0; 3])]);
        let report = fill_wavelength_gaps(&mut m, 0.1, InterpolationMode::Midpoint).unwrap();
        assert_eq!(report.inserted, vec![wl(250.2), wl(250.3)]);
    }

    #[test]
    fn small_gaps_only_sort_columns() {
        let mut m = matrix(&[
            (282.0, [3.0; 3]),
            (280.0, [1.0; 3]),
            (281.0, [2.0; 3]),
        ]);
        let before = m.clone();
        let report = fill_wavelength_gaps(&mut m, 1.0, InterpolationMode::Midpoint).unwrap();

        assert_eq!(report, InterpolationReport::default());
        assert_eq!(m.column_count(), before.column_count());
        assert_eq!(m.header(), vec!["time", "280.0", "281.0", "282.0"]);
        for column in before.columns() {
            assert_eq!(m.column(column.wavelength), Some(column));
        }
    }

    #[test]
    fn second_pass_changes_nothing() {
        let mut m = matrix(&[
            (230.0, [0.5, 0.4, 0.3]),
            (254.0, [1.0, 2.0, 3.0]),
            (256.5, [4.0, 5.0, 6.0]),
            (280.0, [0.1, 0.1, 0.1]),
        ]);
        fill_wavelength_gaps(&mut m, 1.0, InterpolationMode::Midpoint).unwrap();
        let once = m.clone();

        let report = fill_wavelength_gaps(&mut m, 1.0, InterpolationMode::Midpoint).unwrap();
        assert!(report.inserted.is_empty());
        assert_eq!(m, once);
    }

    #[test]
    fn every_column_matches_time_axis_length() {
        let mut m = matrix(&[(200.0, [1.0, 2.0, 3.0]), (220.0, [3.0, 2.0, 1.0])]);
        fill_wavelength_gaps(&mut m, 1.0, InterpolationMode::Linear).unwrap();

        assert_eq!(m.column_count(), 21);
        assert!(m.is_sorted());
        assert!(m.columns().iter().all(|c| c.len() == m.row_count()));
    }

    #[test]
    fn invalid_resolution_is_rejected() {
        let mut m = matrix(&[(280.0, [0.0; 3])]);
        let err = fill_wavelength_gaps(&mut m, 0.0, InterpolationMode::Midpoint).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn resolution_finer_than_key_precision_is_rejected() {
        let mut m = matrix(&[(200.0, [0.0; 3]), (400.0, [1.0; 3])]);
        for resolution in [0.05, 1e-5, 1e-300] {
            let err = fill_wavelength_gaps(&mut m, resolution, InterpolationMode::Midpoint)
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidConfig(_)));
        }
        assert_eq!(m.column_count(), 2);
    }

    #[test]
    fn finest_resolution_fills_every_tenth_once() {
        let mut m = matrix(&[(200.0, [0.0; 3]), (400.0, [2.0; 3])]);
        let report = fill_wavelength_gaps(&mut m, 0.1, InterpolationMode::Midpoint).unwrap();

        assert_eq!(report.gaps_filled, 1);
        assert_eq!(report.inserted.len(), 1999);
        assert_eq!(report.inserted.first(), Some(&wl(200.1)));
        assert_eq!(report.inserted.last(), Some(&wl(399.9)));
        assert_eq!(m.column_count(), 2001);
        assert!(m.is_sorted());
    }

    #[test]
    fn stage_uses_configured_resolution_and_mode() {
        let mut stage = InterpolationStage::new();
        let config = EngineConfig {
            resolution: 1.5,
            interpolation: InterpolationMode::Linear,
            ..Default::default()
        };
        stage.initialize(&config).unwrap();
        let output = stage
            .execute(matrix(&[(280.0, [0.0; 3]), (283.0, [3.0; 3])]))
            .unwrap();
        stage.cleanup();

        assert_eq!(output.report.inserted, vec![wl(281.5)]);
        assert_eq!(output.matrix.column(wl(281.5)).unwrap().values, vec![1.5; 3]);
    }
}
