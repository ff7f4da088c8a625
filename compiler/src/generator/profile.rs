use anyhow::Context;
use dadcore::prelude::{EngineConfig, RESULT_DIR_SUFFIX};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One eluting compound: a gaussian peak in time with a gaussian absorbance band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compound {
    pub retention_min: f64,
    pub peak_width_min: f64,
    pub lambda_max_nm: f64,
    pub band_width_nm: f64,
    pub amplitude: f64,
}

/// Configuration for writing a synthetic result directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub name: String,
    pub wavelengths: Vec<f64>,
    pub samples: usize,
    pub time_step_min: f64,
    pub noise: f64,
    pub seed: u64,
    pub compounds: Vec<Compound>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: "Sample".into(),
            wavelengths: vec![210.0, 230.0, 254.0, 260.0, 280.0, 300.0],
            samples: 600,
            time_step_min: 0.01,
            noise: 0.002,
            seed: 0,
            compounds: vec![
                Compound {
                    retention_min: 1.2,
                    peak_width_min: 0.05,
                    lambda_max_nm: 254.0,
                    band_width_nm: 15.0,
                    amplitude: 0.8,
                },
                Compound {
                    retention_min: 3.4,
                    peak_width_min: 0.08,
                    lambda_max_nm: 280.0,
                    band_width_nm: 20.0,
                    amplitude: 0.5,
                },
            ],
        }
    }
}

/// Paths written by [`write_result_directory`].
#[derive(Debug, Clone)]
pub struct GeneratedRun {
    pub result_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub files: Vec<PathBuf>,
}

fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Export file name in the layout the data system produces.
pub fn export_file_name(prefix: &str, wavelength: f64) -> String {
    format!("{prefix}DAD1 {wavelength:.1};4 Ref 360.0;100.CSV")
}

fn build_trace(config: &GeneratorConfig, wavelength: f64, rng: &mut StdRng) -> Vec<(f64, f64)> {
    (0..config.samples)
        .map(|index| {
            let time = index as f64 * config.time_step_min;
            let signal: f64 = config
                .compounds
                .iter()
                .map(|c| {
                    c.amplitude
                        * gaussian(time, c.retention_min, c.peak_width_min)
                        * gaussian(wavelength, c.lambda_max_nm, c.band_width_nm)
                })
                .sum();
            let jitter = if config.noise > 0.0 {
                rng.gen_range(-config.noise..config.noise)
            } else {
                0.0
            };
            (time, signal + jitter)
        })
        .collect()
}

/// Write `<out_dir>/<name>.sirslt/<name>.rsltcsv/` with one export per wavelength.
pub fn write_result_directory(
    out_dir: &Path,
    config: &GeneratorConfig,
    engine: &EngineConfig,
) -> anyhow::Result<GeneratedRun> {
    let result_dir = out_dir.join(format!("{}{RESULT_DIR_SUFFIX}", config.name));
    let raw_dir = result_dir.join(format!("{}{}", config.name, engine.raw_dir_suffix));
    fs::create_dir_all(&raw_dir)
        .with_context(|| format!("creating {}", raw_dir.display()))?;

    let prefix = format!("{} ", config.name);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut files = Vec::with_capacity(config.wavelengths.len());

    for &wavelength in &config.wavelengths {
        let path = raw_dir.join(export_file_name(&prefix, wavelength));
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for (time, absorbance) in build_trace(config, wavelength, &mut rng) {
            writer
                .write_record([format!("{time:.4}"), format!("{absorbance:.6}")])
                .with_context(|| format!("writing {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing {}", path.display()))?;
        files.push(path);
    }

    Ok(GeneratedRun {
        result_dir,
        raw_dir,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dadcore::processing::discovery::SourceFilePattern;
    use tempfile::tempdir;

    #[test]
    fn generator_writes_one_file_per_wavelength() {
        let dir = tempdir().unwrap();
        let config = GeneratorConfig {
            samples: 50,
            ..Default::default()
        };
        let run = write_result_directory(dir.path(), &config, &EngineConfig::default()).unwrap();

        assert_eq!(run.files.len(), config.wavelengths.len());
        assert!(run.result_dir.ends_with("Sample.sirslt"));
        let contents = fs::read_to_string(&run.files[0]).unwrap();
        assert_eq!(contents.lines().count(), 50);
    }

    #[test]
    fn generated_names_match_export_pattern() {
        let pattern = SourceFilePattern::new().unwrap();
        let matched = pattern
            .matches(&export_file_name("Sample ", 254.0))
            .unwrap();
        assert_eq!(matched.prefix, "Sample ");
        assert_eq!(matched.wavelength_key, "254.0");
    }

    #[test]
    fn same_seed_gives_same_traces() {
        let config = GeneratorConfig {
            samples: 20,
            noise: 0.1,
            seed: 7,
            ..Default::default()
        };
        let a = build_trace(&config, 254.0, &mut StdRng::seed_from_u64(config.seed));
        let b = build_trace(&config, 254.0, &mut StdRng::seed_from_u64(config.seed));
        assert_eq!(a, b);
    }

    #[test]
    fn absorbance_peaks_at_retention_time() {
        let config = GeneratorConfig {
            samples: 200,
            noise: 0.0,
            ..Default::default()
        };
        let trace = build_trace(&config, 254.0, &mut StdRng::seed_from_u64(0));
        let (peak_time, _) = trace
            .iter()
            .copied()
            .fold((0.0, f64::MIN), |best, point| if point.1 > best.1 { point } else { best });
        assert!((peak_time - 1.2).abs() < 0.011);
    }
}
