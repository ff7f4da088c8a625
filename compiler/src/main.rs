use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dadcore::prelude::InterpolationMode;
use generator::profile::{write_result_directory, GeneratorConfig};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;
use workflow::watch::watch_project;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Compiles single-wavelength DAD exports into 3D spectra tables")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Maximum wavelength spacing in nm before gaps are interpolated
    #[arg(long, global = true)]
    resolution: Option<f64>,
    /// How interpolated columns are valued
    #[arg(long, global = true, value_enum)]
    interpolation: Option<InterpolationArg>,
    /// Header of the leading time column
    #[arg(long, global = true)]
    time_column: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile one result directory
    Compile {
        result_dir: PathBuf,
        /// Print the summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Compile every pending result directory of a project once
    Scan {
        project_dir: PathBuf,
        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Keep compiling result directories as they appear
    Watch {
        project_dir: PathBuf,
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Write a synthetic result directory
    Generate {
        out_dir: PathBuf,
        /// Load the generator profile from YAML
        #[arg(long)]
        profile: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, value_delimiter = ',')]
        wavelengths: Vec<f64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InterpolationArg {
    Midpoint,
    Linear,
}

impl From<InterpolationArg> for InterpolationMode {
    fn from(arg: InterpolationArg) -> Self {
        match arg {
            InterpolationArg::Midpoint => InterpolationMode::Midpoint,
            InterpolationArg::Linear => InterpolationMode::Linear,
        }
    }
}

fn load_generator_profile(path: Option<PathBuf>) -> anyhow::Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("reading generator profile {}", path.display()))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing generator profile {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = match args.config {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    }
    .with_overrides(
        args.resolution,
        args.interpolation.map(Into::into),
        args.time_column,
    )?;

    match args.command {
        Command::Compile { result_dir, json } => {
            let runner = Runner::new(workflow_config);
            let summary = runner.compile(&result_dir)?.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{} -> rows {}, measured {}, interpolated {}, skipped {}",
                    result_dir.display(),
                    summary.rows,
                    summary.measured_columns,
                    summary.interpolated_columns,
                    summary.skipped.len()
                );
                for skipped in &summary.skipped {
                    println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
                }
                if let Some(path) = &summary.output_path {
                    println!("  wrote {}", path.display());
                }
            }
        }
        Command::Scan { project_dir, json } => {
            let runner = Runner::new(workflow_config);
            let report = runner.scan(&project_dir)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            println!(
                "Scan of {} -> compiled {}, failed {}",
                project_dir.display(),
                report.compiled.len(),
                report.failed.len()
            );
            for failure in &report.failed {
                println!("  {}: {}", failure.result_dir.display(), failure.error);
            }
        }
        Command::Watch {
            project_dir,
            interval_ms,
        } => {
            let interval =
                Duration::from_millis(interval_ms.unwrap_or(workflow_config.poll_interval_ms).max(1));
            watch_project(Runner::new(workflow_config), project_dir, interval)?;
        }
        Command::Generate {
            out_dir,
            profile,
            name,
            seed,
            wavelengths,
        } => {
            let mut generator = load_generator_profile(profile)?;
            if let Some(name) = name {
                generator.name = name;
            }
            if let Some(seed) = seed {
                generator.seed = seed;
            }
            if !wavelengths.is_empty() {
                generator.wavelengths = wavelengths;
            }
            let run = write_result_directory(&out_dir, &generator, &workflow_config.engine)?;
            println!(
                "Wrote {} exports ({} samples each) to {}",
                run.files.len(),
                generator.samples,
                run.raw_dir.display()
            );
            println!("Compile with: compiler compile \"{}\"", run.result_dir.display());
        }
    }

    Ok(())
}
