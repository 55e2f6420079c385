//! # hospisim
//!
//! Generates a synthetic hospital activity dataset.
//!
//! ```bash
//! # Two years of data with the built-in tables
//! hospisim generate --start 2024-01-01 --end 2025-12-31 --out data/
//!
//! # Dump the built-in tables, edit them, and generate from the edited copy
//! hospisim config --out hospital.json
//! hospisim generate --config hospital.json --seed 7 --out data/
//!
//! # Fit the baseline rate to an observed weekly series
//! hospisim calibrate --observations observed.csv --param base_rate=300:700
//! ```

mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hospisim_calibration::{
    optimize, read_observations, CalibrationParameter, CalibrationProblem, LossConfig,
    NelderMeadConfig, OptimizationConfig, ParticleSwarmConfig,
};
use hospisim_core::HospitalConfig;
use hospisim_daily::DailyGenerator;
use hospisim_patients::PatientGenerator;
use hospisim_resources::ResourceGenerator;
use hospisim_rollup::Rollup;

#[derive(Parser, Debug)]
#[command(name = "hospisim")]
#[command(about = "Synthetic hospital activity generator")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Establishment series, patient log, resource table and rollups
    Generate {
        #[command(flatten)]
        run: RunArgs,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        out: PathBuf,
    },

    /// Resource calibration table only
    Resources {
        #[command(flatten)]
        run: RunArgs,

        #[arg(short, long, default_value = "output")]
        out: PathBuf,
    },

    /// Fit generator tunables to an observed series
    Calibrate {
        #[command(flatten)]
        run: RunArgs,

        /// CSV with columns date, series, value and an optional weight
        #[arg(long)]
        observations: PathBuf,

        /// Parameter to fit, as `name=min:max` or `name=min:max:guess`
        #[arg(short, long = "param", required = true, value_parser = parse_parameter)]
        params: Vec<CalibrationParameter>,

        #[arg(long, value_enum, default_value_t = Algorithm::NelderMead)]
        algorithm: Algorithm,

        /// sse, wsse, rmse or mae
        #[arg(long, default_value = "sse")]
        loss: LossConfig,

        #[arg(long, default_value = "200")]
        max_iterations: u64,

        /// Write the result as JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the built-in configuration as JSON
    Config {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, default_value = "42")]
    seed: u64,

    /// First simulated day (YYYY-MM-DD)
    #[arg(long, default_value = "2024-01-01")]
    start: NaiveDate,

    /// Last simulated day, inclusive
    #[arg(long, default_value = "2025-12-31")]
    end: NaiveDate,

    /// JSON configuration; the built-in tables when absent
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl RunArgs {
    fn load_config(&self) -> Result<Arc<HospitalConfig>> {
        let config = match &self.config {
            Some(path) => HospitalConfig::from_json_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => HospitalConfig::default(),
        };
        config.validate().context("invalid configuration")?;
        Ok(Arc::new(config))
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Algorithm {
    NelderMead,
    ParticleSwarm,
}

fn parse_parameter(arg: &str) -> Result<CalibrationParameter, String> {
    let (name, range) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=min:max, got '{}'", arg))?;
    let values = range
        .split(':')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid bound in '{}': {}", arg, e))?;
    match values.as_slice() {
        [min, max] => Ok(CalibrationParameter::new(name.trim(), *min, *max)),
        [min, max, guess] => Ok(CalibrationParameter::with_initial_guess(
            name.trim(),
            *min,
            *max,
            *guess,
        )),
        _ => Err(format!("expected name=min:max[:guess], got '{}'", arg)),
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn generate(run: &RunArgs, out: &Path) -> Result<()> {
    let config = run.load_config()?;
    let mut daily = DailyGenerator::new(config.clone(), run.seed, run.start, run.end)
        .context("setting up the establishment generator")?;
    let days = daily.generate();

    let calendar = Arc::clone(daily.calendar());
    let patients = PatientGenerator::with_calendar(config.clone(), calendar, run.seed)?
        .generate(&days)
        .context("generating the patient log")?;
    let resources = ResourceGenerator::new(config, run.seed).generate(run.start, run.end)?;
    let rollup = Rollup::from_patients(&patients);

    output::write_all(out, &days, &patients, &resources, &rollup)?;
    tracing::info!(
        days = days.len(),
        patients = patients.len(),
        out = %out.display(),
        "dataset written"
    );
    Ok(())
}

fn resources(run: &RunArgs, out: &Path) -> Result<()> {
    let config = run.load_config()?;
    let records = ResourceGenerator::new(config, run.seed).generate(run.start, run.end)?;
    output::write_resources(out, &records)
}

fn calibrate(
    run: &RunArgs,
    observations: &Path,
    params: Vec<CalibrationParameter>,
    algorithm: Algorithm,
    loss: LossConfig,
    max_iterations: u64,
    verbose: bool,
) -> Result<String> {
    let file = std::fs::File::open(observations)
        .with_context(|| format!("opening {}", observations.display()))?;
    let observed = read_observations(file)
        .with_context(|| format!("reading {}", observations.display()))?;
    let Some(last) = observed.iter().map(|o| o.date).max() else {
        bail!("{} holds no observations", observations.display());
    };
    let end = last.max(run.end);

    let engine = DailyGenerator::new(run.load_config()?, run.seed, run.start, end)?;
    let problem = CalibrationProblem::new(engine, observed, params, loss)?;
    let config = match algorithm {
        Algorithm::NelderMead => OptimizationConfig::NelderMead(
            NelderMeadConfig::new()
                .with_max_iterations(max_iterations)
                .with_verbose(verbose),
        ),
        Algorithm::ParticleSwarm => OptimizationConfig::ParticleSwarm(
            ParticleSwarmConfig::new()
                .with_max_iterations(max_iterations)
                .with_verbose(verbose),
        ),
    };
    let result = optimize(problem, config)?;
    Ok(serde_json::to_string_pretty(&result)?)
}

fn write_or_print(text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Generate { run, out } => generate(&run, &out),
        Command::Resources { run, out } => resources(&run, &out),
        Command::Calibrate {
            run,
            observations,
            params,
            algorithm,
            loss,
            max_iterations,
            out,
        } => {
            let json = calibrate(
                &run,
                &observations,
                params,
                algorithm,
                loss,
                max_iterations,
                cli.verbose,
            )?;
            write_or_print(&json, out.as_deref())
        }
        Command::Config { out } => {
            let json = HospitalConfig::default().to_json()?;
            write_or_print(&json, out.as_deref())
        }
    }
}
