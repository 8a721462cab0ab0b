//! Strata command-line interface.
//!
//! Work with run configurations and compute forward spectra:
//! ```sh
//! strata-cli validate run.toml
//! strata-cli frequencies run.toml
//! strata-cli spectrum run.toml --layers titanium_oxide,zinc_oxide --solver FDTD
//! strata-cli materials
//! ```

mod runner;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use strata_core::config::{ConfigError, RawConfig, RunConfig};
use strata_core::SolverKind;

#[derive(Parser)]
#[command(name = "strata-cli")]
#[command(about = "Strata: forward spectra of layered nanostructures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and report every violation.
    Validate {
        /// Path to the run configuration file.
        config: PathBuf,
    },
    /// Print the target frequencies of a configuration.
    Frequencies {
        /// Path to the run configuration file.
        config: PathBuf,
    },
    /// Compute the reflectance/transmittance spectrum of a uniform layer stack.
    Spectrum {
        /// Path to the run configuration file.
        config: PathBuf,
        /// Comma-separated material per layer, top to bottom.
        #[arg(short, long, value_delimiter = ',', required = true)]
        layers: Vec<String>,
        /// Solver override (`TRCWA` or `FDTD`).
        #[arg(short, long)]
        solver: Option<SolverKind>,
        /// Output directory.
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
        /// Also write `spectrum.json`.
        #[arg(long)]
        json: bool,
    },
    /// Display the available materials.
    Materials,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => match RunConfig::load(&config) {
            Ok(cfg) => {
                println!("Configuration '{}' is valid: {}", cfg.name(), config.display());
                Ok(())
            }
            Err(ConfigError::Invalid(violations)) => {
                println!("{} violation(s) in {}:", violations.len(), config.display());
                for v in &violations {
                    println!("  - {v}");
                }
                anyhow::bail!("configuration is invalid")
            }
            Err(e) => Err(e).context(format!("Cannot load {}", config.display())),
        },
        Commands::Frequencies { config } => {
            let cfg = load(&config, None)?;
            runner::print_frequencies(&cfg);
            Ok(())
        }
        Commands::Spectrum {
            config,
            layers,
            solver,
            output,
            json,
        } => {
            println!("Strata Spectrum Solver");
            println!("======================");
            let cfg = load(&config, solver)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_spectrum(&cfg, &layers)?;

            let csv_path = output.join("spectrum.csv");
            runner::write_spectrum_csv(&result, &csv_path, &cfg, &layers)?;
            if json {
                runner::write_spectrum_json(&result, &output.join("spectrum.json"), &cfg)?;
            }
            println!("Simulation complete.");
            Ok(())
        }
        Commands::Materials => {
            runner::print_materials();
            Ok(())
        }
    }
}

/// Load a configuration file, optionally overriding the solver before validation.
fn load(path: &std::path::Path, solver: Option<SolverKind>) -> anyhow::Result<RunConfig> {
    let mut raw = RawConfig::load(path).with_context(|| format!("Cannot load {}", path.display()))?;
    if let Some(kind) = solver {
        raw.set("solver", kind.to_string());
    }
    RunConfig::from_raw(&raw).with_context(|| format!("Invalid configuration {}", path.display()))
}
