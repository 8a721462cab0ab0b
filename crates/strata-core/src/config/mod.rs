//! Typed, validated run configuration.
//!
//! A [`RawConfig`] (flat TOML mapping) is converted once into an immutable
//! [`RunConfig`] by the schema validator in [`validate`]. Every solver takes
//! `&RunConfig` and trusts it: no adapter re-validates its inputs.
//!
//! ```no_run
//! use strata_core::config::{RawConfig, RunConfig};
//!
//! let mut raw = RawConfig::defaults();
//! raw.set("N_layers", 2).set("PER_LAYER_THICKNESS", vec![0.5, 1.0]);
//! let cfg = RunConfig::from_raw(&raw)?;
//! assert_eq!(cfg.n_layers(), 2);
//! # Ok::<(), strata_core::config::ConfigError>(())
//! ```

mod raw;
mod validate;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::frequencies::{FreqDistribution, TargetFrequencies};
use crate::solver::Solver;

pub use raw::RawConfig;
pub use validate::{validate, Violation};

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration ({} violation(s)):\n{}", .0.len(), list_violations(.0))]
    Invalid(Vec<Violation>),
}

impl ConfigError {
    /// Rule violations, empty for I/O and parse errors.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Invalid(v) => v,
            _ => &[],
        }
    }
}

/// Read a TOML file layered over the bundled defaults and validate it.
pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    RunConfig::load(path)
}

fn list_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lateral grid and layer stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub nx: usize,
    pub ny: usize,
    pub eps_oversampling: usize,
    pub n_layers: usize,
    /// Either one thickness shared by all layers or one per layer (µm).
    pub per_layer_thickness: Vec<f64>,
}

/// Admissible permittivity range for the model output.
#[derive(Debug, Clone, PartialEq)]
pub struct PermittivityBounds {
    pub real_min: f64,
    pub real_max: f64,
    pub imag_min: f64,
    pub imag_max: f64,
    pub avoid_zero_eps: bool,
}

/// Wavelength interval and its discretisation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralSettings {
    /// `[min, max]` in metres.
    pub physical_wavelength_range: [f64; 2],
    pub n_freq: usize,
    pub distribution: FreqDistribution,
}

/// Neural representation hyper-parameters (passed through to the model).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model_type: String,
    pub encoding_dim: usize,
    pub siren_omega: f64,
    pub n_neurons: usize,
    pub hidden_layers: usize,
}

/// Whether the model picks discrete materials or regresses permittivities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    Classification,
    Regression,
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classification" => Ok(Self::Classification),
            "regression" => Ok(Self::Regression),
            other => Err(format!("unknown task type '{other}'")),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classification => f.write_str("classification"),
            Self::Regression => f.write_str("regression"),
        }
    }
}

/// Optimisation-loop settings (passed through to the training loop).
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSettings {
    pub task: TaskType,
    pub learning_rate: f64,
    pub iterations: usize,
    pub l: f64,
    pub absorption_loss: bool,
    pub use_regularization_loss: bool,
    pub reg_loss_weight: f64,
    pub add_noise: bool,
    pub noise_scale: f64,
    pub use_gpu: bool,
}

/// Target reflectance/transmittance, one value per target frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpectra {
    pub reflectance: Vec<f64>,
    pub transmittance: Vec<f64>,
}

/// Immutable, validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    name: String,
    seed: i64,
    geometry: Geometry,
    bounds: PermittivityBounds,
    spectral: SpectralSettings,
    model: ModelSettings,
    training: TrainingSettings,
    targets: TargetSpectra,
    solver: Solver,
    target_frequencies: TargetFrequencies,
}

impl RunConfig {
    /// Validate a raw mapping into a run configuration.
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        validate(raw)
    }

    /// The bundled defaults, validated.
    pub fn defaults() -> Result<Self, ConfigError> {
        validate(&RawConfig::defaults())
    }

    /// Load a TOML file (layered over the defaults) and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        validate(&RawConfig::load(path)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn bounds(&self) -> &PermittivityBounds {
        &self.bounds
    }

    pub fn spectral(&self) -> &SpectralSettings {
        &self.spectral
    }

    pub fn model(&self) -> &ModelSettings {
        &self.model
    }

    pub fn training(&self) -> &TrainingSettings {
        &self.training
    }

    pub fn targets(&self) -> &TargetSpectra {
        &self.targets
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Target frequencies derived from the spectral settings at validation time.
    pub fn target_frequencies(&self) -> &TargetFrequencies {
        &self.target_frequencies
    }

    pub fn nx(&self) -> usize {
        self.geometry.nx
    }

    pub fn ny(&self) -> usize {
        self.geometry.ny
    }

    pub fn n_layers(&self) -> usize {
        self.geometry.n_layers
    }

    pub fn n_freq(&self) -> usize {
        self.spectral.n_freq
    }

    /// Thickness of layer `layer` in µm, broadcasting a single shared value.
    pub fn per_layer_thickness(&self, layer: usize) -> f64 {
        let t = &self.geometry.per_layer_thickness;
        if t.len() == 1 {
            t[0]
        } else {
            t[layer]
        }
    }

    /// Total stack thickness in µm.
    pub fn stack_thickness(&self) -> f64 {
        (0..self.n_layers()).map(|i| self.per_layer_thickness(i)).sum()
    }
}

impl TryFrom<RawConfig> for RunConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        validate(&raw)
    }
}

impl TryFrom<&RawConfig> for RunConfig {
    type Error = ConfigError;

    fn try_from(raw: &RawConfig) -> Result<Self, Self::Error> {
        validate(raw)
    }
}
