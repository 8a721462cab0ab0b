//! # Strata Core
//!
//! Spectrum computation for gradient-based inverse design of multilayer
//! nanostructures. Given a permittivity grid (produced by a neural model or
//! by [`layers::LayerBuilder`]) and a validated run configuration, this crate
//! computes reflectance and transmittance at a set of target frequencies with
//! one of two interchangeable electromagnetic back ends.
//!
//! ## Architecture
//!
//! ```text
//! RawConfig ──validate──▶ RunConfig ──▶ target frequencies
//!                              │
//! PermittivityGrid ───────────▶ compute_spectrum ──▶ TRCWA | FDTD ──▶ SpectrumResult
//! ```
//!
//! Both back ends implement [`solver::SpectrumSolver`]; callers go through
//! [`solver::compute_spectrum`] and never depend on which one ran.
//!
//! ## Modules
//!
//! - [`config`] — Raw TOML mapping, schema validator, immutable [`RunConfig`].
//! - [`frequencies`] — Target-frequency grid generator.
//! - [`units`], [`constants`] — Unit and wavelength conversions.
//! - [`types`] — [`PermittivityGrid`] and [`SpectrumResult`].
//! - [`layers`] — Layer blocks from material providers.
//! - [`solver`] — Dispatcher, RCWA and FDTD back ends.

pub mod config;
pub mod constants;
pub mod frequencies;
pub mod layers;
pub mod solver;
pub mod types;
pub mod units;

pub use config::{load_config, ConfigError, RawConfig, RunConfig};
pub use frequencies::{compute_target_frequencies, FreqDistribution, TargetFrequencies};
pub use solver::{compute_spectrum, Solver, SolverError, SolverKind, SpectrumSolver};
pub use types::{PermittivityGrid, SpectrumResult};
