//! Spectrum solver abstraction and dispatch.
//!
//! The [`SpectrumSolver`] trait defines the interface both electromagnetic
//! back ends implement. [`compute_spectrum`] routes a permittivity grid to the
//! back end selected by the run configuration and returns a uniform
//! [`SpectrumResult`], so callers never depend on which method ran.
//!
//! | Back end | Method | Cost driver |
//! |----------|--------|-------------|
//! | [`trcwa::TrcwaSolver`] | Rigorous coupled-wave analysis (frequency domain) | $O(N_G^3)$ per frequency and layer |
//! | [`fdtd::FdtdSolver`] | Finite-difference time domain | `FDTD_niter` × grid cells |

pub mod fdtd;
pub mod trcwa;

use std::fmt;
use std::str::FromStr;

use log::debug;
use thiserror::Error;

use crate::config::RunConfig;
use crate::types::{PermittivityGrid, SpectrumResult};

use fdtd::{FdtdParams, FdtdSolver};
use trcwa::{TrcwaParams, TrcwaSolver};

/// Errors that can occur during a spectrum computation.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Unknown solver '{0}' (expected TRCWA or FDTD)")]
    Dispatch(String),

    #[error("Permittivity grid has shape {found:?}, configuration expects {expected:?}")]
    GridShape {
        expected: (usize, usize, usize, usize),
        found: (usize, usize, usize, usize),
    },

    #[error("Numerical failure at frequency index {index}: {reason}")]
    Numerical { index: usize, reason: String },

    #[error("Invalid simulation geometry: {0}")]
    GeometryInvariant(String),
}

/// Discriminator of the two back ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    Trcwa,
    Fdtd,
}

impl FromStr for SolverKind {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRCWA" => Ok(Self::Trcwa),
            "FDTD" => Ok(Self::Fdtd),
            other => Err(SolverError::Dispatch(other.to_string())),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trcwa => f.write_str("TRCWA"),
            Self::Fdtd => f.write_str("FDTD"),
        }
    }
}

/// Selected back end together with its method-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Solver {
    Trcwa(TrcwaParams),
    Fdtd(FdtdParams),
}

impl Solver {
    pub fn kind(&self) -> SolverKind {
        match self {
            Self::Trcwa(_) => SolverKind::Trcwa,
            Self::Fdtd(_) => SolverKind::Fdtd,
        }
    }
}

/// The trait both spectrum back ends implement.
///
/// Implementations read the grid and configuration only; neither is mutated.
/// A call either returns `N_freq` values per channel, ordered like
/// [`RunConfig::target_frequencies`], or fails as a whole.
pub trait SpectrumSolver {
    /// Reflectance and transmittance at every target frequency.
    fn compute(
        &self,
        grid: &PermittivityGrid,
        cfg: &RunConfig,
    ) -> Result<SpectrumResult, SolverError>;

    /// Human-readable name of the solver method.
    fn method_name(&self) -> &str;
}

/// Compute the spectrum of `grid` with the back end selected in `cfg`.
///
/// # Errors
///
/// [`SolverError::GridShape`] if the grid does not match the configured
/// `(Nx, Ny, N_layers, N_freq)`; otherwise whatever the back end returns.
pub fn compute_spectrum(
    grid: &PermittivityGrid,
    cfg: &RunConfig,
) -> Result<SpectrumResult, SolverError> {
    check_grid_shape(grid, cfg)?;

    let solver: Box<dyn SpectrumSolver> = match cfg.solver() {
        Solver::Trcwa(params) => Box::new(TrcwaSolver::new(params.clone())),
        Solver::Fdtd(params) => Box::new(FdtdSolver::new(params.clone())),
    };
    debug!(
        "Computing {} spectrum over {} frequencies with {}",
        cfg.solver().kind(),
        cfg.n_freq(),
        solver.method_name()
    );
    solver.compute(grid, cfg)
}

pub(crate) fn check_grid_shape(grid: &PermittivityGrid, cfg: &RunConfig) -> Result<(), SolverError> {
    let expected = (cfg.nx(), cfg.ny(), cfg.n_layers(), cfg.n_freq());
    let found = grid.shape();
    if found == expected {
        Ok(())
    } else {
        Err(SolverError::GridShape { expected, found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfig;

    #[test]
    fn test_solver_kind_parsing() {
        assert_eq!("TRCWA".parse::<SolverKind>().unwrap(), SolverKind::Trcwa);
        assert_eq!("FDTD".parse::<SolverKind>().unwrap(), SolverKind::Fdtd);
        assert!(matches!(
            "trcwa".parse::<SolverKind>(),
            Err(SolverError::Dispatch(tag)) if tag == "trcwa"
        ));
        assert_eq!(SolverKind::Fdtd.to_string(), "FDTD");
    }

    #[test]
    fn test_shape_mismatch_is_rejected_before_solving() {
        let cfg = RunConfig::from_raw(&RawConfig::defaults()).unwrap();
        let grid = PermittivityGrid::zeros(cfg.nx(), cfg.ny(), cfg.n_layers() + 1, cfg.n_freq());
        match compute_spectrum(&grid, &cfg) {
            Err(SolverError::GridShape { expected, found }) => {
                assert_eq!(expected.2, cfg.n_layers());
                assert_eq!(found.2, cfg.n_layers() + 1);
            }
            other => panic!("expected a shape error, got {other:?}"),
        }
    }
}
