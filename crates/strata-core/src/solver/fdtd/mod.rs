//! Finite-difference time-domain (FDTD) spectrum back end.
//!
//! A [`SimulationVolume`] is built per call with one slab per layer, a soft
//! plane source, a reflection and a transmission detector, and absorbing or
//! periodic boundaries. After `FDTD_niter` steps each detector trace is
//! Fourier-transformed at the target frequencies:
//!
//! $$
//! D(f) = \sum_n s_n\, e^{-2\pi i f n \Delta t}
//! $$
//!
//! An object-free reference volume of identical geometry provides the
//! incident field, so that
//! $R = |D_r - D_r^0|^2 / |D_r^0|^2$ and $T = |D_t|^2 / |D_t^0|^2$.
//!
//! | Excitation | Runs per call | Material slice |
//! |------------|---------------|----------------|
//! | `pulse` | 1 structure + 1 reference | middle target frequency |
//! | `continuous` | 2 per target frequency | that frequency |

pub mod volume;
pub mod waveform;
pub mod yee;

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use log::{debug, trace};
use ndarray::{ArrayView3, Axis};
use num_complex::Complex64;

use super::{SolverError, SpectrumSolver};
use crate::config::RunConfig;
use crate::types::{PermittivityGrid, SpectrumResult};
use crate::units::{freq_to_hz, freq_to_phys_wl, freq_to_wl, imag_eps_to_conductivity};

pub use volume::{Boundary, Detector, DetectorSide, Layout, PlaneSource, SimulationVolume, SlabObject};
pub use waveform::Waveform;

/// Source time dependence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Excitation {
    /// One broadband pulse covering every target frequency.
    Pulse,
    /// One ramped continuous-wave run per target frequency.
    Continuous,
}

impl FromStr for Excitation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pulse" => Ok(Self::Pulse),
            "continuous" => Ok(Self::Continuous),
            other => Err(format!("unknown excitation '{other}'")),
        }
    }
}

impl fmt::Display for Excitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pulse => f.write_str("pulse"),
            Self::Continuous => f.write_str("continuous"),
        }
    }
}

/// Boundary condition on the two lateral axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateralBoundary {
    Periodic,
    Pml,
}

impl FromStr for LateralBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "periodic" => Ok(Self::Periodic),
            "pml" => Ok(Self::Pml),
            other => Err(format!("unknown lateral boundary '{other}'")),
        }
    }
}

impl fmt::Display for LateralBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Periodic => f.write_str("periodic"),
            Self::Pml => f.write_str("pml"),
        }
    }
}

/// FDTD parameters carried by the validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FdtdParams {
    /// Number of timesteps per run.
    pub niter: usize,
    /// Grid cells per µm.
    pub gridpoints_per_unit: usize,
    /// Absorbing layer thickness (µm).
    pub pml_thickness: f64,
    /// Free-space gap between source, detectors and stack (µm).
    pub free_space_distance: f64,
    pub excitation: Excitation,
    pub lateral_boundary: LateralBoundary,
    /// $c\,\Delta t / \Delta x$.
    pub courant: f64,
}

/// The time-domain back end.
pub struct FdtdSolver {
    params: FdtdParams,
}

impl FdtdSolver {
    pub fn new(params: FdtdParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FdtdParams {
        &self.params
    }

    /// Index of the target frequency used for material parameters in pulse mode.
    pub fn representative_index(n_freq: usize) -> usize {
        n_freq / 2
    }

    fn layout(&self, cfg: &RunConfig) -> Result<Layout, SolverError> {
        let thicknesses: Vec<f64> = (0..cfg.n_layers()).map(|i| cfg.per_layer_thickness(i)).collect();
        let longest = cfg
            .target_frequencies()
            .iter()
            .map(|&f| freq_to_wl(f))
            .fold(0.0, f64::max);
        Layout::new(&self.params, &thicknesses, (cfg.nx(), cfg.ny()), longest)
    }

    /// Volume holding the layer stack with materials taken from frequency
    /// slice `index`; conductivities are evaluated at that frequency's
    /// physical wavelength.
    pub fn structure_volume(
        &self,
        grid: &PermittivityGrid,
        cfg: &RunConfig,
        index: usize,
        waveform: Waveform,
    ) -> Result<SimulationVolume, SolverError> {
        let layout = self.layout(cfg)?;
        let wavelength_m = freq_to_phys_wl(cfg.target_frequencies()[index]);
        let objects = slab_objects(grid.frequency_slice(index), &layout, wavelength_m);
        let volume = SimulationVolume::build(&self.params, layout, objects, waveform);
        volume.check_invariants()?;
        Ok(volume)
    }

    /// Object-free volume with the same geometry, for incident-field normalisation.
    pub fn reference_volume(&self, cfg: &RunConfig, waveform: Waveform) -> Result<SimulationVolume, SolverError> {
        let volume = SimulationVolume::build(&self.params, self.layout(cfg)?, Vec::new(), waveform);
        volume.check_invariants()?;
        Ok(volume)
    }

    /// Run structure and reference, then evaluate R and T at `frequencies_hz`
    /// over the trace samples selected by `window`.
    fn measure(
        &self,
        mut structure: SimulationVolume,
        mut reference: SimulationVolume,
        frequencies_hz: &[f64],
        window: impl Fn(usize) -> std::ops::Range<usize>,
        index: usize,
    ) -> Result<Vec<(f64, f64)>, SolverError> {
        let courant = structure.max_local_courant();
        if courant > 1.0 / 3f64.sqrt() {
            return Err(SolverError::Numerical {
                index,
                reason: format!(
                    "local Courant number {courant:.3} exceeds the 3-D stability limit; \
                     relative permittivity too small for FDTD_courant_number"
                ),
            });
        }

        let niter = self.params.niter;
        let at_index = |e: SolverError| match e {
            SolverError::Numerical { reason, .. } => SolverError::Numerical { index, reason },
            other => other,
        };
        #[cfg(feature = "parallel")]
        {
            let (a, b) = rayon::join(|| structure.run(niter), || reference.run(niter));
            a.map_err(at_index)?;
            b.map_err(at_index)?;
        }
        #[cfg(not(feature = "parallel"))]
        {
            structure.run(niter).map_err(at_index)?;
            reference.run(niter).map_err(at_index)?;
        }

        let dt = structure.dt();
        let trace = |v: &SimulationVolume, side| -> Result<Vec<f64>, SolverError> {
            v.detector(side)
                .map(|d| d.trace().to_vec())
                .ok_or_else(|| SolverError::GeometryInvariant(format!("missing {side:?} detector")))
        };
        let r = trace(&structure, DetectorSide::Reflection)?;
        let t = trace(&structure, DetectorSide::Transmission)?;
        let r0 = trace(&reference, DetectorSide::Reflection)?;
        let t0 = trace(&reference, DetectorSide::Transmission)?;

        frequencies_hz
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let w = window(i);
                let d_r = dft(&r[w.clone()], f, dt, w.start);
                let d_t = dft(&t[w.clone()], f, dt, w.start);
                let d_r0 = dft(&r0[w.clone()], f, dt, w.start);
                let d_t0 = dft(&t0[w.clone()], f, dt, w.start);
                let (incident_r, incident_t) = (d_r0.norm_sqr(), d_t0.norm_sqr());
                if !(incident_r > 0.0 && incident_t > 0.0) {
                    return Err(SolverError::Numerical {
                        index,
                        reason: format!("no incident power at {f:.4e} Hz"),
                    });
                }
                let reflectance = (d_r - d_r0).norm_sqr() / incident_r;
                let transmittance = d_t.norm_sqr() / incident_t;
                trace!("FDTD {f:.4e} Hz: R = {reflectance:.6}, T = {transmittance:.6}");
                Ok((reflectance, transmittance))
            })
            .collect()
    }

    fn compute_pulse(&self, grid: &PermittivityGrid, cfg: &RunConfig) -> Result<SpectrumResult, SolverError> {
        let frequencies_hz: Vec<f64> = cfg.target_frequencies().iter().map(|&f| freq_to_hz(f)).collect();
        let index = Self::representative_index(frequencies_hz.len());
        let f_min = frequencies_hz.iter().copied().fold(f64::INFINITY, f64::min);
        let f_max = frequencies_hz.iter().copied().fold(0.0, f64::max);
        let waveform = Waveform::pulse_covering(frequencies_hz[index], f_min, f_max);
        debug!(
            "FDTD pulse: carrier {:.4e} Hz, band [{f_min:.4e}, {f_max:.4e}] Hz, {} steps",
            frequencies_hz[index], self.params.niter
        );

        let structure = self.structure_volume(grid, cfg, index, waveform)?;
        let reference = self.reference_volume(cfg, waveform)?;
        let niter = self.params.niter;
        let pairs = self.measure(structure, reference, &frequencies_hz, |_| 0..niter, index)?;
        Ok(SpectrumResult::from_pairs(pairs))
    }

    fn compute_continuous(&self, grid: &PermittivityGrid, cfg: &RunConfig) -> Result<SpectrumResult, SolverError> {
        let niter = self.params.niter;
        let mut pairs = Vec::with_capacity(cfg.n_freq());
        for (index, &f) in cfg.target_frequencies().iter().enumerate() {
            let f_hz = freq_to_hz(f);
            let waveform = Waveform::continuous(f_hz);
            let structure = self.structure_volume(grid, cfg, index, waveform)?;
            let reference = self.reference_volume(cfg, waveform)?;
            let window = trailing_periods(niter, structure.dt(), f_hz).ok_or_else(|| SolverError::Numerical {
                index,
                reason: format!("{niter} steps do not cover one period at {f_hz:.4e} Hz"),
            })?;
            debug!("FDTD continuous wave {index}: {f_hz:.4e} Hz, DFT over steps {window:?}");
            let pair = self.measure(structure, reference, &[f_hz], |_| window.clone(), index)?;
            pairs.extend(pair);
        }
        Ok(SpectrumResult::from_pairs(pairs))
    }
}

impl SpectrumSolver for FdtdSolver {
    fn compute(&self, grid: &PermittivityGrid, cfg: &RunConfig) -> Result<SpectrumResult, SolverError> {
        super::check_grid_shape(grid, cfg)?;
        match self.params.excitation {
            Excitation::Pulse => self.compute_pulse(grid, cfg),
            Excitation::Continuous => self.compute_continuous(grid, cfg),
        }
    }

    fn method_name(&self) -> &str {
        "Finite-Difference Time-Domain (Yee)"
    }
}

/// One slab per layer from an (x, y, layer) permittivity slice.
fn slab_objects(slice: ArrayView3<'_, Complex64>, layout: &Layout, wavelength_m: f64) -> Vec<SlabObject> {
    slice
        .axis_iter(Axis(2))
        .zip(&layout.layer_spans)
        .enumerate()
        .map(|(layer, (eps, span))| SlabObject {
            layer,
            x: span.clone(),
            permittivity: eps.mapv(|e| e.re),
            conductivity: eps.mapv(|e| imag_eps_to_conductivity(e.im, wavelength_m)),
        })
        .collect::<Vec<_>>()
}

/// Discrete-time Fourier transform of `samples` (starting at step `offset`) at `f_hz`.
pub fn dft(samples: &[f64], f_hz: f64, dt: f64, offset: usize) -> Complex64 {
    let omega_dt = 2.0 * PI * f_hz * dt;
    samples
        .iter()
        .enumerate()
        .map(|(n, &s)| s * Complex64::from_polar(1.0, -omega_dt * (n + offset) as f64))
        .sum()
}

/// Steps spanning the largest whole number of periods in the second half of the run.
fn trailing_periods(niter: usize, dt: f64, f_hz: f64) -> Option<std::ops::Range<usize>> {
    let steps_per_period = 1.0 / (f_hz * dt);
    let periods = ((niter / 2) as f64 / steps_per_period).floor();
    if periods < 1.0 {
        return None;
    }
    let len = (periods * steps_per_period).round() as usize;
    Some(niter - len..niter)
}
