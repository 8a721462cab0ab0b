//! Per-layer permittivity blocks built from material providers.
//!
//! A block has shape (x, y, frequency): the lateral grid of one layer,
//! evaluated at every target frequency's physical wavelength. Blocks are
//! assembled into a [`PermittivityGrid`] with [`LayerBuilder::stack`] or
//! [`PermittivityGrid::set_layer`].

use ndarray::Array3;
use num_complex::Complex64;
use strata_materials::{MaterialError, MaterialProvider};
use thiserror::Error;

use crate::config::RunConfig;
use crate::types::PermittivityGrid;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Stack has {found} material(s), configuration expects N_layers = {expected}")]
    LayerCount { expected: usize, found: usize },

    #[error(transparent)]
    Material(#[from] MaterialError),
}

/// Builds layer blocks for the geometry and frequencies of one configuration.
pub struct LayerBuilder {
    nx: usize,
    ny: usize,
    n_layers: usize,
    wavelengths_m: Vec<f64>,
}

impl LayerBuilder {
    pub fn new(cfg: &RunConfig) -> Self {
        Self {
            nx: cfg.nx(),
            ny: cfg.ny(),
            n_layers: cfg.n_layers(),
            wavelengths_m: cfg.target_frequencies().physical_wavelengths(),
        }
    }

    fn permittivities(&self, material: &dyn MaterialProvider) -> Result<Vec<Complex64>, MaterialError> {
        self.wavelengths_m
            .iter()
            .map(|&wl| material.dielectric_function(wl))
            .collect()
    }

    /// Fill each lateral cell with `inner` where `inside(x, y)` holds, `outer` elsewhere.
    fn pattern(
        &self,
        inner: &dyn MaterialProvider,
        outer: &dyn MaterialProvider,
        inside: impl Fn(f64, f64) -> bool,
    ) -> Result<Array3<Complex64>, MaterialError> {
        let eps_in = self.permittivities(inner)?;
        let eps_out = self.permittivities(outer)?;
        // Cell centres in [-0.5, 0.5) unit-cell coordinates.
        let centre = |i: usize, n: usize| (i as f64 + 0.5) / n as f64 - 0.5;
        Ok(Array3::from_shape_fn(
            (self.nx, self.ny, self.wavelengths_m.len()),
            |(x, y, f)| {
                if inside(centre(x, self.nx), centre(y, self.ny)) {
                    eps_in[f]
                } else {
                    eps_out[f]
                }
            },
        ))
    }

    /// Homogeneous layer of `material`.
    pub fn uniform(&self, material: &dyn MaterialProvider) -> Result<Array3<Complex64>, MaterialError> {
        let eps = self.permittivities(material)?;
        Ok(Array3::from_shape_fn(
            (self.nx, self.ny, eps.len()),
            |(_, _, f)| eps[f],
        ))
    }

    /// Centred square of `inner` with side `fraction` of the unit cell, in `outer`.
    pub fn square(
        &self,
        inner: &dyn MaterialProvider,
        outer: &dyn MaterialProvider,
        fraction: f64,
    ) -> Result<Array3<Complex64>, MaterialError> {
        let half = 0.5 * fraction;
        self.pattern(inner, outer, |x, y| x.abs() < half && y.abs() < half)
    }

    /// Centred disk of `inner` with radius `radius_fraction` of the unit cell, in `outer`.
    pub fn circle(
        &self,
        inner: &dyn MaterialProvider,
        outer: &dyn MaterialProvider,
        radius_fraction: f64,
    ) -> Result<Array3<Complex64>, MaterialError> {
        self.pattern(inner, outer, |x, y| x.hypot(y) < radius_fraction)
    }

    /// Grid with one uniform layer per material, top to bottom. Fails with
    /// [`LayerError::LayerCount`] unless there is one material per configured layer.
    pub fn stack(&self, materials: &[&dyn MaterialProvider]) -> Result<PermittivityGrid, LayerError> {
        if materials.len() != self.n_layers {
            return Err(LayerError::LayerCount {
                expected: self.n_layers,
                found: materials.len(),
            });
        }
        let mut grid = PermittivityGrid::zeros(self.nx, self.ny, self.n_layers, self.wavelengths_m.len());
        for (layer, material) in materials.iter().enumerate() {
            grid.set_layer(layer, &self.uniform(*material)?);
        }
        Ok(grid)
    }
}
