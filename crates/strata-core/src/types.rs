//! Core data types shared across the spectrum pipeline.

use ndarray::{s, Array3, Array4, ArrayView2, ArrayView3};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Complex relative permittivity indexed by (x, y, layer, frequency).
///
/// The real part is the dielectric constant, the imaginary part the loss.
/// Produced by a model-to-grid transform (or [`LayerBuilder`](crate::layers::LayerBuilder)
/// in setup code) and read, never written, by the solvers.
#[derive(Debug, Clone, PartialEq)]
pub struct PermittivityGrid {
    data: Array4<Complex64>,
}

impl PermittivityGrid {
    /// All-zero grid of the given shape.
    pub fn zeros(nx: usize, ny: usize, n_layers: usize, n_freq: usize) -> Self {
        Self {
            data: Array4::zeros((nx, ny, n_layers, n_freq)),
        }
    }

    /// Wrap an existing (x, y, layer, frequency) array.
    pub fn from_array(data: Array4<Complex64>) -> Self {
        Self { data }
    }

    /// `(nx, ny, n_layers, n_freq)`.
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    pub fn n_layers(&self) -> usize {
        self.data.dim().2
    }

    pub fn n_freq(&self) -> usize {
        self.data.dim().3
    }

    /// Lateral (x, y) permittivity map of one layer at one frequency index.
    pub fn layer_slice(&self, layer: usize, freq: usize) -> ArrayView2<'_, Complex64> {
        self.data.slice(s![.., .., layer, freq])
    }

    /// All layers at one frequency index, shape (x, y, layer).
    pub fn frequency_slice(&self, freq: usize) -> ArrayView3<'_, Complex64> {
        self.data.slice(s![.., .., .., freq])
    }

    /// Overwrite one layer with an (x, y, frequency) block.
    ///
    /// # Panics
    /// Panics if `values` does not have shape `(nx, ny, n_freq)`.
    pub fn set_layer(&mut self, layer: usize, values: &Array3<Complex64>) {
        self.data.slice_mut(s![.., .., layer, ..]).assign(values);
    }

    pub fn as_array(&self) -> &Array4<Complex64> {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize, layer: usize, freq: usize) -> Complex64 {
        self.data[[x, y, layer, freq]]
    }
}

/// Reflectance and transmittance, one value per target frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumResult {
    pub reflectance: Vec<f64>,
    pub transmittance: Vec<f64>,
}

impl SpectrumResult {
    /// Assemble from per-frequency `(R, T)` pairs in target order.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let (reflectance, transmittance) = pairs.into_iter().unzip();
        Self {
            reflectance,
            transmittance,
        }
    }

    pub fn len(&self) -> usize {
        self.reflectance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflectance.is_empty()
    }

    /// Absorptance $A = 1 - R - T$ per frequency.
    pub fn absorptance(&self) -> Vec<f64> {
        self.reflectance
            .iter()
            .zip(&self.transmittance)
            .map(|(r, t)| 1.0 - r - t)
            .collect()
    }

    /// Whether every R and T lies in `[-tol, 1 + tol]`.
    pub fn is_physical(&self, tol: f64) -> bool {
        self.reflectance
            .iter()
            .chain(&self.transmittance)
            .all(|&v| v >= -tol && v <= 1.0 + tol)
    }
}
