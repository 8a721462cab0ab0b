//! Rigorous coupled-wave analysis (TRCWA) spectrum back end.
//!
//! Each target frequency is solved independently with the scattering-matrix
//! formulation of RCWA:
//!
//! 1. Fourier orders from circular truncation of the reciprocal lattice
//!    ([`lattice`]).
//! 2. Per layer, homogeneous slices use analytic modes; patterned slices
//!    build a permittivity convolution matrix ([`fourier`]) and solve the
//!    eigenproblem $\Omega^2 = PQ$ ([`modes`]).
//! 3. Layer S-matrices are chained with the Redheffer star product between
//!    the incidence half-space and the substrate ([`smatrix`]).
//! 4. $R$ and $T$ are the power-normalised sums over all diffraction orders.
//!
//! With the `parallel` feature the frequency loop runs on the rayon pool;
//! results are always returned in target-frequency order.

pub mod fourier;
pub mod lattice;
pub mod modes;
pub mod smatrix;

use log::{debug, trace};
use nalgebra::DVector;
use ndarray::{ArrayView2, ArrayView3, Axis};
use num_complex::Complex64;

use super::{SolverError, SpectrumSolver};
use crate::config::RunConfig;
use crate::types::{PermittivityGrid, SpectrumResult};

use lattice::Lattice;
use modes::{CMatrix, KSpace, LayerModes};
use smatrix::SMatrix;

/// TRCWA parameters carried by the validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrcwaParams {
    /// Lattice vectors as rows, in µm.
    pub lattice: [[f64; 2]; 2],
    /// Maximum number of Fourier orders.
    pub ng: usize,
    /// Permittivity of the incidence half-space.
    pub top_eps: f64,
    /// Permittivity of the substrate half-space.
    pub bottom_eps: f64,
    /// Polar incidence angle (radians).
    pub theta: f64,
    /// Azimuthal incidence angle (radians).
    pub phi: f64,
    pub s_amplitude: f64,
    pub p_amplitude: f64,
}

/// The frequency-domain back end.
pub struct TrcwaSolver {
    params: TrcwaParams,
}

impl TrcwaSolver {
    pub fn new(params: TrcwaParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrcwaParams {
        &self.params
    }

    /// Solve one frequency. `slice` is the (x, y, layer) permittivity at that
    /// frequency and `thicknesses` the layer thicknesses in µm.
    fn solve_frequency(
        &self,
        lattice: &Lattice,
        orders: &[(i32, i32)],
        frequency: f64,
        slice: ArrayView3<'_, Complex64>,
        thicknesses: &[f64],
    ) -> Result<(f64, f64), String> {
        let p = &self.params;
        let k = KSpace::new(lattice, orders, frequency, p.top_eps.sqrt(), p.theta, p.phi);
        let layers = slice
            .axis_iter(Axis(2))
            .zip(thicknesses)
            .map(|(layer, &t)| Ok((layer_modes(&k, orders, layer)?, t)))
            .collect::<Result<Vec<_>, String>>()?;
        self.stack_response(&k, &layers, frequency)
    }

    /// R and T of the half-spaces around `layers`, each given as its modes
    /// and thickness in µm.
    fn stack_response(
        &self,
        k: &KSpace,
        layers: &[(LayerModes, f64)],
        frequency: f64,
    ) -> Result<(f64, f64), String> {
        let p = &self.params;
        let n = k.n_orders();
        let k0 = 2.0 * std::f64::consts::PI * frequency;
        let gap = LayerModes::gap(k);

        let mut global = SMatrix::reflection_side(&LayerModes::half_space(k, p.top_eps)?, &gap)?;
        for (modes, thickness) in layers {
            global = global.star(&SMatrix::layer(modes, &gap, thickness * k0)?)?;
        }
        global = global.star(&SMatrix::transmission_side(
            &LayerModes::half_space(k, p.bottom_eps)?,
            &gap,
        )?)?;

        // Source: zeroth order (index 0) with unit-power polarisation.
        let pol = self.polarisation(k.k_inc);
        let mut e_src = DVector::<Complex64>::zeros(2 * n);
        e_src[0] = Complex64::new(pol[0], 0.0);
        e_src[n] = Complex64::new(pol[1], 0.0);

        let c_ref = &global.s11 * &e_src;
        let c_trn = &global.s21 * &e_src;

        let kz_ref = k.kz(Complex64::new(p.top_eps, 0.0));
        let kz_trn = k.kz(Complex64::new(p.bottom_eps, 0.0));
        let reflectance = diffracted_power(k, &c_ref, &kz_ref, -1.0) / k.kz_inc;
        let transmittance = diffracted_power(k, &c_trn, &kz_trn, 1.0) / k.kz_inc;

        if !(reflectance.is_finite() && transmittance.is_finite()) {
            return Err(format!("non-finite result R={reflectance}, T={transmittance}"));
        }
        Ok((reflectance, transmittance))
    }

    /// Unit polarisation vector combining the s (TE) and p (TM) amplitudes.
    fn polarisation(&self, k_inc: [f64; 3]) -> [f64; 3] {
        let p = &self.params;
        let norm_k = norm(k_inc);
        let k_hat = k_inc.map(|c| c / norm_k);
        let a_te = if p.theta.abs() < 1e-12 {
            [0.0, 1.0, 0.0]
        } else {
            let te = cross([0.0, 0.0, 1.0], k_hat);
            let len = norm(te);
            te.map(|c| c / len)
        };
        let tm = cross(k_hat, a_te);
        let len = norm(tm);
        let a_tm = tm.map(|c| c / len);
        let pol: [f64; 3] = std::array::from_fn(|i| p.s_amplitude * a_te[i] + p.p_amplitude * a_tm[i]);
        let len = norm(pol);
        pol.map(|c| c / len)
    }
}

impl SpectrumSolver for TrcwaSolver {
    fn compute(&self, grid: &PermittivityGrid, cfg: &RunConfig) -> Result<SpectrumResult, SolverError> {
        super::check_grid_shape(grid, cfg)?;
        let lattice = Lattice::from_rows(self.params.lattice)
            .ok_or_else(|| SolverError::GeometryInvariant("lattice vectors are collinear".into()))?;
        let orders = lattice.truncated_orders(self.params.ng);
        let thicknesses: Vec<f64> = (0..cfg.n_layers()).map(|i| cfg.per_layer_thickness(i)).collect();
        let frequencies = cfg.target_frequencies().as_slice();
        debug!(
            "TRCWA: {} layers, {} Fourier orders, {} frequencies",
            cfg.n_layers(),
            orders.len(),
            frequencies.len()
        );

        let solve = |index: usize| -> Result<(f64, f64), SolverError> {
            let frequency = frequencies[index];
            let result = self
                .solve_frequency(&lattice, &orders, frequency, grid.frequency_slice(index), &thicknesses)
                .map_err(|reason| SolverError::Numerical { index, reason })?;
            trace!("TRCWA f[{index}] = {frequency:.6}: R = {:.6}, T = {:.6}", result.0, result.1);
            Ok(result)
        };

        #[cfg(feature = "parallel")]
        let pairs: Vec<Result<(f64, f64), SolverError>> = {
            use rayon::prelude::*;
            (0..frequencies.len()).into_par_iter().map(solve).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let pairs: Vec<Result<(f64, f64), SolverError>> = (0..frequencies.len()).map(solve).collect();

        let pairs = pairs.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(SpectrumResult::from_pairs(pairs))
    }

    fn method_name(&self) -> &str {
        "Rigorous Coupled-Wave Analysis (S-matrix)"
    }
}

/// Homogeneous slices take the analytic path, anything else the Fourier path.
fn layer_modes(
    k: &KSpace,
    orders: &[(i32, i32)],
    layer: ArrayView2<'_, Complex64>,
) -> Result<LayerModes, String> {
    let first = layer.iter().next().copied().unwrap_or_default();
    if layer.iter().all(|&e| e == first) {
        LayerModes::homogeneous(k, first)
    } else {
        let er: CMatrix = fourier::convolution_matrix(layer, orders);
        LayerModes::patterned(k, &er)
    }
}

/// $\sum_i \mathrm{Re}(\pm K_{z,i}) |\mathbf{e}_i|^2$ over diffraction orders,
/// with $e_z$ from the divergence condition.
fn diffracted_power(k: &KSpace, c: &DVector<Complex64>, kz: &DVector<Complex64>, direction: f64) -> f64 {
    let n = k.n_orders();
    (0..n)
        .map(|i| {
            let ex = c[i];
            let ey = c[n + i];
            let weight = kz[i].re;
            if weight <= 0.0 {
                // Evanescent order, carries no power.
                return 0.0;
            }
            let ez = -(k.kx[i] * ex + k.ky[i] * ey) / (kz[i] * direction);
            weight * (ex.norm_sqr() + ey.norm_sqr() + ez.norm_sqr())
        })
        .sum()
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn norm(v: [f64; 3]) -> f64 {
    v.iter().map(|c| c * c).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn params() -> TrcwaParams {
        TrcwaParams {
            lattice: [[0.3, 0.0], [0.0, 0.3]],
            ng: 9,
            top_eps: 1.0,
            bottom_eps: 1.0,
            theta: 0.0,
            phi: 0.0,
            s_amplitude: 1.0,
            p_amplitude: 0.0,
        }
    }

    /// Airy reflectance of a lossless slab in vacuum at normal incidence.
    fn airy_reflectance(n: f64, thickness: f64, frequency: f64) -> f64 {
        let r = (1.0 - n) / (1.0 + n);
        let delta = 2.0 * std::f64::consts::PI * frequency * n * thickness;
        let f = 4.0 * r * r / (1.0 - r * r).powi(2);
        f * delta.sin().powi(2) / (1.0 + f * delta.sin().powi(2))
    }

    fn single_layer(solver: &TrcwaSolver, modes: LayerModes, k: &KSpace, t: f64, f: f64) -> (f64, f64) {
        solver.stack_response(k, &[(modes, t)], f).unwrap()
    }

    #[test]
    fn test_uniform_slab_matches_airy_formula() {
        let solver = TrcwaSolver::new(params());
        let lattice = Lattice::from_rows(solver.params.lattice).unwrap();
        let orders = lattice.truncated_orders(solver.params.ng);
        for &f in &[0.4, 0.73, 1.1] {
            let k = KSpace::new(&lattice, &orders, f, 1.0, 0.0, 0.0);
            let modes = LayerModes::homogeneous(&k, Complex64::new(6.25, 0.0)).unwrap();
            let (r, t) = single_layer(&solver, modes, &k, 0.45, f);
            assert_relative_eq!(r, airy_reflectance(2.5, 0.45, f), epsilon = 1e-9);
            assert_relative_eq!(r + t, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_oblique_incidence_conserves_energy() {
        let mut p = params();
        p.theta = 0.4;
        p.phi = 0.25;
        p.s_amplitude = 0.6;
        p.p_amplitude = 0.8;
        p.bottom_eps = 2.25;
        let solver = TrcwaSolver::new(p);
        let lattice = Lattice::from_rows(solver.params.lattice).unwrap();
        let orders = lattice.truncated_orders(solver.params.ng);
        let k = KSpace::new(&lattice, &orders, 0.8, 1.0, 0.4, 0.25);
        let modes = LayerModes::homogeneous(&k, Complex64::new(4.0, 0.0)).unwrap();
        let (r, t) = single_layer(&solver, modes, &k, 0.3, 0.8);
        assert!(r > 0.0 && t > 0.0);
        assert_relative_eq!(r + t, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_constant_patterned_layer_matches_uniform_layer() {
        let solver = TrcwaSolver::new(params());
        let lattice = Lattice::from_rows(solver.params.lattice).unwrap();
        let orders = lattice.truncated_orders(solver.params.ng);
        let f = 0.6;
        let eps = Complex64::new(5.0, 0.2);
        let k = KSpace::new(&lattice, &orders, f, 1.0, 0.0, 0.0);

        let uniform = LayerModes::homogeneous(&k, eps).unwrap();
        let slice = Array2::from_elem((4, 4), eps);
        let er = fourier::convolution_matrix(slice.view(), &orders);
        let patterned = LayerModes::patterned(&k, &er).unwrap();

        let (r_u, t_u) = single_layer(&solver, uniform, &k, 0.7, f);
        let (r_p, t_p) = single_layer(&solver, patterned, &k, 0.7, f);
        assert_relative_eq!(r_u, r_p, epsilon = 1e-8);
        assert_relative_eq!(t_u, t_p, epsilon = 1e-8);
        assert!(r_u + t_u < 1.0, "lossy slab must absorb");
    }

    #[test]
    fn test_patterned_grating_conserves_energy() {
        let solver = TrcwaSolver::new(params());
        let lattice = Lattice::from_rows(solver.params.lattice).unwrap();
        let orders = lattice.truncated_orders(solver.params.ng);
        let f = 0.9;
        let mut slice = Array2::from_elem((8, 8), Complex64::new(1.0, 0.0));
        for i in 0..4 {
            for j in 0..8 {
                slice[[i, j]] = Complex64::new(4.0, 0.0);
            }
        }
        let k = KSpace::new(&lattice, &orders, f, 1.0, 0.0, 0.0);
        let modes = layer_modes(&k, &orders, slice.view()).unwrap();
        let (r, t) = single_layer(&solver, modes, &k, 0.5, f);
        assert_relative_eq!(r + t, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_uniform_slab_at_rayleigh_anomaly_is_solvable() {
        // A 2 µm period at 1 µm puts the (±2, 0) and (0, ±2) orders at grazing.
        let mut p = params();
        p.lattice = [[2.0, 0.0], [0.0, 2.0]];
        p.ng = 21;
        let solver = TrcwaSolver::new(p);
        let lattice = Lattice::from_rows(solver.params.lattice).unwrap();
        let orders = lattice.truncated_orders(solver.params.ng);
        let k = KSpace::new(&lattice, &orders, 1.0, 1.0, 0.0, 0.0);
        let modes = LayerModes::homogeneous(&k, Complex64::new(4.0, 0.0)).unwrap();
        let (r, t) = single_layer(&solver, modes, &k, 1.0, 1.0);
        assert_relative_eq!(r, airy_reflectance(2.0, 1.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(r + t, 1.0, epsilon = 1e-6);
    }
}
