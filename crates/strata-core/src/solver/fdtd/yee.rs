//! Yee-grid field storage and leapfrog update equations.
//!
//! Fields live on a staggered 3-D grid in SI units. Losses enter through
//! per-cell electric conductivity $\sigma_e$ and, inside absorbing layers, a
//! matched magnetic conductivity $\sigma_m = \sigma_e \mu_0 / \varepsilon_0$:
//!
//! $$
//! E^{n+1} = \frac{1 - \sigma_e\Delta t/2\varepsilon}{1 + \sigma_e\Delta t/2\varepsilon} E^n
//!   + \frac{\Delta t / (\varepsilon\,\Delta x)}{1 + \sigma_e\Delta t/2\varepsilon}\,
//!   (\nabla\times H)^{n+1/2}
//! $$
//!
//! and likewise for $H$ with $\mu_0$ and $\sigma_m$. Axis 0 (x) is the
//! propagation axis; axes 1 and 2 are lateral and optionally periodic.
//! Neighbours outside the domain read as zero.

use std::ops::Range;

use ndarray::{s, Array3, ArrayView2, Zip};

use crate::constants::{EPS_0, MU_0};

/// Polynomial grading order of the absorbing conductivity profile.
const GRADING_ORDER: f64 = 3.0;
/// Target normal-incidence reflection of an absorbing layer.
const ABSORBER_REFLECTION: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Low,
    High,
}

/// Field components and update coefficients for one simulation.
#[derive(Debug, Clone)]
pub struct YeeGrid {
    shape: (usize, usize, usize),
    dx: f64,
    dt: f64,
    periodic_lateral: bool,

    pub ex: Array3<f64>,
    pub ey: Array3<f64>,
    pub ez: Array3<f64>,
    pub hx: Array3<f64>,
    pub hy: Array3<f64>,
    pub hz: Array3<f64>,

    eps_r: Array3<f64>,
    sigma_e: Array3<f64>,
    sigma_m: Array3<f64>,

    ca: Array3<f64>,
    cb: Array3<f64>,
    da: Array3<f64>,
    db: Array3<f64>,
}

impl YeeGrid {
    /// Vacuum-filled grid of `shape` cells with cell size `dx` (m) and step `dt` (s).
    pub fn new(shape: (usize, usize, usize), dx: f64, dt: f64, periodic_lateral: bool) -> Self {
        let zeros = Array3::<f64>::zeros(shape);
        let mut grid = Self {
            shape,
            dx,
            dt,
            periodic_lateral,
            ex: zeros.clone(),
            ey: zeros.clone(),
            ez: zeros.clone(),
            hx: zeros.clone(),
            hy: zeros.clone(),
            hz: zeros.clone(),
            eps_r: Array3::ones(shape),
            sigma_e: zeros.clone(),
            sigma_m: zeros.clone(),
            ca: zeros.clone(),
            cb: zeros.clone(),
            da: zeros.clone(),
            db: zeros,
        };
        grid.update_coefficients();
        grid
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Fill the box `x × y × z` with material, `eps_r`/`sigma` indexed by lateral
    /// position relative to the box origin.
    pub fn set_material(
        &mut self,
        x: Range<usize>,
        y: Range<usize>,
        z: Range<usize>,
        eps_r: ArrayView2<'_, f64>,
        sigma: ArrayView2<'_, f64>,
    ) {
        let (y0, z0) = (y.start, z.start);
        for i in x {
            for j in y.clone() {
                for k in z.clone() {
                    self.eps_r[[i, j, k]] = eps_r[[j - y0, k - z0]];
                    self.sigma_e[[i, j, k]] = sigma[[j - y0, k - z0]];
                }
            }
        }
        self.update_coefficients();
    }

    /// Add a graded absorbing layer `cells` thick at one end of `axis`.
    pub fn add_absorber(&mut self, axis: usize, side: Side, cells: usize) {
        if cells == 0 {
            return;
        }
        let n = [self.shape.0, self.shape.1, self.shape.2][axis];
        let depth_m = cells as f64 * self.dx;
        let eta_0 = (MU_0 / EPS_0).sqrt();
        let sigma_max = -(GRADING_ORDER + 1.0) * ABSORBER_REFLECTION.ln() / (2.0 * eta_0 * depth_m);

        for c in 0..cells.min(n) {
            // Depth of the cell centre measured from the inner interface.
            let depth = (cells - c) as f64 - 0.5;
            let sigma = sigma_max * (depth / cells as f64).powf(GRADING_ORDER);
            let index = match side {
                Side::Low => c,
                Side::High => n - 1 - c,
            };
            let mut e_slab = self.sigma_e.index_axis_mut(ndarray::Axis(axis), index);
            e_slab.mapv_inplace(|v| v + sigma);
            let mut m_slab = self.sigma_m.index_axis_mut(ndarray::Axis(axis), index);
            m_slab.mapv_inplace(|v| v + sigma * MU_0 / EPS_0);
        }
        self.update_coefficients();
    }

    /// Largest $c\,\Delta t / (\Delta x \sqrt{\varepsilon_r})$ over the grid.
    pub fn max_local_courant(&self) -> f64 {
        let base = crate::constants::SPEED_OF_LIGHT * self.dt / self.dx;
        self.eps_r
            .iter()
            .map(|&e| if e > 0.0 { base / e.sqrt() } else { f64::INFINITY })
            .fold(0.0, f64::max)
    }

    fn update_coefficients(&mut self) {
        let dt = self.dt;
        let dx = self.dx;
        Zip::from(&mut self.ca)
            .and(&mut self.cb)
            .and(&self.eps_r)
            .and(&self.sigma_e)
            .for_each(|ca, cb, &eps_r, &sigma| {
                let eps = EPS_0 * eps_r;
                let loss = sigma * dt / (2.0 * eps);
                *ca = (1.0 - loss) / (1.0 + loss);
                *cb = (dt / (eps * dx)) / (1.0 + loss);
            });
        Zip::from(&mut self.da)
            .and(&mut self.db)
            .and(&self.sigma_m)
            .for_each(|da, db, &sigma_m| {
                let loss = sigma_m * dt / (2.0 * MU_0);
                *da = (1.0 - loss) / (1.0 + loss);
                *db = (dt / (MU_0 * dx)) / (1.0 + loss);
            });
    }

    /// Index of the lateral neighbour `j ± 1`, `None` outside a non-periodic domain.
    #[inline]
    fn lateral(&self, j: usize, n: usize, forward: bool) -> Option<usize> {
        match (forward, self.periodic_lateral) {
            (true, _) if j + 1 < n => Some(j + 1),
            (true, true) => Some(0),
            (false, _) if j > 0 => Some(j - 1),
            (false, true) => Some(n - 1),
            _ => None,
        }
    }

    /// Advance H by one step using forward differences of E.
    pub fn update_h(&mut self) {
        let (nx, ny, nz) = self.shape;
        let at = |a: &Array3<f64>, i: usize, j: Option<usize>, k: Option<usize>| match (j, k) {
            (Some(j), Some(k)) if i < nx => a[[i, j, k]],
            _ => 0.0,
        };
        for i in 0..nx {
            for j in 0..ny {
                let jp = self.lateral(j, ny, true);
                for k in 0..nz {
                    let kp = self.lateral(k, nz, true);
                    let (sj, sk) = (Some(j), Some(k));
                    let ez = self.ez[[i, j, k]];
                    let ey = self.ey[[i, j, k]];
                    let ex = self.ex[[i, j, k]];

                    let curl_x = (at(&self.ez, i, jp, sk) - ez) - (at(&self.ey, i, sj, kp) - ey);
                    let curl_y = (at(&self.ex, i, sj, kp) - ex) - (at(&self.ez, i + 1, sj, sk) - ez);
                    let curl_z = (at(&self.ey, i + 1, sj, sk) - ey) - (at(&self.ex, i, jp, sk) - ex);

                    let (da, db) = (self.da[[i, j, k]], self.db[[i, j, k]]);
                    self.hx[[i, j, k]] = da * self.hx[[i, j, k]] - db * curl_x;
                    self.hy[[i, j, k]] = da * self.hy[[i, j, k]] - db * curl_y;
                    self.hz[[i, j, k]] = da * self.hz[[i, j, k]] - db * curl_z;
                }
            }
        }
    }

    /// Advance E by one step using backward differences of H.
    pub fn update_e(&mut self) {
        let (nx, ny, nz) = self.shape;
        let at = |a: &Array3<f64>, i: Option<usize>, j: Option<usize>, k: Option<usize>| match (i, j, k) {
            (Some(i), Some(j), Some(k)) => a[[i, j, k]],
            _ => 0.0,
        };
        for i in 0..nx {
            let im = i.checked_sub(1);
            for j in 0..ny {
                let jm = self.lateral(j, ny, false);
                for k in 0..nz {
                    let km = self.lateral(k, nz, false);
                    let (si, sj, sk) = (Some(i), Some(j), Some(k));
                    let hx = self.hx[[i, j, k]];
                    let hy = self.hy[[i, j, k]];
                    let hz = self.hz[[i, j, k]];

                    let curl_x = (hz - at(&self.hz, si, jm, sk)) - (hy - at(&self.hy, si, sj, km));
                    let curl_y = (hx - at(&self.hx, si, sj, km)) - (hz - at(&self.hz, im, sj, sk));
                    let curl_z = (hy - at(&self.hy, im, sj, sk)) - (hx - at(&self.hx, si, jm, sk));

                    let (ca, cb) = (self.ca[[i, j, k]], self.cb[[i, j, k]]);
                    self.ex[[i, j, k]] = ca * self.ex[[i, j, k]] + cb * curl_x;
                    self.ey[[i, j, k]] = ca * self.ey[[i, j, k]] + cb * curl_y;
                    self.ez[[i, j, k]] = ca * self.ez[[i, j, k]] + cb * curl_z;
                }
            }
        }
    }

    /// Add `value` to Ez over the whole lateral plane at `x` (soft source).
    pub fn inject_ez(&mut self, x: usize, value: f64) {
        self.ez.slice_mut(s![x, .., ..]).mapv_inplace(|v| v + value);
    }

    /// Mean Ez over the lateral window `y × z` at `x`.
    pub fn mean_ez(&self, x: usize, y: Range<usize>, z: Range<usize>) -> f64 {
        self.ez.slice(s![x, y, z]).mean().unwrap_or(0.0)
    }

    pub fn relative_permittivity(&self) -> &Array3<f64> {
        &self.eps_r
    }

    pub fn conductivity(&self) -> &Array3<f64> {
        &self.sigma_e
    }

    pub fn fields_finite(&self) -> bool {
        [&self.ex, &self.ey, &self.ez, &self.hx, &self.hy, &self.hz]
            .iter()
            .all(|a| a.iter().all(|v| v.is_finite()))
    }

    /// Total electromagnetic energy (J per unit cell volume scale).
    pub fn energy(&self) -> f64 {
        let cell = self.dx.powi(3);
        let electric: f64 = Zip::from(&self.ex)
            .and(&self.ey)
            .and(&self.ez)
            .and(&self.eps_r)
            .fold(0.0, |acc, ex, ey, ez, e| acc + EPS_0 * e * (ex * ex + ey * ey + ez * ez));
        let magnetic: f64 = Zip::from(&self.hx)
            .and(&self.hy)
            .and(&self.hz)
            .fold(0.0, |acc, hx, hy, hz| acc + MU_0 * (hx * hx + hy * hy + hz * hz));
        0.5 * cell * (electric + magnetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SPEED_OF_LIGHT;

    fn grid(n: usize, periodic: bool) -> YeeGrid {
        let dx = 5e-8;
        YeeGrid::new((n, 2, 2), dx, 0.5 * dx / SPEED_OF_LIGHT, periodic)
    }

    #[test]
    fn test_vacuum_coefficients() {
        let g = grid(8, true);
        assert_eq!(g.ca[[3, 0, 0]], 1.0);
        assert!((g.cb[[3, 0, 0]] - g.dt() / (EPS_0 * g.dx())).abs() < 1e-6 * g.cb[[3, 0, 0]]);
        assert!((g.max_local_courant() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_absorber_is_graded_towards_the_wall() {
        let mut g = grid(40, true);
        g.add_absorber(0, Side::Low, 10);
        g.add_absorber(0, Side::High, 10);
        let s = g.conductivity();
        assert!(s[[0, 0, 0]] > s[[5, 0, 0]]);
        assert!(s[[5, 0, 0]] > s[[9, 0, 0]]);
        assert_eq!(s[[10, 0, 0]], 0.0);
        assert_eq!(s[[20, 1, 1]], 0.0);
        assert!((s[[39, 0, 0]] - s[[0, 0, 0]]).abs() < 1e-9 * s[[0, 0, 0]]);
    }

    #[test]
    fn test_pulse_is_absorbed() {
        let mut g = grid(200, true);
        g.add_absorber(0, Side::Low, 30);
        g.add_absorber(0, Side::High, 30);
        for n in 0..60 {
            let t = n as f64 - 30.0;
            g.inject_ez(100, (-(t / 10.0).powi(2)).exp());
            g.update_h();
            g.update_e();
        }
        let peak = g.energy();
        assert!(peak > 0.0);
        for _ in 0..3000 {
            g.update_h();
            g.update_e();
        }
        assert!(g.fields_finite());
        assert!(g.energy() < 1e-3 * peak, "energy left: {} of {}", g.energy(), peak);
    }

    #[test]
    fn test_periodic_plane_wave_stays_uniform() {
        let mut g = grid(60, true);
        for _ in 0..40 {
            g.inject_ez(30, 1.0);
            g.update_h();
            g.update_e();
        }
        let plane: ArrayView2<f64> = g.ez.slice(s![35, .., ..]);
        let first = plane[[0, 0]];
        assert!(first.abs() > 0.0);
        assert!(plane.iter().all(|&v| (v - first).abs() < 1e-12 * first.abs().max(1.0)));
    }
}
