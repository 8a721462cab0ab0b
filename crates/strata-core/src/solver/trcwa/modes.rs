//! Transverse wave-vector matrices and layer eigenmodes.
//!
//! All wave vectors are normalised by $k_0 = 2\pi f$ with $f$ in µm⁻¹. The
//! field in a layer is expanded in modes $\mathbf{W}$ (electric) and
//! $\mathbf{V}$ (magnetic) with propagation constants $\boldsymbol\Lambda$.
//! Permittivities enter in the $e^{+j\omega t}$ convention, so a lossy
//! physical $\varepsilon' + i\varepsilon''$ is conjugated on the way in.

use faer::complex_native::c64;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use super::lattice::Lattice;

pub type CMatrix = DMatrix<Complex64>;

const J: Complex64 = Complex64::new(0.0, 1.0);

/// Smallest normalised $|k_z|$ kept as computed. A diffraction order at a
/// Rayleigh anomaly grazes the interface with $k_z = 0$; it is replaced by a
/// weakly decaying wave so the mode matrices stay invertible.
pub const KZ_FLOOR: f64 = 1e-6;

fn identity(n: usize) -> CMatrix {
    CMatrix::identity(n, n)
}

/// Assemble a 2×2 block matrix from equally sized square blocks.
pub fn blocks(a11: &CMatrix, a12: &CMatrix, a21: &CMatrix, a22: &CMatrix) -> CMatrix {
    let n = a11.nrows();
    let mut out = CMatrix::zeros(2 * n, 2 * n);
    out.view_mut((0, 0), (n, n)).copy_from(a11);
    out.view_mut((0, n), (n, n)).copy_from(a12);
    out.view_mut((n, 0), (n, n)).copy_from(a21);
    out.view_mut((n, n), (n, n)).copy_from(a22);
    out
}

pub fn inverse(m: &CMatrix, what: &str) -> Result<CMatrix, String> {
    m.clone()
        .try_inverse()
        .ok_or_else(|| format!("singular {what} matrix"))
}

/// Diagonal wave-vector matrices for one frequency and incidence direction.
#[derive(Debug, Clone)]
pub struct KSpace {
    pub kx: DVector<Complex64>,
    pub ky: DVector<Complex64>,
    /// Normal component of the incident wave vector, $n_{inc}\cos\theta$.
    pub kz_inc: f64,
    /// Normalised incident wave vector.
    pub k_inc: [f64; 3],
}

impl KSpace {
    pub fn new(
        lattice: &Lattice,
        orders: &[(i32, i32)],
        frequency: f64,
        n_inc: f64,
        theta: f64,
        phi: f64,
    ) -> Self {
        let k0 = 2.0 * std::f64::consts::PI * frequency;
        let k_inc = [
            n_inc * theta.sin() * phi.cos(),
            n_inc * theta.sin() * phi.sin(),
            n_inc * theta.cos(),
        ];
        let kx = DVector::from_iterator(
            orders.len(),
            orders
                .iter()
                .map(|&mn| Complex64::new(k_inc[0] - lattice.g_vector(mn)[0] / k0, 0.0)),
        );
        let ky = DVector::from_iterator(
            orders.len(),
            orders
                .iter()
                .map(|&mn| Complex64::new(k_inc[1] - lattice.g_vector(mn)[1] / k0, 0.0)),
        );
        Self {
            kx,
            ky,
            kz_inc: k_inc[2],
            k_inc,
        }
    }

    pub fn n_orders(&self) -> usize {
        self.kx.len()
    }

    pub fn kx_matrix(&self) -> CMatrix {
        CMatrix::from_diagonal(&self.kx)
    }

    pub fn ky_matrix(&self) -> CMatrix {
        CMatrix::from_diagonal(&self.ky)
    }

    /// Longitudinal wave numbers in a homogeneous medium of physical
    /// permittivity `eps`, decaying or outgoing along +z. Grazing orders are
    /// floored to $-j\,$[`KZ_FLOOR`].
    pub fn kz(&self, eps: Complex64) -> DVector<Complex64> {
        self.kx.zip_map(&self.ky, |kx, ky| {
            let kz = (eps - kx * kx - ky * ky).sqrt().conj();
            if kz.norm() < KZ_FLOOR {
                Complex64::new(0.0, -KZ_FLOOR)
            } else {
                kz
            }
        })
    }

    /// `Q` matrix of a homogeneous medium with permittivity `eps_eng`.
    fn q_homogeneous(&self, eps_eng: Complex64) -> CMatrix {
        let kx = self.kx_matrix();
        let ky = self.ky_matrix();
        let e = identity(self.n_orders()) * eps_eng;
        blocks(&(&kx * &ky), &(&e - &kx * &kx), &(&ky * &ky - &e), &(-(&ky * &kx)))
    }
}

/// Eigenmodes of one layer (or half-space).
#[derive(Debug, Clone)]
pub struct LayerModes {
    pub w: CMatrix,
    pub v: CMatrix,
    /// Diagonal of $\boldsymbol\Lambda$.
    pub lam: DVector<Complex64>,
}

impl LayerModes {
    /// Gap medium used to couple every S-matrix. It has zero thickness, so
    /// its permittivity is chosen per order to give $K_z = 1$ and keep $V_0$
    /// well conditioned at every angle.
    pub fn gap(k: &KSpace) -> Self {
        let n = k.n_orders();
        let kx = k.kx_matrix();
        let ky = k.ky_matrix();
        let i = identity(n);
        let q = blocks(&(&kx * &ky), &(&i + &ky * &ky), &(-(&i + &kx * &kx)), &(-(&kx * &ky)));
        Self {
            w: identity(2 * n),
            v: q * (-J),
            lam: DVector::from_element(2 * n, J),
        }
    }

    /// Analytic modes of a homogeneous layer of physical permittivity `eps`.
    pub fn homogeneous(k: &KSpace, eps: Complex64) -> Result<Self, String> {
        let kz = k.kz(eps);
        let lam = DVector::from_iterator(2 * k.n_orders(), kz.iter().chain(kz.iter()).map(|&z| J * z));
        let lam_inv = inverse(&CMatrix::from_diagonal(&lam), "homogeneous mode")?;
        Ok(Self {
            w: identity(2 * k.n_orders()),
            v: k.q_homogeneous(eps.conj()) * lam_inv,
            lam,
        })
    }

    /// Numerical modes of a patterned layer with convolution matrix `er`
    /// (built from the physical permittivity).
    pub fn patterned(k: &KSpace, er: &CMatrix) -> Result<Self, String> {
        let n = k.n_orders();
        let er = er.map(|c| c.conj());
        let er_inv = inverse(&er, "permittivity convolution")?;
        let kx = k.kx_matrix();
        let ky = k.ky_matrix();
        let i = identity(n);

        let p = blocks(
            &(&kx * &er_inv * &ky),
            &(&i - &kx * &er_inv * &kx),
            &(&ky * &er_inv * &ky - &i),
            &(-(&ky * &er_inv * &kx)),
        );
        let q = blocks(&(&kx * &ky), &(&er - &kx * &kx), &(&ky * &ky - &er), &(-(&ky * &kx)));

        let (w, eigenvalues) = eigen_decompose(&p * &q)?;
        let lam = eigenvalues.map(mode_root);
        let lam_inv = inverse(&CMatrix::from_diagonal(&lam), "mode propagation")?;
        Ok(Self {
            v: &q * &w * lam_inv,
            w,
            lam,
        })
    }

    /// Reflection half-space of real permittivity `eps`.
    ///
    /// Modes are built with the forward-going $K_z$; the S-matrix formulas in
    /// [`super::smatrix`] account for direction.
    pub fn half_space(k: &KSpace, eps: f64) -> Result<Self, String> {
        Self::homogeneous(k, Complex64::new(eps, 0.0))
    }
}

/// Principal square root, with purely propagating modes taken forward and
/// grazing modes floored like [`KSpace::kz`].
fn mode_root(lambda: Complex64) -> Complex64 {
    let root = lambda.sqrt();
    if root.norm() < KZ_FLOOR {
        Complex64::new(KZ_FLOOR, 0.0)
    } else if root.re.abs() <= 1e-12 * root.norm() && root.im < 0.0 {
        -root
    } else {
        root
    }
}

/// Eigenvectors (columns) and eigenvalues of a general complex matrix.
///
/// Delegates to `faer`'s complex eigendecomposition; columns are returned with
/// unit norm.
fn eigen_decompose(a: CMatrix) -> Result<(CMatrix, DVector<Complex64>), String> {
    let n = a.nrows();
    let mat = faer::Mat::<c64>::from_fn(n, n, |i, j| {
        let c = a[(i, j)];
        c64::new(c.re, c.im)
    });
    let evd = mat.complex_eigendecomposition();
    let s = evd.s().column_vector();
    let u = evd.u();

    let eigenvalues = DVector::from_fn(n, |k, _| {
        let c = s.read(k);
        Complex64::new(c.re, c.im)
    });
    let mut vectors = CMatrix::from_fn(n, n, |i, j| {
        let c = u.read(i, j);
        Complex64::new(c.re, c.im)
    });
    if eigenvalues.iter().chain(vectors.iter()).any(|c| !c.is_finite()) {
        return Err("eigendecomposition produced non-finite values".to_string());
    }

    for mut col in vectors.column_iter_mut() {
        let norm = col.norm();
        if norm > 0.0 {
            col.unscale_mut(norm);
        }
    }
    Ok((vectors, eigenvalues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn kspace(theta: f64) -> KSpace {
        let lattice = Lattice::from_rows([[0.5, 0.0], [0.0, 0.5]]).unwrap();
        let orders = lattice.truncated_orders(5);
        KSpace::new(&lattice, &orders, 1.0, 1.0, theta, 0.3)
    }

    #[test]
    fn test_eigen_decomposition_reconstructs_matrix() {
        let a = CMatrix::from_fn(4, 4, |i, j| {
            Complex64::new((i * 3 + j) as f64 * 0.1 + if i == j { 2.0 } else { 0.0 }, (i as f64 - j as f64) * 0.05)
        });
        let (w, lam) = eigen_decompose(a.clone()).unwrap();
        let aw = &a * &w;
        let wl = &w * CMatrix::from_diagonal(&lam);
        assert_relative_eq!((aw - wl).norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lossy_modes_decay() {
        let k = kspace(0.2);
        for kz in k.kz(Complex64::new(2.25, 0.3)).iter() {
            let lam = J * kz;
            assert!(lam.re > 0.0, "mode must decay along +z: {lam}");
        }
    }

    #[test]
    fn test_constant_pattern_matches_homogeneous_modes() {
        let k = kspace(0.0);
        let eps = Complex64::new(3.0, 0.1);
        let er = CMatrix::identity(k.n_orders(), k.n_orders()) * eps;
        let numeric = LayerModes::patterned(&k, &er).unwrap();
        let analytic = LayerModes::homogeneous(&k, eps).unwrap();
        assert_eq!(numeric.lam.len(), analytic.lam.len());
        for expected in analytic.lam.iter() {
            let closest = numeric
                .lam
                .iter()
                .map(|l| (l - expected).norm())
                .fold(f64::INFINITY, f64::min);
            assert!(closest < 1e-8, "no numerical mode near {expected}");
        }
    }

    #[test]
    fn test_grazing_order_is_floored() {
        let lattice = Lattice::from_rows([[2.0, 0.0], [0.0, 2.0]]).unwrap();
        let orders = lattice.truncated_orders(21);
        let k = KSpace::new(&lattice, &orders, 1.0, 1.0, 0.0, 0.0);
        let kz = k.kz(Complex64::new(1.0, 0.0));
        assert!(kz.iter().all(|z| z.norm() >= KZ_FLOOR));
        let grazing = kz.iter().filter(|z| z.re == 0.0 && z.im == -KZ_FLOOR).count();
        assert!(grazing > 0, "expected at least one grazing order");
        assert!(LayerModes::half_space(&k, 1.0).is_ok());
    }
}
