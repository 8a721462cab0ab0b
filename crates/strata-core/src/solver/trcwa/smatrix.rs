//! Symmetric scattering matrices and the Redheffer star product.

use num_complex::Complex64;

use super::modes::{inverse, CMatrix, LayerModes};

/// Scattering matrix relating mode amplitudes on both sides of a block.
#[derive(Debug, Clone)]
pub struct SMatrix {
    pub s11: CMatrix,
    pub s12: CMatrix,
    pub s21: CMatrix,
    pub s22: CMatrix,
}

impl SMatrix {
    /// The S-matrix of nothing: full transmission, no reflection.
    pub fn identity(size: usize) -> Self {
        Self {
            s11: CMatrix::zeros(size, size),
            s12: CMatrix::identity(size, size),
            s21: CMatrix::identity(size, size),
            s22: CMatrix::zeros(size, size),
        }
    }

    /// Layer of thickness `thickness_k0` (thickness times $k_0$) embedded in the gap medium.
    pub fn layer(layer: &LayerModes, gap: &LayerModes, thickness_k0: f64) -> Result<Self, String> {
        let w_inv = inverse(&layer.w, "layer mode")?;
        let v_inv = inverse(&layer.v, "layer magnetic mode")?;
        let wg = &w_inv * &gap.w;
        let vg = &v_inv * &gap.v;
        let a = &wg + &vg;
        let b = &wg - &vg;
        let a_inv = inverse(&a, "layer coupling")?;
        let x = CMatrix::from_diagonal(&layer.lam.map(|l| (-l * thickness_k0).exp()));

        let xb = &x * &b;
        let xba_inv = &xb * &a_inv;
        let d = inverse(&(&a - &xba_inv * &xb), "layer denominator")?;
        let s11 = &d * (&xba_inv * &x * &a - &b);
        let s12 = &d * &x * (&a - &b * &a_inv * &b);
        Ok(Self {
            s22: s11.clone(),
            s21: s12.clone(),
            s11,
            s12,
        })
    }

    /// Incidence half-space on the source side of the stack.
    pub fn reflection_side(region: &LayerModes, gap: &LayerModes) -> Result<Self, String> {
        let (a, b) = coupling(region, gap)?;
        let a_inv = inverse(&a, "reflection-side coupling")?;
        Ok(Self {
            s11: -(&a_inv * &b),
            s12: &a_inv * Complex64::new(2.0, 0.0),
            s21: (&a - &b * &a_inv * &b) * Complex64::new(0.5, 0.0),
            s22: &b * &a_inv,
        })
    }

    /// Substrate half-space past the last layer.
    pub fn transmission_side(region: &LayerModes, gap: &LayerModes) -> Result<Self, String> {
        let (a, b) = coupling(region, gap)?;
        let a_inv = inverse(&a, "transmission-side coupling")?;
        Ok(Self {
            s11: &b * &a_inv,
            s12: (&a - &b * &a_inv * &b) * Complex64::new(0.5, 0.0),
            s21: &a_inv * Complex64::new(2.0, 0.0),
            s22: -(&a_inv * &b),
        })
    }

    /// Redheffer star product `self ⊗ other` (self on the source side).
    pub fn star(&self, other: &SMatrix) -> Result<Self, String> {
        let n = self.s11.nrows();
        let i = CMatrix::identity(n, n);
        let d = &self.s12 * inverse(&(&i - &other.s11 * &self.s22), "star product")?;
        let f = &other.s21 * inverse(&(&i - &self.s22 * &other.s11), "star product")?;
        Ok(Self {
            s11: &self.s11 + &d * &other.s11 * &self.s21,
            s12: &d * &other.s12,
            s21: &f * &self.s21,
            s22: &other.s22 + &f * &self.s22 * &other.s12,
        })
    }
}

/// Coupling matrices $A = W_0^{-1}W + V_0^{-1}V$ and $B = W_0^{-1}W - V_0^{-1}V$
/// between the gap medium and a half-space.
fn coupling(region: &LayerModes, gap: &LayerModes) -> Result<(CMatrix, CMatrix), String> {
    let w = inverse(&gap.w, "gap mode")? * &region.w;
    let v = inverse(&gap.v, "gap magnetic mode")? * &region.v;
    Ok((&w + &v, &w - &v))
}
