//! Sellmeier dispersion models for transparent dielectrics and semiconductors.
//!
//! The relative permittivity is real and follows
//!
//! $$\epsilon(\lambda) = A + \sum_i \frac{B_i \lambda^2}{\lambda^2 - C_i} - D \lambda^2$$
//!
//! with $\lambda$ in micrometres. Coefficients are published room-temperature
//! fits; the application windows below extend them into the mid-infrared,
//! where lattice absorption bands are not modelled.
//!
//! | Identifier | Constructor | Window (µm) |
//! |-----------|-------------|-------------|
//! | `titanium_oxide` | [`SellmeierMaterial::titanium_oxide()`] | 0.4–20 |
//! | `zinc_oxide` | [`SellmeierMaterial::zinc_oxide()`] | 0.4–20 |
//! | `gallium_arsenide` | [`SellmeierMaterial::gallium_arsenide()`] | 0.9–20 |
//! | `silicon_nitride` | [`SellmeierMaterial::silicon_nitride()`] | 0.31–10 |

use num_complex::Complex64;

use crate::provider::{check_range, MaterialError, MaterialProvider};

/// Sellmeier-type dielectric with a real permittivity.
#[derive(Debug, Clone)]
pub struct SellmeierMaterial {
    name: String,
    /// Constant term $A$.
    a: f64,
    /// Resonance terms $(B_i, C_i)$, $C_i$ in µm².
    terms: Vec<(f64, f64)>,
    /// Infrared correction $D$ (µm⁻²).
    d: f64,
    /// Application window in metres.
    range_m: (f64, f64),
}

impl SellmeierMaterial {
    /// Construct from coefficients.
    ///
    /// # Arguments
    /// * `name` — Material identifier.
    /// * `a` — Constant term.
    /// * `terms` — $(B_i, C_i)$ pairs, $C_i$ in µm².
    /// * `d` — Infrared $\lambda^2$ correction.
    /// * `range_um` — Application window in micrometres.
    pub fn new(
        name: impl Into<String>,
        a: f64,
        terms: Vec<(f64, f64)>,
        d: f64,
        range_um: (f64, f64),
    ) -> Self {
        Self {
            name: name.into(),
            a,
            terms,
            d,
            range_m: (range_um.0 * 1e-6, range_um.1 * 1e-6),
        }
    }

    /// Rutile TiO₂, ordinary ray (DeVore 1951), rewritten in λ²-numerator form.
    pub fn titanium_oxide() -> Self {
        Self::new("titanium_oxide", 2.8732, vec![(3.0398, 0.0803)], 0.0, (0.4, 20.0))
    }

    /// Wurtzite ZnO, ordinary ray (Bond 1965).
    pub fn zinc_oxide() -> Self {
        Self::new(
            "zinc_oxide",
            2.81418,
            vec![(0.87968, 0.3042 * 0.3042)],
            0.00711,
            (0.4, 20.0),
        )
    }

    /// GaAs two-oscillator fit (Marple 1964).
    pub fn gallium_arsenide() -> Self {
        Self::new(
            "gallium_arsenide",
            3.5,
            vec![(7.4969, 0.4082 * 0.4082), (1.9347, 37.17 * 37.17)],
            0.0,
            (0.9, 20.0),
        )
    }

    /// Stoichiometric Si₃N₄ (Luke et al. 2015).
    pub fn silicon_nitride() -> Self {
        Self::new(
            "silicon_nitride",
            1.0,
            vec![(3.0249, 0.135_340_6 * 0.135_340_6), (40314.0, 1239.842 * 1239.842)],
            0.0,
            (0.31, 10.0),
        )
    }

    fn epsilon_at_um(&self, lambda_um: f64) -> f64 {
        let l2 = lambda_um * lambda_um;
        let resonances: f64 = self.terms.iter().map(|&(b, c)| b * l2 / (l2 - c)).sum();
        self.a + resonances - self.d * l2
    }
}

impl MaterialProvider for SellmeierMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.range_m
    }

    fn dielectric_function(&self, wavelength_m: f64) -> Result<Complex64, MaterialError> {
        check_range(wavelength_m, self.range_m)?;
        Ok(Complex64::new(self.epsilon_at_um(wavelength_m * 1e6), 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tio2_matches_devore_form() {
        // DeVore: n² = 5.913 + 0.2441 / (λ² − 0.0803)
        let mat = SellmeierMaterial::titanium_oxide();
        for &lambda_um in &[0.6, 1.0, 2.5, 8.0] {
            let devore = 5.913 + 0.2441 / (lambda_um * lambda_um - 0.0803);
            let eps = mat.dielectric_function(lambda_um * 1e-6).unwrap();
            assert_relative_eq!(eps.re, devore, max_relative = 1e-4);
            assert_eq!(eps.im, 0.0);
        }
    }

    #[test]
    fn test_refractive_indices_near_1um() {
        let cases = [
            (SellmeierMaterial::titanium_oxide(), 2.49),
            (SellmeierMaterial::zinc_oxide(), 1.93),
            (SellmeierMaterial::gallium_arsenide(), 3.53),
            (SellmeierMaterial::silicon_nitride(), 2.01),
        ];
        for (mat, expected) in cases {
            let n = mat.refractive_index(1e-6).unwrap();
            assert!(
                (n.re - expected).abs() < 0.03,
                "{}: n(1 µm) = {:.3}, expected ≈ {}",
                mat.name(),
                n.re,
                expected
            );
        }
    }

    #[test]
    fn test_normal_dispersion_in_window() {
        // Index decreases with wavelength away from the UV resonance.
        let mat = SellmeierMaterial::gallium_arsenide();
        let n1 = mat.refractive_index(1.2e-6).unwrap().re;
        let n2 = mat.refractive_index(4.0e-6).unwrap().re;
        assert!(n1 > n2);
    }

    #[test]
    fn test_out_of_window_is_rejected() {
        let mat = SellmeierMaterial::silicon_nitride();
        assert!(matches!(
            mat.dielectric_function(12e-6),
            Err(MaterialError::OutOfRange { .. })
        ));
        assert!(mat.dielectric_function(0.2e-6).is_err());
    }
}
