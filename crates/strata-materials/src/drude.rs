//! Drude free-electron model for metals in the infrared.
//!
//! $$\epsilon(\omega) = 1 - \frac{\omega_p^2}{\omega(\omega + i\omega_\tau)}$$
//!
//! with all frequencies expressed as wavenumbers (cm⁻¹), so that
//! $\omega = 10^4 / \lambda_{\mu m}$. Parameters are the infrared fits of
//! Ordal et al. (*Appl. Opt.* **22**, 1099, 1983; **24**, 4493, 1985).

use num_complex::Complex64;

use crate::provider::{check_range, MaterialError, MaterialProvider};

/// Drude metal parameterised by plasma and damping wavenumbers.
#[derive(Debug, Clone)]
pub struct DrudeMaterial {
    name: String,
    /// Plasma wavenumber $\omega_p$ (cm⁻¹).
    plasma_cm: f64,
    /// Damping wavenumber $\omega_\tau$ (cm⁻¹).
    damping_cm: f64,
    range_m: (f64, f64),
}

impl DrudeMaterial {
    pub fn new(name: impl Into<String>, plasma_cm: f64, damping_cm: f64) -> Self {
        Self {
            name: name.into(),
            plasma_cm,
            damping_cm,
            range_m: (1.0e-6, 50.0e-6),
        }
    }

    pub fn gold() -> Self {
        Self::new("gold", 7.25e4, 2.15e2)
    }

    pub fn silver() -> Self {
        Self::new("silver", 7.27e4, 1.45e2)
    }

    pub fn aluminium() -> Self {
        Self::new("aluminium", 1.19e5, 6.60e2)
    }

    /// Zirconium, a transition metal with heavy damping. The plasma energy
    /// of about 4.5 eV and damping of about 0.6 eV are free-electron estimates,
    /// not an Ordal fit.
    pub fn zirconium() -> Self {
        Self::new("zirconium", 3.63e4, 4.84e3)
    }
}

impl MaterialProvider for DrudeMaterial {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        self.range_m
    }

    fn dielectric_function(&self, wavelength_m: f64) -> Result<Complex64, MaterialError> {
        check_range(wavelength_m, self.range_m)?;
        let omega = 1e-2 / wavelength_m;
        let denom = Complex64::new(omega * omega, omega * self.damping_cm);
        Ok(Complex64::new(1.0, 0.0) - self.plasma_cm * self.plasma_cm / denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gold_is_metallic_and_lossy() {
        let gold = DrudeMaterial::gold();
        let eps = gold.dielectric_function(5e-6).unwrap();
        assert!(eps.re < -100.0, "Au ε₁ at 5 µm should be strongly negative, got {}", eps.re);
        assert!(eps.im > 0.0, "Au ε₂ must be positive for a passive medium");
    }

    #[test]
    fn test_zirconium_is_a_lossier_metal_than_gold() {
        let zr = DrudeMaterial::zirconium().dielectric_function(5e-6).unwrap();
        let au = DrudeMaterial::gold().dielectric_function(5e-6).unwrap();
        assert!(zr.re < 0.0);
        assert!(zr.im / zr.re.abs() > au.im / au.re.abs());
    }

    #[test]
    fn test_loss_grows_with_wavelength() {
        let al = DrudeMaterial::aluminium();
        let short = al.dielectric_function(2e-6).unwrap();
        let long = al.dielectric_function(10e-6).unwrap();
        assert!(long.im > short.im);
    }
}
