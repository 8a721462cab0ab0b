//! Material property provider trait.
//!
//! All material models implement [`MaterialProvider`], which returns the
//! wavelength-dependent complex relative permittivity
//! $\epsilon = \epsilon_1 + i\epsilon_2$ with $\epsilon_2 \geq 0$ for
//! passive media.

use num_complex::Complex64;
use thiserror::Error;

/// Errors from material providers.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Wavelength {wavelength_m:.3e} m is outside the model range [{min:.3e}, {max:.3e}] m")]
    OutOfRange {
        wavelength_m: f64,
        min: f64,
        max: f64,
    },

    #[error("Material not found: {0}")]
    NotFound(String),
}

/// Provides wavelength-dependent material properties.
pub trait MaterialProvider: Send + Sync {
    /// Identifier of this material (as accepted by [`crate::by_name`]).
    fn name(&self) -> &str;

    /// Wavelength range over which the model is applied (metres).
    fn wavelength_range(&self) -> (f64, f64);

    /// Complex relative permittivity $\epsilon(\lambda)$ at a wavelength in metres.
    fn dielectric_function(&self, wavelength_m: f64) -> Result<Complex64, MaterialError>;

    /// Complex refractive index $\tilde{n} = n + ik$ at a given wavelength.
    ///
    /// Default implementation derives from $\epsilon = \tilde{n}^2$.
    fn refractive_index(&self, wavelength_m: f64) -> Result<Complex64, MaterialError> {
        let eps = self.dielectric_function(wavelength_m)?;
        Ok(eps.sqrt())
    }
}

/// Relative slack on the range ends, absorbing unit-conversion round-off.
const RANGE_SLACK: f64 = 1e-9;

/// Reject wavelengths outside `range`.
pub(crate) fn check_range(wavelength_m: f64, range: (f64, f64)) -> Result<(), MaterialError> {
    let (min, max) = range;
    let inside = wavelength_m >= min * (1.0 - RANGE_SLACK) && wavelength_m <= max * (1.0 + RANGE_SLACK);
    if !inside || !wavelength_m.is_finite() {
        return Err(MaterialError::OutOfRange {
            wavelength_m,
            min,
            max,
        });
    }
    Ok(())
}
