//! Stateless conversions between physical units and simulation units.
//!
//! Wavelengths in simulation units are multiples of
//! [`UNIT_MAGNITUDE`]; frequencies in simulation units are their
//! reciprocals (cycles per µm).

use crate::constants::{EPS_0, PI, SPEED_OF_LIGHT, UNIT_MAGNITUDE};

/// Physical wavelength (m) → wavelength in simulation units.
pub fn phys_wl_to_wl(wavelength_m: f64) -> f64 {
    wavelength_m / UNIT_MAGNITUDE
}

/// Wavelength in simulation units → physical wavelength (m).
pub fn wl_to_phys_wl(wavelength: f64) -> f64 {
    wavelength * UNIT_MAGNITUDE
}

pub fn wl_to_freq(wavelength: f64) -> f64 {
    1.0 / wavelength
}

pub fn freq_to_wl(frequency: f64) -> f64 {
    1.0 / frequency
}

/// Simulation-unit frequency → physical wavelength (m).
pub fn freq_to_phys_wl(frequency: f64) -> f64 {
    wl_to_phys_wl(freq_to_wl(frequency))
}

/// Physical wavelength (m) → simulation-unit frequency.
pub fn phys_wl_to_freq(wavelength_m: f64) -> f64 {
    wl_to_freq(phys_wl_to_wl(wavelength_m))
}

/// Simulation-unit frequency → temporal frequency (Hz).
pub fn freq_to_hz(frequency: f64) -> f64 {
    frequency * SPEED_OF_LIGHT / UNIT_MAGNITUDE
}

/// Conductivity (S/m) reproducing the loss of `imag_eps` at `wavelength_m`.
///
/// $\sigma = \epsilon_2 \, \omega \, \epsilon_0$ with $\omega = 2\pi c / \lambda$.
pub fn imag_eps_to_conductivity(imag_eps: f64, wavelength_m: f64) -> f64 {
    imag_eps * SPEED_OF_LIGHT / wavelength_m * 2.0 * PI * EPS_0
}
