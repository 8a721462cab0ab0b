//! Target-frequency discretisation of a physical wavelength interval.
//!
//! Wavelengths are sampled between the two bounds (inclusive) under a
//! [`FreqDistribution`] and converted to simulation-unit frequencies
//! $f = \text{UNIT\_MAGNITUDE} / \lambda$. The resulting sequence is ordered
//! by wavelength: the first entry corresponds to the shortest wavelength,
//! so raw frequency values *decrease* along the sequence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::{freq_to_phys_wl, phys_wl_to_freq};

/// Errors from target-frequency generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrequencyError {
    #[error("Unknown frequency distribution '{0}' (expected 'linear' or 'log')")]
    UnknownDistribution(String),

    #[error("Wavelength range must satisfy 0 < min < max, got [{min:e}, {max:e}]")]
    InvalidRange { min: f64, max: f64 },

    #[error("At least one target frequency is required")]
    Empty,
}

/// Sampling law for wavelengths inside the target range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreqDistribution {
    /// Evenly spaced in wavelength.
    Linear,
    /// Evenly spaced in log-wavelength.
    Log,
}

impl FromStr for FreqDistribution {
    type Err = FrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "log" => Ok(Self::Log),
            other => Err(FrequencyError::UnknownDistribution(other.to_string())),
        }
    }
}

impl fmt::Display for FreqDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::Log => f.write_str("log"),
        }
    }
}

/// Ordered simulation-unit frequencies at which spectra are evaluated.
///
/// Entry `i` of every [`SpectrumResult`](crate::types::SpectrumResult) channel
/// and frequency index `i` of a
/// [`PermittivityGrid`](crate::types::PermittivityGrid) refer to `self[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetFrequencies(Vec<f64>);

impl TargetFrequencies {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.0.iter()
    }

    /// Physical wavelength (m) of every entry.
    pub fn physical_wavelengths(&self) -> Vec<f64> {
        self.0.iter().map(|&f| freq_to_phys_wl(f)).collect()
    }
}

impl std::ops::Index<usize> for TargetFrequencies {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a TargetFrequencies {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Compute `count` target frequencies spanning `[min_wavelength, max_wavelength]` (metres).
///
/// The first entry maps back to `min_wavelength` and the last to
/// `max_wavelength`; both endpoints are placed exactly rather than
/// accumulated, so the round trip holds to floating-point precision.
pub fn compute_target_frequencies(
    min_wavelength: f64,
    max_wavelength: f64,
    count: usize,
    distribution: FreqDistribution,
) -> Result<TargetFrequencies, FrequencyError> {
    if !(min_wavelength > 0.0 && min_wavelength < max_wavelength && max_wavelength.is_finite()) {
        return Err(FrequencyError::InvalidRange {
            min: min_wavelength,
            max: max_wavelength,
        });
    }
    if count == 0 {
        return Err(FrequencyError::Empty);
    }
    if count == 1 {
        return Ok(TargetFrequencies(vec![phys_wl_to_freq(min_wavelength)]));
    }

    let last = (count - 1) as f64;
    let wavelengths = (0..count).map(|i| {
        if i == 0 {
            return min_wavelength;
        }
        if i == count - 1 {
            return max_wavelength;
        }
        let t = i as f64 / last;
        match distribution {
            FreqDistribution::Linear => min_wavelength + (max_wavelength - min_wavelength) * t,
            FreqDistribution::Log => {
                let (lo, hi) = (min_wavelength.ln(), max_wavelength.ln());
                (lo + (hi - lo) * t).exp()
            }
        }
    });

    Ok(TargetFrequencies(wavelengths.map(phys_wl_to_freq).collect()))
}
