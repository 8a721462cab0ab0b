//! Source time signals.

use std::f64::consts::PI;

/// Periods of the raised-cosine ramp at the start of a continuous wave.
const RAMP_PERIODS: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    /// Sine-modulated Gaussian $e^{-((t-t_0)/\tau)^2}\sin(2\pi f_c (t-t_0))$.
    Pulse { carrier_hz: f64, tau: f64, t0: f64 },
    /// Sinusoid at `frequency_hz` switched on with a raised-cosine ramp.
    Continuous { frequency_hz: f64 },
}

impl Waveform {
    /// Pulse centred on `carrier_hz` whose spectrum covers `[f_min, f_max]`.
    ///
    /// The Gaussian width is chosen so the envelope has fallen to about 10 %
    /// at the farther band edge. A zero-width band falls back to a quarter of
    /// the carrier.
    pub fn pulse_covering(carrier_hz: f64, f_min: f64, f_max: f64) -> Self {
        let half_band = (f_max - carrier_hz)
            .max(carrier_hz - f_min)
            .max(0.25 * carrier_hz);
        let tau = 1.5 / (PI * half_band);
        Self::Pulse {
            carrier_hz,
            tau,
            t0: 4.0 * tau,
        }
    }

    pub fn continuous(frequency_hz: f64) -> Self {
        Self::Continuous { frequency_hz }
    }

    pub fn value(&self, t: f64) -> f64 {
        match *self {
            Self::Pulse { carrier_hz, tau, t0 } => {
                let s = t - t0;
                (-(s / tau).powi(2)).exp() * (2.0 * PI * carrier_hz * s).sin()
            }
            Self::Continuous { frequency_hz } => {
                let ramp_time = RAMP_PERIODS / frequency_hz;
                let envelope = if t < ramp_time {
                    0.5 * (1.0 - (PI * t / ramp_time).cos())
                } else {
                    1.0
                };
                envelope * (2.0 * PI * frequency_hz * t).sin()
            }
        }
    }

    /// Time after which the source is negligible (pulse) or steady (continuous wave).
    pub fn settle_time(&self) -> f64 {
        match *self {
            Self::Pulse { t0, .. } => 2.0 * t0,
            Self::Continuous { frequency_hz } => RAMP_PERIODS / frequency_hz,
        }
    }
}
