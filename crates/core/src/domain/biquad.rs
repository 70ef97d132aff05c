//! IIR filter sections used by the equalizer chain
//!
//! Second-order designs follow the RBJ Audio EQ Cookbook (bilinear transform
//! with frequency pre-warping). Coefficients are designed in double precision
//! and stored as `f32`, normalized so that `a0 == 1`.
//!
//! Every section here is a plain value type: coefficient sets are `Copy` and
//! can be broadcast to any number of per-channel filter states.

use crate::domain::denormal::flush_denormal;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Fixed Q of the high-pass, low-pass and shelving sections (Butterworth)
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Highest design frequency as a fraction of the sample rate.
///
/// Keeps the bilinear pre-warp away from the pole of `tan` at Nyquist.
const MAX_FREQ_RATIO: f64 = 0.49;

/// Lowest accepted Q for any section
const MIN_Q: f64 = 0.01;

/// Angular frequency for a design, with the cutoff clamped into `(0, 0.49·sr]`
fn omega(sample_rate: f64, freq: f32) -> f64 {
    let freq = f64::from(freq).clamp(1.0e-3, MAX_FREQ_RATIO * sample_rate);
    2.0 * PI * freq / sample_rate
}

fn db_to_shelf_amplitude(gain_db: f32) -> f64 {
    10.0_f64.powf(f64::from(gain_db) / 40.0)
}

/// Biquad filter coefficients
///
/// Direct Form I transfer function:
/// `H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        }
    }

    /// 12 dB/oct high-pass
    #[must_use]
    pub fn high_pass(sample_rate: f64, freq: f32, q: f32) -> Self {
        let w0 = omega(sample_rate, freq);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * f64::from(q).max(MIN_Q));

        Self::normalized(
            (1.0 + cos_w0) / 2.0,
            -(1.0 + cos_w0),
            (1.0 + cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// 12 dB/oct low-pass
    #[must_use]
    pub fn low_pass(sample_rate: f64, freq: f32, q: f32) -> Self {
        let w0 = omega(sample_rate, freq);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * f64::from(q).max(MIN_Q));

        Self::normalized(
            (1.0 - cos_w0) / 2.0,
            1.0 - cos_w0,
            (1.0 - cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Calculate coefficients for a low shelf filter
    ///
    /// Boosts or cuts frequencies below the corner frequency.
    ///
    /// # Parameters
    /// - `sample_rate`: Audio sample rate in Hz
    /// - `freq`: Corner frequency in Hz
    /// - `gain_db`: Boost/cut in decibels
    /// - `q`: Shelf slope Q, [`BUTTERWORTH_Q`] in the chain
    #[must_use]
    pub fn low_shelf(sample_rate: f64, freq: f32, gain_db: f32, q: f32) -> Self {
        let a = db_to_shelf_amplitude(gain_db);
        let w0 = omega(sample_rate, freq);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * f64::from(q).max(MIN_Q));
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
            a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
            (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
            (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
        )
    }

    /// Calculate coefficients for a high shelf filter
    ///
    /// Boosts or cuts frequencies above the corner frequency.
    #[must_use]
    pub fn high_shelf(sample_rate: f64, freq: f32, gain_db: f32, q: f32) -> Self {
        let a = db_to_shelf_amplitude(gain_db);
        let w0 = omega(sample_rate, freq);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * f64::from(q).max(MIN_Q));
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
            a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
            (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
        )
    }

    /// Calculate coefficients for a peaking EQ filter
    ///
    /// Boosts or cuts frequencies around a center frequency.
    #[must_use]
    pub fn peaking(sample_rate: f64, freq: f32, gain_db: f32, q: f32) -> Self {
        let a = db_to_shelf_amplitude(gain_db);
        let w0 = omega(sample_rate, freq);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * f64::from(q).max(MIN_Q));

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos_w0,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w0,
            1.0 - alpha / a,
        )
    }

    /// Complex frequency response at `freq` Hz
    pub fn response(&self, sample_rate: f64, freq: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -2.0 * PI * freq / sample_rate);
        let z2 = z1 * z1;
        let num = f64::from(self.b0) + f64::from(self.b1) * z1 + f64::from(self.b2) * z2;
        let den = 1.0 + f64::from(self.a1) * z1 + f64::from(self.a2) * z2;
        num / den
    }

    /// Magnitude response at `freq` Hz, in dB
    pub fn magnitude_db(&self, sample_rate: f64, freq: f64) -> f64 {
        20.0 * self.response(sample_rate, freq).norm().max(1.0e-12).log10()
    }
}

/// Stateful biquad filter using Direct Form I
///
/// Direct Form I is chosen over Transposed Direct Form II for:
/// - Better numerical stability with low-frequency filters
/// - Coefficient swaps mid-stream without internal-state artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    // Previous input samples (x[n-1], x[n-2])
    x1: f32,
    x2: f32,
    // Previous output samples (y[n-1], y[n-2])
    y1: f32,
    y2: f32,
}

impl Default for BiquadFilter {
    fn default() -> Self {
        Self::bypass()
    }
}

impl BiquadFilter {
    /// Create a new biquad filter with given coefficients
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Create a bypass filter (unity gain)
    pub fn bypass() -> Self {
        Self::new(BiquadCoeffs::default())
    }

    /// Update filter coefficients, keeping the history
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = flush_denormal(y);

        self.y1
    }

    /// Process a buffer of samples in place
    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// First-order (6 dB/oct) section coefficients
///
/// Evaluated as `y[n] = b0·x[n] + b1·x[n-1] + a1·y[n-1]`; note the sign of
/// the feedback term differs from [`BiquadCoeffs`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnePoleCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub a1: f32,
}

impl Default for OnePoleCoeffs {
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            a1: 0.0,
        }
    }
}

impl OnePoleCoeffs {
    /// One-pole, one-zero high-pass via the bilinear transform
    #[must_use]
    pub fn high_pass(sample_rate: f64, freq: f32) -> Self {
        let k = (omega(sample_rate, freq) / 2.0).tan();
        let a0 = 1.0 / (1.0 + k);

        Self {
            b0: a0 as f32,
            b1: -a0 as f32,
            a1: ((1.0 - k) / (1.0 + k)) as f32,
        }
    }

    /// Complex frequency response at `freq` Hz
    pub fn response(&self, sample_rate: f64, freq: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -2.0 * PI * freq / sample_rate);
        (f64::from(self.b0) + f64::from(self.b1) * z1) / (1.0 - f64::from(self.a1) * z1)
    }

    /// Magnitude response at `freq` Hz, in dB
    pub fn magnitude_db(&self, sample_rate: f64, freq: f64) -> f64 {
        20.0 * self.response(sample_rate, freq).norm().max(1.0e-12).log10()
    }
}

/// First-order high-pass filter state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnePoleHighPass {
    coeffs: OnePoleCoeffs,
    x1: f32,
    y1: f32,
}

impl OnePoleHighPass {
    pub fn new(coeffs: OnePoleCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            y1: 0.0,
        }
    }

    pub fn set_coeffs(&mut self, coeffs: OnePoleCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coeffs(&self) -> &OnePoleCoeffs {
        &self.coeffs
    }

    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.a1 * self.y1;

        self.x1 = x;
        self.y1 = flush_denormal(y);

        self.y1
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}
