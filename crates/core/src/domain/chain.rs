//! Per-channel serial filter chain
//!
//! Fixed topology, in processing order:
//!
//! ```text
//! input trim → HP2 (biquad) → HP1 (one-pole) → LF shelf → LMF peak
//!            → HMF peak → HF shelf → LP2 (biquad) → output trim
//! ```
//!
//! HP2 and HP1 together form the 18 dB/oct high-pass. Shelves bracket the
//! two peaking bands.

use crate::domain::biquad::{BiquadCoeffs, BiquadFilter, OnePoleCoeffs, OnePoleHighPass};
use crate::domain::smoothing::Trims;
use serde::{Deserialize, Serialize};

/// Coefficients for every section of the chain
///
/// One set is shared by all channels; only filter history is per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainCoeffs {
    pub hp2: BiquadCoeffs,
    pub hp1: OnePoleCoeffs,
    pub lf: BiquadCoeffs,
    pub lmf: BiquadCoeffs,
    pub hmf: BiquadCoeffs,
    pub hf: BiquadCoeffs,
    pub lp2: BiquadCoeffs,
}

impl ChainCoeffs {
    /// Magnitude of the whole filter cascade at `freq` Hz, in dB (trims excluded)
    pub fn magnitude_db(&self, sample_rate: f64, freq: f64) -> f64 {
        let response = self.hp2.response(sample_rate, freq)
            * self.hp1.response(sample_rate, freq)
            * self.lf.response(sample_rate, freq)
            * self.lmf.response(sample_rate, freq)
            * self.hmf.response(sample_rate, freq)
            * self.hf.response(sample_rate, freq)
            * self.lp2.response(sample_rate, freq);
        20.0 * response.norm().max(1.0e-12).log10()
    }
}

/// Filter history for one channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelChain {
    hp2: BiquadFilter,
    hp1: OnePoleHighPass,
    lf: BiquadFilter,
    lmf: BiquadFilter,
    hmf: BiquadFilter,
    hf: BiquadFilter,
    lp2: BiquadFilter,
}

impl ChannelChain {
    pub fn new(coeffs: &ChainCoeffs) -> Self {
        let mut chain = Self::default();
        chain.load(coeffs);
        chain
    }

    /// Load a full coefficient set, keeping history
    pub fn load(&mut self, coeffs: &ChainCoeffs) {
        self.hp2.set_coeffs(coeffs.hp2);
        self.hp1.set_coeffs(coeffs.hp1);
        self.lf.set_coeffs(coeffs.lf);
        self.lmf.set_coeffs(coeffs.lmf);
        self.hmf.set_coeffs(coeffs.hmf);
        self.hf.set_coeffs(coeffs.hf);
        self.lp2.set_coeffs(coeffs.lp2);
    }

    pub fn set_high_pass(&mut self, hp2: BiquadCoeffs, hp1: OnePoleCoeffs) {
        self.hp2.set_coeffs(hp2);
        self.hp1.set_coeffs(hp1);
    }

    pub fn set_low_pass(&mut self, coeffs: BiquadCoeffs) {
        self.lp2.set_coeffs(coeffs);
    }

    pub fn set_low_shelf(&mut self, coeffs: BiquadCoeffs) {
        self.lf.set_coeffs(coeffs);
    }

    pub fn set_low_mid(&mut self, coeffs: BiquadCoeffs) {
        self.lmf.set_coeffs(coeffs);
    }

    pub fn set_high_mid(&mut self, coeffs: BiquadCoeffs) {
        self.hmf.set_coeffs(coeffs);
    }

    pub fn set_high_shelf(&mut self, coeffs: BiquadCoeffs) {
        self.hf.set_coeffs(coeffs);
    }

    /// Run one sample through trim, filters and trim
    #[inline]
    pub fn process_sample(&mut self, x: f32, trims: Trims) -> f32 {
        let mut y = x * trims.input;
        y = self.hp2.process_sample(y);
        y = self.hp1.process_sample(y);
        y = self.lf.process_sample(y);
        y = self.lmf.process_sample(y);
        y = self.hmf.process_sample(y);
        y = self.hf.process_sample(y);
        y = self.lp2.process_sample(y);
        y * trims.output
    }

    /// Zero all history; coefficients are kept
    pub fn reset(&mut self) {
        self.hp2.reset();
        self.hp1.reset();
        self.lf.reset();
        self.lmf.reset();
        self.hmf.reset();
        self.hf.reset();
        self.lp2.reset();
    }
}
