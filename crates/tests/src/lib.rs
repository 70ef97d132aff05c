//! Integration tests for the equalizer engine
//!
//! The library part only holds signal helpers; the tests themselves live in
//! the `cfg(test)` modules below and exercise the engine end to end.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SAMPLE_RATE: f64 = 48000.0;
pub const CHANNELS: i32 = 2;
pub const BLOCK: usize = 512;

/// Sine wave with peak amplitude `amplitude`
pub fn generate_sine_wave(freq: f32, amplitude: f32, frames: usize) -> Vec<f32> {
    let step = std::f64::consts::TAU * f64::from(freq) / SAMPLE_RATE;
    (0..frames)
        .map(|i| amplitude * (step * i as f64).sin() as f32)
        .collect()
}

/// Uniform white noise in `[-amplitude, amplitude)`, reproducible per seed
pub fn generate_white_noise(frames: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..frames)
        .map(|_| amplitude * (rng.gen::<f32>() * 2.0 - 1.0))
        .collect()
}

pub fn generate_silence(frames: usize) -> Vec<f32> {
    vec![0.0; frames]
}

pub fn calc_rms(buffer: &[f32]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = buffer.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_sq / buffer.len() as f64).sqrt() as f32
}

pub fn calc_peak(buffer: &[f32]) -> f32 {
    buffer.iter().map(|&s| s.abs()).fold(0.0f32, f32::max)
}

/// Convert linear amplitude to decibels
pub fn amplitude_to_db(amp: f32) -> f32 {
    if amp <= 0.0 {
        -200.0
    } else {
        20.0 * amp.log10()
    }
}

#[cfg(test)]
mod allocation;
#[cfg(test)]
mod eq_integration;
