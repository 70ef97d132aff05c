//! Test signal generation and level measurement

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Kind of generated test signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Sine,
    Noise,
    Impulse,
}

/// Generate `frames` samples with peak amplitude `level_db` dBFS
pub fn generate(
    kind: SignalKind,
    freq: f32,
    sample_rate: f64,
    frames: usize,
    level_db: f32,
    seed: u64,
) -> Vec<f32> {
    let amplitude = 10.0_f32.powf(level_db / 20.0);

    match kind {
        SignalKind::Sine => {
            let step = std::f64::consts::TAU * f64::from(freq) / sample_rate;
            (0..frames)
                .map(|i| amplitude * (step * i as f64).sin() as f32)
                .collect()
        }
        SignalKind::Noise => {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..frames)
                .map(|_| amplitude * (rng.gen::<f32>() * 2.0 - 1.0))
                .collect()
        }
        SignalKind::Impulse => {
            let mut signal = vec![0.0; frames];
            if let Some(first) = signal.first_mut() {
                *first = amplitude;
            }
            signal
        }
    }
}

/// RMS and peak of a buffer in dBFS
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Levels {
    pub rms_dbfs: f32,
    pub peak_dbfs: f32,
}

impl Levels {
    pub fn measure(buffer: &[f32]) -> Self {
        let peak = buffer.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        let rms = if buffer.is_empty() {
            0.0
        } else {
            (buffer.iter().map(|&s| s * s).sum::<f32>() / buffer.len() as f32).sqrt()
        };

        Self {
            rms_dbfs: amplitude_to_db(rms),
            peak_dbfs: amplitude_to_db(peak),
        }
    }
}

/// Convert linear amplitude to decibels, floored at -200 dB
pub fn amplitude_to_db(amp: f32) -> f32 {
    if amp <= 1.0e-10 {
        -200.0
    } else {
        20.0 * amp.log10()
    }
}
