//! Host-side channel strip: parameter delivery and bypass crossfade
//!
//! The engine has no notion of bypass. [`ChannelStrip`] pulls one
//! [`ParameterSnapshot`] per block from a [`ParameterSource`], forwards the
//! targets, and crossfades between the processed and the dry signal when the
//! bypass switch flips. Once fully bypassed, the engine is not called at all.

use crate::domain::config::StripConfig;
use crate::domain::engine::EqEngine;
use crate::domain::params::ParameterSource;
use tracing::debug;

/// Equalizer engine wrapped with per-block parameter delivery and bypass
#[derive(Debug)]
pub struct ChannelStrip {
    engine: EqEngine,
    dry: Vec<Vec<f32>>,
    fade_step: f32,
    wet: f32,
    bypassed: bool,
}

impl ChannelStrip {
    /// Build and prepare the engine, and allocate the dry scratch buffer
    pub fn new(config: &StripConfig) -> Self {
        let engine = EqEngine::with_config(&config.engine);
        let engine_config = *engine.config();

        engine.apply_snapshot(&config.params);

        let fade_ms = f64::from(config.bypass_fade_ms.max(engine_config.smoothing_ms));
        let fade_samples = (fade_ms * 1.0e-3 * engine_config.sample_rate).round().max(1.0);

        Self {
            dry: vec![vec![0.0; engine_config.max_block_size]; engine_config.channels],
            engine,
            fade_step: (1.0 / fade_samples) as f32,
            wet: if config.params.bypass { 0.0 } else { 1.0 },
            bypassed: config.params.bypass,
        }
    }

    pub fn engine(&self) -> &EqEngine {
        &self.engine
    }

    /// Clear filter history and finish any crossfade in progress
    ///
    /// For transport stops and seeks: smoothers and the bypass switch are kept.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.wet = if self.bypassed { 0.0 } else { 1.0 };
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Current wet gain of the crossfade, `0.0` (dry) to `1.0` (processed)
    pub fn wet_gain(&self) -> f32 {
        self.wet
    }

    /// Crossfade length in samples
    pub fn fade_samples(&self) -> usize {
        (1.0 / self.fade_step).round() as usize
    }

    /// Process one host block in place
    pub fn process<S, B>(&mut self, source: &S, buffer: &mut [B])
    where
        S: ParameterSource + ?Sized,
        B: AsMut<[f32]>,
    {
        let snapshot = source.snapshot();
        self.engine.apply_snapshot(&snapshot);

        if snapshot.bypass != self.bypassed {
            debug!(bypass = snapshot.bypass, wet = self.wet, "Bypass switched");
            self.bypassed = snapshot.bypass;
        }

        let frames = buffer
            .iter_mut()
            .take(self.engine.channels())
            .map(|channel| channel.as_mut().len())
            .min()
            .unwrap_or(0);
        let chunk = self.dry.first().map_or(0, Vec::len).max(1);

        let mut start = 0;
        while start < frames {
            let end = (start + chunk).min(frames);
            self.process_chunk(buffer, start, end);
            start = end;
        }
    }

    fn process_chunk<B: AsMut<[f32]>>(&mut self, buffer: &mut [B], start: usize, end: usize) {
        let target = if self.bypassed { 0.0 } else { 1.0 };

        if self.wet == target {
            if !self.bypassed {
                self.engine.process_range(buffer, start..end);
            }
            return;
        }

        let len = end - start;
        for (dry, channel) in self.dry.iter_mut().zip(buffer.iter_mut()) {
            dry[..len].copy_from_slice(&channel.as_mut()[start..end]);
        }

        self.engine.process_range(buffer, start..end);

        for offset in 0..len {
            // Step toward the target and stay there once reached
            self.wet = if self.wet < target {
                (self.wet + self.fade_step).min(target)
            } else if self.wet > target {
                (self.wet - self.fade_step).max(target)
            } else {
                target
            };
            let wet = self.wet;
            for (dry, channel) in self.dry.iter().zip(buffer.iter_mut()) {
                let sample = &mut channel.as_mut()[start + offset];
                *sample = *sample * wet + dry[offset] * (1.0 - wet);
            }
        }

        if self.wet == target {
            debug!(bypass = self.bypassed, "Bypass crossfade complete");
        }
    }
}
