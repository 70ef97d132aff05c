//! Equalizer engine: front-end, scheduler and per-channel chains composed
//!
//! Per block: latch targets, then for every sample tick the smoothers, run
//! the coefficient scheduler every `K` samples, and run each channel through
//! its chain. `process` and `reset` never allocate; `prepare` is the only
//! allocating entry point.

use crate::domain::chain::{ChainCoeffs, ChannelChain};
use crate::domain::config::EngineConfig;
use crate::domain::denormal::DenormalGuard;
use crate::domain::params::{ParamId, ParameterSnapshot, TargetStore};
use crate::domain::scheduler::CoefficientScheduler;
use crate::domain::smoothing::FrontEnd;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

/// Multi-channel parametric equalizer
#[derive(Debug)]
pub struct EqEngine {
    config: EngineConfig,
    front: FrontEnd,
    scheduler: CoefficientScheduler,
    chains: Vec<ChannelChain>,
}

impl Default for EqEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EqEngine {
    /// Create an engine prepared with the default configuration
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let config = config.sanitized();
        let mut engine = Self {
            config,
            front: FrontEnd::new(Arc::new(TargetStore::new())),
            scheduler: CoefficientScheduler::new(config.sample_rate, config.update_interval),
            chains: Vec::new(),
        };
        engine.prepare_with(&config);
        engine
    }

    /// Host-style prepare: keeps the current update interval and smoothing time
    pub fn prepare(&mut self, sample_rate: f64, block_size: i32, channels: i32) {
        let config = EngineConfig {
            sample_rate,
            max_block_size: usize::try_from(block_size).unwrap_or(0),
            channels: usize::try_from(channels).unwrap_or(0),
            ..self.config
        };
        self.prepare_with(&config);
    }

    /// Rebuild all state for `config` (corrected if out of domain)
    pub fn prepare_with(&mut self, config: &EngineConfig) {
        let config = config.sanitized();
        self.config = config;

        self.chains.clear();
        self.chains.resize_with(config.channels, ChannelChain::default);

        self.front.prepare(config.sample_rate, config.smoothing_ms);

        self.scheduler = CoefficientScheduler::new(config.sample_rate, config.update_interval);
        self.scheduler.update(&self.front, &mut self.chains);

        self.reset();

        info!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            max_block_size = config.max_block_size,
            update_interval = config.update_interval,
            smoothing_ms = config.smoothing_ms,
            "EQ engine prepared"
        );
    }

    /// Zero all filter histories. Smoothers are untouched.
    pub fn reset(&mut self) {
        for chain in &mut self.chains {
            chain.reset();
        }
        debug!(channels = self.chains.len(), "EQ engine reset");
    }

    /// Set trim targets (dB) and filter corners (Hz); safe from any thread
    pub fn set_targets(&self, input_trim_db: f32, output_trim_db: f32, hpf_hz: f32, lpf_hz: f32) {
        self.front.targets().set_targets(input_trim_db, output_trim_db, hpf_hz, lpf_hz);
    }

    /// Set the ten band-shaping targets; safe from any thread
    #[allow(clippy::too_many_arguments)]
    pub fn set_band_targets(
        &self,
        lf_freq: f32,
        lf_gain: f32,
        lmf_freq: f32,
        lmf_gain: f32,
        lmf_q: f32,
        hmf_freq: f32,
        hmf_gain: f32,
        hmf_q: f32,
        hf_freq: f32,
        hf_gain: f32,
    ) {
        self.front.targets().set_band_targets(
            lf_freq, lf_gain, lmf_freq, lmf_gain, lmf_q, hmf_freq, hmf_gain, hmf_q, hf_freq, hf_gain,
        );
    }

    /// Write every target from a snapshot (bypass is the caller's concern)
    pub fn apply_snapshot(&self, snapshot: &ParameterSnapshot) {
        self.front.targets().apply(snapshot);
    }

    /// Handle for writing targets from another thread
    pub fn targets(&self) -> Arc<TargetStore> {
        Arc::clone(self.front.targets())
    }

    /// Process planar audio in place
    ///
    /// Handles `min(configured channels, buffer.len())` channels over the
    /// shortest of those channel slices; extra channels are left untouched.
    pub fn process<B: AsMut<[f32]>>(&mut self, buffer: &mut [B]) {
        let frames = self.frames_in(buffer);
        self.process_range(buffer, 0..frames);
    }

    /// Process only the frames in `range` of every channel
    ///
    /// The range is clipped to the available frames. Scheduler cadence is
    /// counted from the start of the range.
    pub fn process_range<B: AsMut<[f32]>>(&mut self, buffer: &mut [B], range: Range<usize>) {
        let end = range.end.min(self.frames_in(buffer));
        if range.start >= end {
            return;
        }

        let _denormals = DenormalGuard::new();
        self.front.pull_targets();

        for (offset, frame) in (range.start..end).enumerate() {
            let trims = self.front.tick();
            if self.scheduler.is_due(offset) {
                self.scheduler.update(&self.front, &mut self.chains);
            }
            for (chain, channel) in self.chains.iter_mut().zip(buffer.iter_mut()) {
                let sample = &mut channel.as_mut()[frame];
                *sample = chain.process_sample(*sample, trims);
            }
        }
    }

    fn frames_in<B: AsMut<[f32]>>(&self, buffer: &mut [B]) -> usize {
        buffer
            .iter_mut()
            .take(self.chains.len())
            .map(|channel| channel.as_mut().len())
            .min()
            .unwrap_or(0)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.chains.len()
    }

    /// Smoothed parameter state, for inspection
    pub fn front_end(&self) -> &FrontEnd {
        &self.front
    }

    /// Current smoothed value in internal units (linear gain for trims)
    pub fn smoothed(&self, id: ParamId) -> f32 {
        self.front.current(id)
    }

    pub fn scheduler(&self) -> &CoefficientScheduler {
        &self.scheduler
    }

    /// Coefficients currently in use by every channel
    pub fn coeffs(&self) -> &ChainCoeffs {
        self.scheduler.coeffs()
    }

    /// Analytic magnitude of the filter cascade plus both trims, in dB
    pub fn magnitude_db(&self, freq: f64) -> f64 {
        let trims_db = 20.0
            * (f64::from(self.front.current(ParamId::InputTrim))
                * f64::from(self.front.current(ParamId::OutputTrim)))
            .log10();
        self.coeffs().magnitude_db(self.config.sample_rate, freq) + trims_db
    }
}
