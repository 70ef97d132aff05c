//! Configuration for the equalizer engine and the channel strip
//!
//! This module provides:
//! - [`EngineConfig`]: sample rate, channel count and scheduling constants
//! - [`StripConfig`]: engine configuration plus a parameter set and bypass
//!   crossfade length, loadable from TOML

use crate::domain::params::{ParamId, ParameterSnapshot};
use crate::domain::scheduler::DEFAULT_UPDATE_INTERVAL;
use crate::domain::smoothing::DEFAULT_SMOOTHING_MS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fallback sample rate for nonpositive or non-finite input
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

/// Fallback block size
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Engine configuration, fixed for the lifetime of one `prepare`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz
    pub sample_rate: f64,

    /// Largest block the host will deliver, in frames
    pub max_block_size: usize,

    /// Number of processed channels
    pub channels: usize,

    /// Coefficient-update interval `K` in samples
    pub update_interval: usize,

    /// Smoothing time constant `τ` in milliseconds
    pub smoothing_ms: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_BLOCK_SIZE,
            channels: 2,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            smoothing_ms: DEFAULT_SMOOTHING_MS,
        }
    }
}

impl EngineConfig {
    /// Copy with every out-of-domain value replaced by its default
    ///
    /// The audio path never fails on configuration: corrections are logged
    /// and applied silently.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut config = *self;

        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            warn!(sample_rate = config.sample_rate, "Invalid sample rate, using default");
            config.sample_rate = DEFAULT_SAMPLE_RATE;
        }
        if config.channels == 0 {
            warn!("Zero channels requested, using mono");
            config.channels = 1;
        }
        if config.max_block_size == 0 {
            warn!("Zero block size requested, using default");
            config.max_block_size = DEFAULT_BLOCK_SIZE;
        }
        if config.update_interval == 0 {
            warn!("Zero update interval requested, using default");
            config.update_interval = DEFAULT_UPDATE_INTERVAL;
        }
        if !(config.smoothing_ms.is_finite() && config.smoothing_ms > 0.0) {
            warn!(smoothing_ms = config.smoothing_ms, "Invalid smoothing time, using default");
            config.smoothing_ms = DEFAULT_SMOOTHING_MS;
        }

        config
    }

    /// Smoothing time constant in samples
    pub fn smoothing_samples(&self) -> f64 {
        f64::from(self.smoothing_ms) * 1.0e-3 * self.sample_rate
    }
}

/// Complete channel strip setup: engine, parameter values, bypass fade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    /// Bypass crossfade length in milliseconds (never shorter than `τ`)
    pub bypass_fade_ms: f32,

    pub engine: EngineConfig,

    pub params: ParameterSnapshot,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            bypass_fade_ms: DEFAULT_SMOOTHING_MS,
            engine: EngineConfig::default(),
            params: ParameterSnapshot::default(),
        }
    }
}

impl StripConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that cannot be clamped meaningfully
    ///
    /// Out-of-range parameters are fine (they are clamped on use); NaN is not.
    pub fn validate(&self) -> Result<()> {
        for id in ParamId::ALL {
            if self.params.get(id).is_nan() {
                return Err(ConfigError::Invalid(format!("{} is NaN", id.name())));
            }
        }
        if !(self.bypass_fade_ms.is_finite() && self.bypass_fade_ms >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bypass_fade_ms must be a non-negative number, got {}",
                self.bypass_fade_ms
            )));
        }
        Ok(())
    }

    /// Load configuration from file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }
}
