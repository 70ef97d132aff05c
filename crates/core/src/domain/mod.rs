//! Equalizer domain: DSP sections, parameters, scheduling and the engine

pub mod biquad;
pub mod chain;
pub mod config;
pub mod denormal;
pub mod engine;
pub mod params;
pub mod scheduler;
pub mod smoothing;
pub mod strip;

pub use biquad::{BiquadCoeffs, BiquadFilter, OnePoleCoeffs, OnePoleHighPass, BUTTERWORTH_Q};
pub use chain::{ChainCoeffs, ChannelChain};
pub use config::{ConfigError, EngineConfig, StripConfig};
pub use denormal::{flush_denormal, DenormalGuard};
pub use engine::EqEngine;
pub use params::{db_to_gain, ParamId, ParamRange, ParameterSnapshot, ParameterSource, TargetStore};
pub use scheduler::{BandInputs, CoefficientScheduler, FilterGroup};
pub use smoothing::{FrontEnd, SmoothedValue, Trims};
pub use strip::ChannelStrip;
