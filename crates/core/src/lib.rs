//! Parametrix core: a real-time multi-channel parametric equalizer
//!
//! The [`domain`] module holds the DSP engine (parameter smoothing, the
//! fixed serial filter chain and the coefficient scheduler) together with
//! the host-side adapter and configuration types.

pub mod domain;

pub use domain::*;
