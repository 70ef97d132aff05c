//! Parameter smoothing front-end
//!
//! Each parameter is a [`SmoothedValue`]: a target plus a current value that
//! follows it through a one-pole low-pass with pole `exp(-1 / (τ·sr))`. The
//! approach is exponential, so it is monotonic between target changes and
//! never overshoots.

use crate::domain::params::{ParamId, TargetStore, PARAM_COUNT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default smoothing time constant in milliseconds
pub const DEFAULT_SMOOTHING_MS: f32 = 20.0;

/// Relative distance at which the current value snaps onto the target
const SNAP_TOLERANCE: f32 = 1.0e-5;

/// One-pole smoothed parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedValue {
    target: f32,
    current: f32,
    pole: f32,
    min: f32,
    max: f32,
}

impl SmoothedValue {
    /// Create a value settled at `initial`, clamped into `[min, max]`
    pub fn new(min: f32, max: f32, initial: f32) -> Self {
        let initial = initial.clamp(min, max);
        Self {
            target: initial,
            current: initial,
            pole: 0.0,
            min,
            max,
        }
    }

    /// Pole for a time constant of `time_ms` at `sample_rate`.
    ///
    /// A zero or negative time constant disables smoothing.
    pub fn pole_for(sample_rate: f64, time_ms: f32) -> f32 {
        let tau_samples = f64::from(time_ms) * 1.0e-3 * sample_rate;
        if tau_samples > 0.0 {
            (-1.0 / tau_samples).exp() as f32
        } else {
            0.0
        }
    }

    pub fn set_smoothing(&mut self, sample_rate: f64, time_ms: f32) {
        self.pole = Self::pole_for(sample_rate, time_ms);
    }

    /// Store a new target, clamped into the legal range
    #[inline]
    pub fn set_target(&mut self, value: f32) {
        self.target = if value.is_nan() {
            self.target
        } else {
            value.clamp(self.min, self.max)
        };
    }

    /// Advance one sample and return the new current value
    #[inline]
    pub fn tick(&mut self) -> f32 {
        if self.current != self.target {
            let next = self.target + self.pole * (self.current - self.target);
            // The step can fall below f32 resolution before the tolerance is met
            let settled = next == self.current
                || (next - self.target).abs() <= SNAP_TOLERANCE * self.target.abs().max(1.0);
            self.current = if settled { self.target } else { next };
        }
        self.current
    }

    /// Jump to `value` with no ramp (`current := target := value`)
    pub fn reset(&mut self, value: f32) {
        self.set_target(value);
        self.current = self.target;
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_smoothing(&self) -> bool {
        self.current != self.target
    }
}

/// Per-sample trim gains, linear
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trims {
    pub input: f32,
    pub output: f32,
}

/// Smoothers for every parameter, fed from a shared [`TargetStore`]
#[derive(Debug)]
pub struct FrontEnd {
    targets: Arc<TargetStore>,
    values: [SmoothedValue; PARAM_COUNT],
}

impl FrontEnd {
    pub fn new(targets: Arc<TargetStore>) -> Self {
        let values = ParamId::ALL.map(|id| {
            let (min, max) = id.internal_bounds();
            SmoothedValue::new(min, max, id.default_internal())
        });
        Self { targets, values }
    }

    /// Seed targets and currents with the defaults and fix the time constant
    pub fn prepare(&mut self, sample_rate: f64, smoothing_ms: f32) {
        self.targets.reset_to_defaults();
        for id in ParamId::ALL {
            let value = &mut self.values[id.index()];
            value.set_smoothing(sample_rate, smoothing_ms);
            value.reset(id.default_internal());
        }
    }

    pub fn targets(&self) -> &Arc<TargetStore> {
        &self.targets
    }

    /// Latch the shared targets into the smoothers (once per block)
    pub fn pull_targets(&mut self) {
        for id in ParamId::ALL {
            self.values[id.index()].set_target(self.targets.get(id));
        }
    }

    /// Advance every smoother by one sample
    #[inline]
    pub fn tick(&mut self) -> Trims {
        for value in self.values.iter_mut() {
            value.tick();
        }
        Trims {
            input: self.values[ParamId::InputTrim.index()].current(),
            output: self.values[ParamId::OutputTrim.index()].current(),
        }
    }

    /// Current smoothed value in internal units
    #[inline]
    pub fn current(&self, id: ParamId) -> f32 {
        self.values[id.index()].current()
    }

    /// Latched target in internal units
    pub fn target(&self, id: ParamId) -> f32 {
        self.values[id.index()].target()
    }

    pub fn is_smoothing(&self) -> bool {
        self.values.iter().any(SmoothedValue::is_smoothing)
    }
}
