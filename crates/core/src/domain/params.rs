//! Parameter definitions, per-block snapshots and cross-thread targets
//!
//! Every user-facing parameter has a fixed range and default. Targets are
//! written from any thread through [`TargetStore`] and read once per block by
//! the processing thread. Writes are clamped, never rejected.

use crossbeam::atomic::AtomicCell;
use serde::{Deserialize, Serialize};

/// Number of smoothed parameters
pub const PARAM_COUNT: usize = 14;

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}


/// Legal domain of a parameter, in its user-facing unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    /// Clamp into range. NaN maps to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Identifier of a smoothed parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamId {
    InputTrim,
    OutputTrim,
    HpfFreq,
    LpfFreq,
    LfFreq,
    LfGain,
    LmfFreq,
    LmfGain,
    LmfQ,
    HmfFreq,
    HmfGain,
    HmfQ,
    HfFreq,
    HfGain,
}

impl ParamId {
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::InputTrim,
        ParamId::OutputTrim,
        ParamId::HpfFreq,
        ParamId::LpfFreq,
        ParamId::LfFreq,
        ParamId::LfGain,
        ParamId::LmfFreq,
        ParamId::LmfGain,
        ParamId::LmfQ,
        ParamId::HmfFreq,
        ParamId::HmfGain,
        ParamId::HmfQ,
        ParamId::HfFreq,
        ParamId::HfGain,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Host-facing parameter ID
    pub const fn name(self) -> &'static str {
        match self {
            ParamId::InputTrim => "inputTrim",
            ParamId::OutputTrim => "outputTrim",
            ParamId::HpfFreq => "hpfFreq",
            ParamId::LpfFreq => "lpfFreq",
            ParamId::LfFreq => "lfFreq",
            ParamId::LfGain => "lfGain",
            ParamId::LmfFreq => "lmfFreq",
            ParamId::LmfGain => "lmfGain",
            ParamId::LmfQ => "lmfQ",
            ParamId::HmfFreq => "hmfFreq",
            ParamId::HmfGain => "hmfGain",
            ParamId::HmfQ => "hmfQ",
            ParamId::HfFreq => "hfFreq",
            ParamId::HfGain => "hfGain",
        }
    }

    /// Look up a parameter by its host-facing ID
    pub fn from_name(name: &str) -> Option<ParamId> {
        ParamId::ALL.into_iter().find(|id| id.name() == name)
    }

    /// Range in the user-facing unit (dB, Hz, or plain Q)
    pub const fn range(self) -> ParamRange {
        match self {
            ParamId::InputTrim | ParamId::OutputTrim => ParamRange::new(-24.0, 24.0, 0.0),
            ParamId::HpfFreq => ParamRange::new(20.0, 1000.0, 20.0),
            ParamId::LpfFreq => ParamRange::new(3000.0, 20000.0, 20000.0),
            ParamId::LfFreq => ParamRange::new(20.0, 800.0, 100.0),
            ParamId::LmfFreq => ParamRange::new(120.0, 4000.0, 1000.0),
            ParamId::HmfFreq => ParamRange::new(600.0, 15000.0, 3000.0),
            ParamId::HfFreq => ParamRange::new(1500.0, 22000.0, 8000.0),
            ParamId::LfGain | ParamId::LmfGain | ParamId::HmfGain | ParamId::HfGain => {
                ParamRange::new(-18.0, 18.0, 0.0)
            }
            ParamId::LmfQ | ParamId::HmfQ => ParamRange::new(0.5, 2.0, 1.0),
        }
    }

    /// Trims are stored and smoothed as linear gain
    pub const fn is_trim(self) -> bool {
        matches!(self, ParamId::InputTrim | ParamId::OutputTrim)
    }

    /// Clamp a user-facing value and convert it to the internal unit
    pub fn to_internal(self, value: f32) -> f32 {
        let clamped = self.range().clamp(value);
        if self.is_trim() {
            db_to_gain(clamped)
        } else {
            clamped
        }
    }

    /// Internal value of the parameter's default
    pub fn default_internal(self) -> f32 {
        self.to_internal(self.range().default)
    }

    /// Smallest and largest internal value
    pub fn internal_bounds(self) -> (f32, f32) {
        let range = self.range();
        (self.to_internal(range.min), self.to_internal(range.max))
    }
}

/// One block's worth of user parameters, in user-facing units
///
/// This is the vector a host-side parameter registry delivers once per
/// block: the fourteen smoothed parameters plus the global bypass switch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParameterSnapshot {
    pub input_trim: f32,
    pub output_trim: f32,
    pub hpf_freq: f32,
    pub lpf_freq: f32,
    pub lf_freq: f32,
    pub lf_gain: f32,
    pub lmf_freq: f32,
    pub lmf_gain: f32,
    pub lmf_q: f32,
    pub hmf_freq: f32,
    pub hmf_gain: f32,
    pub hmf_q: f32,
    pub hf_freq: f32,
    pub hf_gain: f32,
    pub bypass: bool,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        let mut snapshot = Self {
            input_trim: 0.0,
            output_trim: 0.0,
            hpf_freq: 0.0,
            lpf_freq: 0.0,
            lf_freq: 0.0,
            lf_gain: 0.0,
            lmf_freq: 0.0,
            lmf_gain: 0.0,
            lmf_q: 0.0,
            hmf_freq: 0.0,
            hmf_gain: 0.0,
            hmf_q: 0.0,
            hf_freq: 0.0,
            hf_gain: 0.0,
            bypass: false,
        };
        for id in ParamId::ALL {
            snapshot.set(id, id.range().default);
        }
        snapshot
    }
}

impl ParameterSnapshot {
    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::InputTrim => self.input_trim,
            ParamId::OutputTrim => self.output_trim,
            ParamId::HpfFreq => self.hpf_freq,
            ParamId::LpfFreq => self.lpf_freq,
            ParamId::LfFreq => self.lf_freq,
            ParamId::LfGain => self.lf_gain,
            ParamId::LmfFreq => self.lmf_freq,
            ParamId::LmfGain => self.lmf_gain,
            ParamId::LmfQ => self.lmf_q,
            ParamId::HmfFreq => self.hmf_freq,
            ParamId::HmfGain => self.hmf_gain,
            ParamId::HmfQ => self.hmf_q,
            ParamId::HfFreq => self.hf_freq,
            ParamId::HfGain => self.hf_gain,
        }
    }

    pub fn set(&mut self, id: ParamId, value: f32) {
        let slot = match id {
            ParamId::InputTrim => &mut self.input_trim,
            ParamId::OutputTrim => &mut self.output_trim,
            ParamId::HpfFreq => &mut self.hpf_freq,
            ParamId::LpfFreq => &mut self.lpf_freq,
            ParamId::LfFreq => &mut self.lf_freq,
            ParamId::LfGain => &mut self.lf_gain,
            ParamId::LmfFreq => &mut self.lmf_freq,
            ParamId::LmfGain => &mut self.lmf_gain,
            ParamId::LmfQ => &mut self.lmf_q,
            ParamId::HmfFreq => &mut self.hmf_freq,
            ParamId::HmfGain => &mut self.hmf_gain,
            ParamId::HmfQ => &mut self.hmf_q,
            ParamId::HfFreq => &mut self.hf_freq,
            ParamId::HfGain => &mut self.hf_gain,
        };
        *slot = value;
    }

    /// Builder-style setter
    #[must_use]
    pub fn with(mut self, id: ParamId, value: f32) -> Self {
        self.set(id, value);
        self
    }

    #[must_use]
    pub fn with_bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }
}

/// Anything that can deliver the per-block parameter vector
pub trait ParameterSource {
    fn snapshot(&self) -> ParameterSnapshot;
}

impl ParameterSource for ParameterSnapshot {
    fn snapshot(&self) -> ParameterSnapshot {
        *self
    }
}

impl<F> ParameterSource for F
where
    F: Fn() -> ParameterSnapshot,
{
    fn snapshot(&self) -> ParameterSnapshot {
        self()
    }
}

/// Lock-free target values shared with the parameter-delivery thread
///
/// Each target is an independent scalar cell: last write wins and no
/// ordering is kept between distinct parameters. Values are clamped and
/// converted to their internal unit on write.
#[derive(Debug)]
pub struct TargetStore {
    cells: [AtomicCell<f32>; PARAM_COUNT],
}

impl Default for TargetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetStore {
    pub fn new() -> Self {
        Self {
            cells: ParamId::ALL.map(|id| AtomicCell::new(id.default_internal())),
        }
    }

    /// Write one target given in user-facing units
    #[inline]
    pub fn set(&self, id: ParamId, value: f32) {
        self.cells[id.index()].store(id.to_internal(value));
    }

    /// Current target in internal units (linear gain for trims)
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.cells[id.index()].load()
    }

    /// Trims in dB, filter frequencies in Hz
    pub fn set_targets(&self, input_trim_db: f32, output_trim_db: f32, hpf_hz: f32, lpf_hz: f32) {
        self.set(ParamId::InputTrim, input_trim_db);
        self.set(ParamId::OutputTrim, output_trim_db);
        self.set(ParamId::HpfFreq, hpf_hz);
        self.set(ParamId::LpfFreq, lpf_hz);
    }

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
        self.set(ParamId::LfFreq, lf_freq);
        self.set(ParamId::LfGain, lf_gain);
        self.set(ParamId::LmfFreq, lmf_freq);
        self.set(ParamId::LmfGain, lmf_gain);
        self.set(ParamId::LmfQ, lmf_q);
        self.set(ParamId::HmfFreq, hmf_freq);
        self.set(ParamId::HmfGain, hmf_gain);
        self.set(ParamId::HmfQ, hmf_q);
        self.set(ParamId::HfFreq, hf_freq);
        self.set(ParamId::HfGain, hf_gain);
    }

    /// Write every target from a snapshot. The bypass flag is not a target.
    pub fn apply(&self, snapshot: &ParameterSnapshot) {
        for id in ParamId::ALL {
            self.set(id, snapshot.get(id));
        }
    }

    pub fn reset_to_defaults(&self) {
        for id in ParamId::ALL {
            self.cells[id.index()].store(id.default_internal());
        }
    }
}
