//! Linear parameter automation for offline renders

use parametrix_core::domain::{ParamId, ParameterSnapshot};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SweepParseError {
    #[error("expected PARAM:FROM:TO, got '{0}'")]
    Format(String),

    #[error("unknown parameter '{0}'")]
    UnknownParam(String),

    #[error("invalid number '{0}'")]
    Number(String),
}

/// A parameter moving linearly from `from` to `to` over the whole render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub param: ParamId,
    pub from: f32,
    pub to: f32,
}

impl Sweep {
    /// Value at `progress` in `[0, 1]`
    pub fn value_at(&self, progress: f32) -> f32 {
        let t = progress.clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }
}

impl FromStr for Sweep {
    type Err = SweepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [name, from, to] = parts.as_slice() else {
            return Err(SweepParseError::Format(s.to_string()));
        };

        let param = ParamId::from_name(name)
            .ok_or_else(|| SweepParseError::UnknownParam(name.to_string()))?;
        let parse = |v: &str| {
            v.parse::<f32>()
                .map_err(|_| SweepParseError::Number(v.to_string()))
        };

        Ok(Self {
            param,
            from: parse(*from)?,
            to: parse(*to)?,
        })
    }
}

/// Static parameters plus sweeps
#[derive(Debug, Clone)]
pub struct Automation {
    base: ParameterSnapshot,
    sweeps: Vec<Sweep>,
}

impl Automation {
    pub fn new(base: ParameterSnapshot, sweeps: Vec<Sweep>) -> Self {
        Self { base, sweeps }
    }

    /// Snapshot to deliver at `progress` through the render
    pub fn at(&self, progress: f32) -> ParameterSnapshot {
        self.sweeps
            .iter()
            .fold(self.base, |snapshot, sweep| snapshot.with(sweep.param, sweep.value_at(progress)))
    }
}
