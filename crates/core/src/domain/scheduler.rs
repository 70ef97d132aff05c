//! Coefficient scheduler
//!
//! Every `K` samples the scheduler reads the smoothed filter parameters,
//! compares each band's inputs with the values its coefficients were last
//! built from, and rebuilds only the bands that drifted. A rebuilt set is
//! written to every channel before the next sample is filtered.

use crate::domain::biquad::{BiquadCoeffs, OnePoleCoeffs, BUTTERWORTH_Q};
use crate::domain::chain::{ChainCoeffs, ChannelChain};
use crate::domain::params::ParamId;
use crate::domain::smoothing::FrontEnd;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Default coefficient-update interval in samples
pub const DEFAULT_UPDATE_INTERVAL: usize = 16;

/// Relative tolerance for "unchanged" parameter values
const RELATIVE_TOLERANCE: f32 = 4.0 * f32::EPSILON;

/// Approximate float equality with a relative tolerance
#[inline]
pub fn approx_eq(a: f32, b: f32) -> bool {
    let tolerance = (RELATIVE_TOLERANCE * a.abs().max(b.abs())).max(f32::MIN_POSITIVE);
    (a - b).abs() <= tolerance
}

/// A band whose coefficients are rebuilt as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterGroup {
    /// HP2 biquad and HP1 one-pole, both driven by `hpfFreq`
    HighPass,
    LowPass,
    LowShelf,
    LowMid,
    HighMid,
    HighShelf,
}

impl FilterGroup {
    pub const ALL: [FilterGroup; 6] = [
        FilterGroup::HighPass,
        FilterGroup::LowPass,
        FilterGroup::LowShelf,
        FilterGroup::LowMid,
        FilterGroup::HighMid,
        FilterGroup::HighShelf,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            FilterGroup::HighPass => "hpf",
            FilterGroup::LowPass => "lpf",
            FilterGroup::LowShelf => "lf",
            FilterGroup::LowMid => "lmf",
            FilterGroup::HighMid => "hmf",
            FilterGroup::HighShelf => "hf",
        }
    }

    /// Read this band's current smoothed inputs
    fn read(self, front: &FrontEnd) -> BandInputs {
        let fixed = |freq: ParamId| BandInputs {
            freq: front.current(freq),
            gain_db: 0.0,
            q: BUTTERWORTH_Q,
        };
        let band = |freq: ParamId, gain: ParamId, q: f32| BandInputs {
            freq: front.current(freq),
            gain_db: front.current(gain),
            q,
        };

        match self {
            FilterGroup::HighPass => fixed(ParamId::HpfFreq),
            FilterGroup::LowPass => fixed(ParamId::LpfFreq),
            FilterGroup::LowShelf => band(ParamId::LfFreq, ParamId::LfGain, BUTTERWORTH_Q),
            FilterGroup::LowMid => {
                band(ParamId::LmfFreq, ParamId::LmfGain, front.current(ParamId::LmfQ))
            }
            FilterGroup::HighMid => {
                band(ParamId::HmfFreq, ParamId::HmfGain, front.current(ParamId::HmfQ))
            }
            FilterGroup::HighShelf => band(ParamId::HfFreq, ParamId::HfGain, BUTTERWORTH_Q),
        }
    }
}

/// The `{freq, gain, Q}` triple a band's coefficients were built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandInputs {
    pub freq: f32,
    pub gain_db: f32,
    pub q: f32,
}

impl BandInputs {
    /// Out-of-range marker forcing the first build
    pub const NEVER_APPLIED: BandInputs = BandInputs {
        freq: -1.0,
        gain_db: 9999.0,
        q: -1.0,
    };

    fn approx_eq(&self, other: &BandInputs) -> bool {
        approx_eq(self.freq, other.freq)
            && approx_eq(self.gain_db, other.gain_db)
            && approx_eq(self.q, other.q)
    }
}

/// Drift-gated coefficient builder for the whole chain
#[derive(Debug, Clone)]
pub struct CoefficientScheduler {
    sample_rate: f64,
    interval: usize,
    coeffs: ChainCoeffs,
    last_applied: [BandInputs; 6],
    group_builds: [u64; 6],
    build_passes: u64,
}

impl CoefficientScheduler {
    pub fn new(sample_rate: f64, interval: usize) -> Self {
        Self {
            sample_rate,
            interval: interval.max(1),
            coeffs: ChainCoeffs::default(),
            last_applied: [BandInputs::NEVER_APPLIED; 6],
            group_builds: [0; 6],
            build_passes: 0,
        }
    }

    /// Samples between drift checks
    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Whether the check runs at block-local sample index `index`
    #[inline]
    pub fn is_due(&self, index: usize) -> bool {
        index % self.interval == 0
    }

    /// Mark every band as never applied so the next update rebuilds all
    pub fn invalidate(&mut self) {
        self.last_applied = [BandInputs::NEVER_APPLIED; 6];
    }

    /// Rebuild the bands whose inputs drifted and broadcast them to `chains`.
    ///
    /// Returns the number of bands rebuilt.
    pub fn update(&mut self, front: &FrontEnd, chains: &mut [ChannelChain]) -> usize {
        let mut rebuilt = 0;
        for group in FilterGroup::ALL {
            let inputs = group.read(front);
            if inputs.approx_eq(&self.last_applied[group.index()]) {
                continue;
            }
            self.build(group, inputs, chains);
            rebuilt += 1;
        }
        if rebuilt > 0 {
            self.build_passes += 1;
        }
        rebuilt
    }

    fn build(&mut self, group: FilterGroup, inputs: BandInputs, chains: &mut [ChannelChain]) {
        let sr = self.sample_rate;
        let BandInputs { freq, gain_db, q } = inputs;

        match group {
            FilterGroup::HighPass => {
                let hp2 = BiquadCoeffs::high_pass(sr, freq, q);
                let hp1 = OnePoleCoeffs::high_pass(sr, freq);
                self.coeffs.hp2 = hp2;
                self.coeffs.hp1 = hp1;
                chains.iter_mut().for_each(|chain| chain.set_high_pass(hp2, hp1));
            }
            FilterGroup::LowPass => {
                let lp2 = BiquadCoeffs::low_pass(sr, freq, q);
                self.coeffs.lp2 = lp2;
                chains.iter_mut().for_each(|chain| chain.set_low_pass(lp2));
            }
            FilterGroup::LowShelf => {
                let lf = BiquadCoeffs::low_shelf(sr, freq, gain_db, q);
                self.coeffs.lf = lf;
                chains.iter_mut().for_each(|chain| chain.set_low_shelf(lf));
            }
            FilterGroup::LowMid => {
                let lmf = BiquadCoeffs::peaking(sr, freq, gain_db, q);
                self.coeffs.lmf = lmf;
                chains.iter_mut().for_each(|chain| chain.set_low_mid(lmf));
            }
            FilterGroup::HighMid => {
                let hmf = BiquadCoeffs::peaking(sr, freq, gain_db, q);
                self.coeffs.hmf = hmf;
                chains.iter_mut().for_each(|chain| chain.set_high_mid(hmf));
            }
            FilterGroup::HighShelf => {
                let hf = BiquadCoeffs::high_shelf(sr, freq, gain_db, q);
                self.coeffs.hf = hf;
                chains.iter_mut().for_each(|chain| chain.set_high_shelf(hf));
            }
        }

        self.last_applied[group.index()] = inputs;
        self.group_builds[group.index()] += 1;

        trace!(
            band = group.name(),
            freq,
            gain_db,
            q,
            "Coefficients rebuilt"
        );
    }

    /// Coefficients currently loaded into the chains
    pub fn coeffs(&self) -> &ChainCoeffs {
        &self.coeffs
    }

    /// Inputs the band's coefficients were last built from
    pub fn last_applied(&self, group: FilterGroup) -> BandInputs {
        self.last_applied[group.index()]
    }

    /// Number of times a band was rebuilt
    pub fn group_builds(&self, group: FilterGroup) -> u64 {
        self.group_builds[group.index()]
    }

    /// Number of updates that rebuilt at least one band
    pub fn build_passes(&self) -> u64 {
        self.build_passes
    }
}
