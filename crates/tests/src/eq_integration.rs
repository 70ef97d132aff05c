//! Engine-level behaviour across full processing runs

use crate::*;
use parametrix_core::{
    db_to_gain, ChannelStrip, EqEngine, ParamId, ParameterSnapshot, StripConfig,
};
use proptest::prelude::*;
use std::thread;

fn prepared_engine() -> EqEngine {
    let mut engine = EqEngine::new();
    engine.prepare(SAMPLE_RATE, BLOCK as i32, CHANNELS);
    engine
}

/// Noise on both channels, with an LMF sweep driven once per block
fn render_automated(engine: &mut EqEngine, blocks: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = generate_white_noise(blocks * BLOCK, 0.5, 11);
    let mut right = generate_white_noise(blocks * BLOCK, 0.5, 12);

    for (index, (l, r)) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)).enumerate() {
        let progress = index as f32 / blocks as f32;
        engine.set_band_targets(
            100.0,
            6.0 * progress,
            200.0 + 3000.0 * progress,
            -12.0,
            1.5,
            3000.0,
            3.0,
            0.7,
            8000.0,
            -4.0,
        );
        engine.process(&mut [l, r]);
    }

    (left, right)
}

#[test]
fn test_processing_is_deterministic() {
    let mut first = prepared_engine();
    let mut second = prepared_engine();

    let (l1, r1) = render_automated(&mut first, 64);
    let (l2, r2) = render_automated(&mut second, 64);

    assert!(l1.iter().zip(&l2).all(|(a, b)| a.to_bits() == b.to_bits()));
    assert!(r1.iter().zip(&r2).all(|(a, b)| a.to_bits() == b.to_bits()));
    assert_eq!(
        first.scheduler().build_passes(),
        second.scheduler().build_passes()
    );
}

#[test]
fn test_targets_clamped_after_settling() {
    let mut engine = prepared_engine();
    engine.set_targets(100.0, -100.0, 0.0, 1.0e9);
    engine.set_band_targets(1.0e9, 99.0, 1.0e9, -99.0, 50.0, 0.0, 0.0, 0.0, -5.0, 0.0);

    let mut left = generate_silence(BLOCK);
    let mut right = generate_silence(BLOCK);
    for _ in 0..200 {
        engine.process(&mut [&mut left[..], &mut right[..]]);
    }

    assert!(engine.smoothed(ParamId::InputTrim) <= db_to_gain(24.0) * 1.0001);
    assert!(engine.smoothed(ParamId::OutputTrim) >= db_to_gain(-24.0) * 0.9999);
    assert_eq!(engine.smoothed(ParamId::HpfFreq), 20.0);
    assert_eq!(engine.smoothed(ParamId::LpfFreq), 20000.0);
    assert_eq!(engine.smoothed(ParamId::LfFreq), 800.0);
    assert_eq!(engine.smoothed(ParamId::LfGain), 18.0);
    assert_eq!(engine.smoothed(ParamId::LmfFreq), 4000.0);
    assert_eq!(engine.smoothed(ParamId::LmfGain), -18.0);
    assert_eq!(engine.smoothed(ParamId::LmfQ), 2.0);
    assert_eq!(engine.smoothed(ParamId::HmfFreq), 600.0);
    assert_eq!(engine.smoothed(ParamId::HmfQ), 0.5);
    assert_eq!(engine.smoothed(ParamId::HfFreq), 1500.0);
}

#[test]
fn test_silence_tail_stays_normal() {
    let mut engine = prepared_engine();
    engine.apply_snapshot(
        &ParameterSnapshot::default()
            .with(ParamId::LmfFreq, 120.0)
            .with(ParamId::LmfGain, 12.0)
            .with(ParamId::LmfQ, 2.0),
    );

    let frames = 10 * SAMPLE_RATE as usize;
    let mut left = generate_silence(frames);
    let mut right = generate_silence(frames);
    left[0] = 1.0;
    right[0] = 1.0;

    for (l, r) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)) {
        engine.process(&mut [l, r]);
    }

    assert!(left.iter().chain(&right).all(|s| !s.is_subnormal()));
    assert!(left.iter().chain(&right).all(|s| s.is_finite()));

    // The impulse response has long decayed and the state was flushed to zero
    let last_second = frames - SAMPLE_RATE as usize;
    assert!(left[last_second..].iter().all(|&s| s == 0.0));
    assert!(right[last_second..].iter().all(|&s| s == 0.0));
}

/// Step one trim from 0 dB to +12 dB and check the sine envelope ramps smoothly
fn assert_trim_step_is_smooth(trim: ParamId) {
    // One period of 1 kHz is exactly 48 samples, so window peaks are comparable
    let period = 48;
    let settle = 24 * BLOCK;
    let frames = settle + 32 * BLOCK;

    let mut engine = prepared_engine();
    let mut left = generate_sine_wave(1000.0, 0.1, frames);
    let mut right = generate_silence(frames);

    let (pre_l, post_l) = left.split_at_mut(settle);
    let (pre_r, post_r) = right.split_at_mut(settle);
    for (l, r) in pre_l.chunks_mut(BLOCK).zip(pre_r.chunks_mut(BLOCK)) {
        engine.process(&mut [l, r]);
    }
    engine.targets().set(trim, 12.0);
    for (l, r) in post_l.chunks_mut(BLOCK).zip(post_r.chunks_mut(BLOCK)) {
        engine.process(&mut [l, r]);
    }

    let before = calc_peak(&left[settle - period..settle]);
    let peaks: Vec<f32> = left[settle..].chunks_exact(period).map(calc_peak).collect();

    // The first period after the step only moves by a fraction of the jump
    assert!(peaks[0] < before * 1.2, "{trim:?} jumped {before} -> {}", peaks[0]);

    let mut previous = before;
    for &peak in &peaks {
        assert!(peak >= previous * 0.999, "{trim:?} dipped {previous} -> {peak}");
        assert!(peak <= previous * 1.2, "{trim:?} jumped {previous} -> {peak}");
        previous = peak;
    }

    let last = peaks[peaks.len() - 1];
    let expected = before * db_to_gain(12.0);
    assert!((last - expected).abs() < expected * 0.01, "{trim:?} settled at {last}");
}

#[test]
fn test_input_trim_step_has_no_zipper() {
    assert_trim_step_is_smooth(ParamId::InputTrim);
}

#[test]
fn test_output_trim_step_has_no_zipper() {
    assert_trim_step_is_smooth(ParamId::OutputTrim);
}

#[test]
fn test_bypass_toggle_is_click_free() {
    let config = StripConfig {
        params: ParameterSnapshot::default()
            .with(ParamId::LfFreq, 100.0)
            .with(ParamId::LfGain, 6.0),
        ..StripConfig::default()
    };
    let mut strip = ChannelStrip::new(&config);

    let blocks = 60;
    let mut left = generate_sine_wave(100.0, 0.1, blocks * BLOCK);
    let mut right = generate_silence(blocks * BLOCK);

    for (index, (l, r)) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)).enumerate() {
        let bypass = (20..35).contains(&index);
        let snapshot = config.params.with_bypass(bypass);
        strip.process(&snapshot, &mut [l, r]);
    }

    // A 100 Hz sine at this level never moves more than ~0.004 per sample
    let max_step = left
        .windows(2)
        .skip(BLOCK)
        .map(|pair| (pair[1] - pair[0]).abs())
        .fold(0.0f32, f32::max);
    assert!(max_step < 0.01, "largest sample step {max_step}");
    assert!(!strip.is_bypassed());
    assert_eq!(strip.wet_gain(), 1.0);
}

#[test]
fn test_targets_written_from_another_thread() {
    let mut engine = prepared_engine();
    let targets = engine.targets();

    let writer = thread::spawn(move || {
        for step in 0..=100 {
            targets.set(ParamId::HfGain, step as f32 * 0.1);
        }
        targets.set(ParamId::HmfFreq, 5000.0);
    });
    writer.join().unwrap();

    let mut left = generate_silence(BLOCK);
    let mut right = generate_silence(BLOCK);
    for _ in 0..200 {
        engine.process(&mut [&mut left[..], &mut right[..]]);
    }

    assert_eq!(engine.smoothed(ParamId::HfGain), 10.0);
    assert_eq!(engine.smoothed(ParamId::HmfFreq), 5000.0);
}

#[test]
fn test_reset_after_burst_yields_silence() {
    let mut engine = prepared_engine();
    engine.apply_snapshot(&ParameterSnapshot::default().with(ParamId::LfGain, 18.0));

    render_automated(&mut engine, 8);
    engine.reset();

    let mut left = generate_silence(BLOCK);
    let mut right = generate_silence(BLOCK);
    engine.process(&mut [&mut left[..], &mut right[..]]);

    assert!(left.iter().chain(&right).all(|&s| s == 0.0));
}

fn arbitrary_snapshot() -> impl Strategy<Value = ParameterSnapshot> {
    prop::collection::vec(-1.0e5f32..1.0e5, 14).prop_map(|values| {
        ParamId::ALL
            .iter()
            .zip(values)
            .fold(ParameterSnapshot::default(), |snapshot, (&id, value)| {
                snapshot.with(id, value)
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_any_targets_keep_output_finite(snapshot in arbitrary_snapshot(), seed in any::<u64>()) {
        let mut engine = prepared_engine();
        engine.apply_snapshot(&snapshot);

        let mut left = generate_white_noise(4 * BLOCK, 1.0, seed);
        let mut right = generate_white_noise(4 * BLOCK, 1.0, seed.wrapping_add(1));
        for (l, r) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)) {
            engine.process(&mut [l, r]);
        }

        prop_assert!(left.iter().chain(&right).all(|s| s.is_finite()));
        for id in ParamId::ALL {
            let (low, high) = id.internal_bounds();
            let value = engine.smoothed(id);
            prop_assert!(value >= low * 0.9999 && value <= high * 1.0001, "{:?} = {}", id, value);
        }
    }
}
