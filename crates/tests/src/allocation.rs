//! The audio path must not touch the heap once prepared
//!
//! A counting global allocator records allocations made on the current
//! thread while tracking is switched on. Both the switch and the count are
//! thread-local, so other tests running in parallel do not disturb the count.

use crate::*;
use parametrix_core::{ChannelStrip, EqEngine, ParamId, ParameterSnapshot, StripConfig};
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

struct CountingAllocator;

thread_local! {
    static TRACKING: Cell<bool> = const { Cell::new(false) };
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

fn record() {
    if TRACKING.try_with(Cell::get).unwrap_or(false) {
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        record();
        System.alloc(layout)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        record();
        System.alloc_zeroed(layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        record();
        System.realloc(ptr, layout, new_size)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

/// Allocations made by `f` on this thread
fn count_allocations<F: FnOnce()>(f: F) -> usize {
    ALLOCATIONS.with(|count| count.set(0));
    TRACKING.with(|tracking| tracking.set(true));
    f();
    TRACKING.with(|tracking| tracking.set(false));
    ALLOCATIONS.with(Cell::get)
}

fn sweep_snapshot(step: usize) -> ParameterSnapshot {
    let progress = (step % 32) as f32 / 32.0;
    ParameterSnapshot::default()
        .with(ParamId::HpfFreq, 20.0 + 200.0 * progress)
        .with(ParamId::LmfFreq, 300.0 + 2000.0 * progress)
        .with(ParamId::LmfGain, -9.0 + 18.0 * progress)
        .with(ParamId::OutputTrim, -3.0 * progress)
}

#[test]
fn test_engine_process_does_not_allocate() {
    let mut engine = EqEngine::new();
    engine.prepare(SAMPLE_RATE, BLOCK as i32, CHANNELS);

    let mut left = generate_white_noise(BLOCK, 0.5, 21);
    let mut right = generate_white_noise(BLOCK, 0.5, 22);

    // Warm-up covers both static and moving targets
    for step in 0..64 {
        engine.apply_snapshot(&sweep_snapshot(step));
        engine.process(&mut [&mut left[..], &mut right[..]]);
    }

    let allocations = count_allocations(|| {
        for step in 0..256 {
            engine.apply_snapshot(&sweep_snapshot(step));
            engine.process(&mut [&mut left[..], &mut right[..]]);
            engine.process_range(&mut [&mut left[..], &mut right[..]], 100..400);
        }
    });

    assert_eq!(allocations, 0);
}

#[test]
fn test_strip_bypass_fade_does_not_allocate() {
    let mut strip = ChannelStrip::new(&StripConfig::default());

    let mut left = generate_sine_wave(440.0, 0.5, BLOCK);
    let mut right = generate_sine_wave(660.0, 0.5, BLOCK);

    for step in 0..64 {
        let snapshot = sweep_snapshot(step).with_bypass(step % 8 < 4);
        strip.process(&snapshot, &mut [&mut left[..], &mut right[..]]);
    }

    let allocations = count_allocations(|| {
        for step in 0..256 {
            let snapshot = sweep_snapshot(step).with_bypass(step % 8 < 4);
            strip.process(&snapshot, &mut [&mut left[..], &mut right[..]]);
        }
    });

    assert_eq!(allocations, 0);
}

#[test]
fn test_counts_ignore_other_threads() {
    let mut engine = EqEngine::new();
    engine.prepare(SAMPLE_RATE, BLOCK as i32, CHANNELS);
    let mut left = generate_white_noise(BLOCK, 0.5, 23);
    let mut right = generate_white_noise(BLOCK, 0.5, 24);
    engine.process(&mut [&mut left[..], &mut right[..]]);

    let stop = Arc::new(AtomicBool::new(false));
    let noisy = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut seen = 0;
            loop {
                seen += count_allocations(|| {
                    let buffer: Vec<f32> = Vec::with_capacity(8);
                    std::hint::black_box(&buffer);
                });
                if stop.load(Ordering::Relaxed) {
                    break seen;
                }
            }
        })
    };

    let allocations = count_allocations(|| {
        for _ in 0..2000 {
            engine.process(&mut [&mut left[..], &mut right[..]]);
        }
    });
    stop.store(true, Ordering::Relaxed);
    let seen = noisy.join().unwrap();

    assert_eq!(allocations, 0);
    assert!(seen >= 1);
}

#[test]
fn test_counter_sees_allocations() {
    let allocations = count_allocations(|| {
        let buffer: Vec<f32> = Vec::with_capacity(64);
        std::hint::black_box(&buffer);
    });
    assert!(allocations >= 1);
}
