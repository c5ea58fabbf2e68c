//! Test helpers and fixtures for logue-host integration tests
//!
//! Units here are compiled into the test binary and handed to the host
//! through `Module::from_parts`, so no shared library is needed.
//!
//! Thresholds live in [`tolerances`]: `FLOAT_EPSILON` for gain checks,
//! `DSP_EPSILON` against the reference sine, `SILENCE_THRESHOLD` for tails.

#![allow(dead_code)]

pub mod tolerances;

use std::cell::Cell;

use logue_host::core::abi::RuntimeDesc;
use logue_host::prelude::*;
use logue_host::{Module, ParamDescriptor, PerfMonCallbacks, UnitCallbacks};

/// The drumlogue's fixed rate.
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 64;

/// Frequency of the test synth's voice.
pub const SYNTH_FREQ: f64 = 440.0;

thread_local! {
    static DRIVE_LEVEL: Cell<i32> = const { Cell::new(100) };
    static SYNTH_VELOCITY: Cell<u8> = const { Cell::new(0) };
    static SYNTH_PHASE: Cell<u64> = const { Cell::new(0) };
    static SYNTH_RATE: Cell<u32> = const { Cell::new(TEST_SAMPLE_RATE) };
}

unsafe extern "C" fn drive_init(desc: *const RuntimeDesc) -> i8 {
    let desc = &*desc;
    if desc.input_channels != 2 || desc.output_channels != 2 {
        return -8;
    }
    DRIVE_LEVEL.with(|l| l.set(100));
    0
}

unsafe extern "C" fn drive_render(input: *const f32, output: *mut f32, frames: u32) {
    let gain = DRIVE_LEVEL.with(Cell::get) as f32 / 100.0;
    let n = frames as usize * 2;
    let input = std::slice::from_raw_parts(input, n);
    let output = std::slice::from_raw_parts_mut(output, n);
    for (o, i) in output.iter_mut().zip(input) {
        *o = i * gain;
    }
}

unsafe extern "C" fn drive_set_param(index: u8, value: i32) {
    if index == 0 {
        DRIVE_LEVEL.with(|l| l.set(value));
    }
}

/// Stereo-only gain effect. LEVEL (slot 0) is a percentage up to 200.
pub fn drive_module() -> Module {
    let desc = UnitDescriptor::new("Drive", ModuleKind::MasterFx)
        .with_ids(0x4C48_5354, 1)
        .with_param(0, ParamDescriptor::new("LEVEL", 0, 200, 100).with_type(ParamType::Percent));
    let callbacks = UnitCallbacks {
        set_param_value: Some(drive_set_param),
        ..UnitCallbacks::new(drive_init, drive_render)
    };
    Module::from_parts(desc, callbacks).unwrap()
}

unsafe extern "C" fn synth_init(desc: *const RuntimeDesc) -> i8 {
    SYNTH_RATE.with(|r| r.set({ (*desc).samplerate }));
    SYNTH_VELOCITY.with(|v| v.set(0));
    SYNTH_PHASE.with(|p| p.set(0));
    0
}

unsafe extern "C" fn synth_render(_input: *const f32, output: *mut f32, frames: u32) {
    let output = std::slice::from_raw_parts_mut(output, frames as usize * 2);
    let amp = SYNTH_VELOCITY.with(Cell::get) as f64 / 127.0;
    let rate = SYNTH_RATE.with(Cell::get) as f64;
    let start = SYNTH_PHASE.with(|p| p.replace(p.get() + frames as u64));
    for (f, frame) in output.chunks_exact_mut(2).enumerate() {
        let t = (start + f as u64) as f64 / rate;
        let s = (amp * (2.0 * std::f64::consts::PI * SYNTH_FREQ * t).sin()) as f32;
        frame.fill(s);
    }
}

unsafe extern "C" fn synth_note_on(_note: u8, velocity: u8) {
    SYNTH_VELOCITY.with(|v| v.set(velocity));
}

unsafe extern "C" fn synth_note_off(_note: u8) {
    SYNTH_VELOCITY.with(|v| v.set(0));
}

/// Sine synth at [`SYNTH_FREQ`], amplitude `velocity / 127` while a note is held.
pub fn synth_module() -> Module {
    let desc = UnitDescriptor::new("Sine", ModuleKind::Synth)
        .with_ids(0x4C48_5354, 2)
        .with_param(0, ParamDescriptor::new("TONE", 0, 100, 50).with_type(ParamType::Percent));
    let callbacks = UnitCallbacks {
        note_on: Some(synth_note_on),
        note_off: Some(synth_note_off),
        ..UnitCallbacks::new(synth_init, synth_render)
    };
    Module::from_parts(desc, callbacks).unwrap()
}

unsafe extern "C" fn perf_counter_count() -> u8 {
    1
}

unsafe extern "C" fn perf_counter_name(_index: u8) -> *const std::ffi::c_char {
    b"osc\0".as_ptr().cast()
}

unsafe extern "C" fn perf_average(_index: u8) -> u32 {
    9375
}

unsafe extern "C" fn perf_min(_index: u8) -> u32 {
    9000
}

unsafe extern "C" fn perf_peak(_index: u8) -> u32 {
    12000
}

unsafe extern "C" fn perf_frames(_index: u8) -> u32 {
    SYNTH_PHASE.with(Cell::get) as u32
}

/// [`synth_module`] reporting one `osc` counter at half the cycle budget.
pub fn metered_synth_module() -> Module {
    synth_module().with_perf_mon(PerfMonCallbacks {
        counter_count: perf_counter_count,
        counter_name: perf_counter_name,
        average_cycles: perf_average,
        peak_cycles: perf_peak,
        min_cycles: perf_min,
        frame_count: perf_frames,
    })
}

/// Host around the drive effect at the test rate and block size.
pub fn test_host() -> UnitHost {
    UnitHost::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .block_size(TEST_BUFFER_SIZE)
        .build_from_module(drive_module())
        .expect("Failed to create test host")
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Interleave one mono signal into `channels` identical channels.
pub fn interleave(mono: &[f32], channels: usize) -> Vec<f32> {
    mono.iter()
        .flat_map(|s| std::iter::repeat(*s).take(channels))
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}
