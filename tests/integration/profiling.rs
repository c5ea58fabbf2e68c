//! Profiling workload and report.

use logue_host::prelude::*;
use logue_host::{Headroom, UnitEvent as Event};

use crate::helpers::tolerances::*;
use crate::helpers::*;

fn synth_host() -> UnitHost {
    UnitHost::builder()
        .block_size(TEST_BUFFER_SIZE)
        .build_from_module(synth_module())
        .unwrap()
}

#[test]
fn test_profile_report_accounts_every_block() {
    let mut host = synth_host();
    let out = host.profile(10.0, None, 1).unwrap();
    let report = out.profile.unwrap();

    assert_eq!(report.calls, 7500);
    assert_eq!(report.frames, 480_000);
    assert_eq!(report.block_size, TEST_BUFFER_SIZE);
    assert!((report.audio_secs - 10.0).abs() < 1e-9);
    assert!(report.min_render <= report.avg_render);
    assert!(report.avg_render <= report.max_render);
    assert_eq!(report.underrun, report.real_time_factor < 1.0);
    assert_eq!(report.headroom, Headroom::classify(report.cpu_percent));
    assert!(report.to_string().contains("Render calls:      7500"));
}

#[test]
fn test_generator_profile_runs_at_least_ten_seconds() {
    let mut host = synth_host();
    let input = AudioBuffer::silent(2, TEST_SAMPLE_RATE, 4800);
    let out = host.profile(input.duration_secs(), Some(&input), 1).unwrap();

    assert_eq!(out.audio.frames(), 480_000);
    assert_eq!(out.render_calls, 7500);
    // The last note (E3, velocity 75) still sounds after the input ran out.
    let tail = &out.audio.samples[2 * 470_000..];
    assert_has_audio(tail, 0.1);
}

#[test]
fn test_plain_render_plays_notes_on_synths() {
    let mut host = synth_host();
    let out = host.render_seconds(1.0, None).unwrap();
    assert_eq!(out.audio.frames(), 48_000);
    assert_has_audio(&out.audio.samples, 0.1);
    assert_eq!(out.skipped_events, 0);
}

#[test]
fn test_profile_plays_notes_on_synths() {
    let mut host = synth_host();
    let out = host.profile(1.0, None, 1).unwrap();

    // First note is middle C at velocity 100.
    let amp = 100.0f32 / 127.0;
    let expected: Vec<f32> = generate_sine(SYNTH_FREQ, TEST_SAMPLE_RATE as f64, 480)
        .into_iter()
        .map(|s| s * amp)
        .collect();
    let left: Vec<f32> = out.audio.samples.iter().step_by(2).take(480).copied().collect();
    assert!(signals_approx_equal(&left, &expected, DSP_EPSILON));
    assert_has_audio(&out.audio.samples, 0.1);
    assert!(out.audibility.is_clean());
}

#[test]
fn test_profile_skips_param_events_without_setter() {
    // The sine synth has no set-param entry point; its changes only reach the cache.
    let mut host = synth_host();
    let out = host.profile(3.0, None, 9).unwrap();
    assert_eq!(out.skipped_events, 0);
}

#[test]
fn test_profile_gives_effects_no_events() {
    let mut host = test_host();
    let out = host.profile(0.5, None, 1).unwrap();
    assert_eq!(out.audio.frames(), 24_000);
    assert_eq!(out.skipped_events, 0);
    assert_silence(&out.audio.samples, SILENCE_THRESHOLD);
}

#[test]
fn test_load_meter_tracks_render_calls() {
    let mut host = synth_host();
    let meter = host.load_meter();
    let out = host.profile(0.5, None, 1).unwrap();
    let report = out.profile.unwrap();
    let metrics = host.load_metrics();
    assert_eq!(metrics.calls, out.render_calls);
    assert_eq!(metrics.frames, report.frames);
    assert!((metrics.cpu_percent - report.cpu_percent).abs() < 1e-6);
    assert!(metrics.peak >= metrics.current);
    assert!((metrics.budget_us - 64.0 / 48_000.0 * 1e6).abs() < 1e-6);
    assert_eq!(meter.metrics().calls, 7500);
}

#[test]
fn test_perf_counters_come_from_the_unit() {
    assert!(synth_host().perf_counters().is_none());

    let mut host = UnitHost::builder()
        .block_size(TEST_BUFFER_SIZE)
        .build_from_module(metered_synth_module())
        .unwrap();
    // Counters that have not seen a frame are left out.
    assert!(host.perf_counters().unwrap().is_empty());

    host.profile(0.1, None, 1).unwrap();
    let counters = host.perf_counters().unwrap();
    assert_eq!(counters.counters.len(), 1);
    assert_eq!(counters.counters[0].name.as_deref(), Some("osc"));
    assert!((counters.total_budget_percent() - 50.0).abs() < 1e-9);
    assert_eq!(counters.headroom(), Headroom::Good);
    let table = counters.to_string();
    assert!(table.contains("osc"));
    assert!(table.contains("TOTAL"));
}

#[test]
fn test_note_off_silences_synth() {
    let mut host = synth_host();
    let schedule = EventSchedule::new()
        .with(0, Event::NoteOn { note: 60, velocity: 127 })
        .with(640, Event::NoteOff { note: 60 });
    let out = host.render(&schedule, None, 1280).unwrap();
    assert_has_audio(&out.audio.samples[..2 * 640], 0.5);
    assert_silence(&out.audio.samples[2 * 640..], SILENCE_THRESHOLD);
}
