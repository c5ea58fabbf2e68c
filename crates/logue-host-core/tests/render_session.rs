//! End-to-end rendering through `Session` and `BlockRenderer`.

mod fixtures;

use approx::assert_abs_diff_eq;
use fixtures::{gain, ramp, synth, TEST_SAMPLE_RATE};
use logue_host_core::{
    AudioBuffer, BlockRenderer, EventSchedule, HostConfig, ParamMessage, Session, UnitEvent,
};

fn config(block: usize) -> HostConfig {
    HostConfig::new(TEST_SAMPLE_RATE, block, 2, 2)
}

#[test]
fn one_second_at_block_64_takes_750_calls() {
    let mut session = Session::open(gain::module(), &config(64)).unwrap();
    let mut renderer = BlockRenderer::new(session.context());

    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, ramp(2, 48_000));
    let out = renderer
        .render(&mut session, &EventSchedule::new(), Some(&input), 48_000)
        .unwrap();

    assert_eq!(out.render_calls, 750);
    assert_eq!(out.audio.samples.len(), 48_000 * 2);
    assert_eq!(out.audio.frames(), 48_000);
    assert!(out.audibility.is_clean());

    let seen = gain::observed();
    assert_eq!(seen.renders, 750);
    assert_eq!(seen.frames, 48_000);
    assert_eq!((seen.inputs, seen.outputs), (2, 2));
    assert_eq!(seen.sample_rate, 48_000);
    assert_eq!(seen.target, 0x0402);

    // LEVEL defaults to 100%, so the unit passes audio through.
    for (a, b) in out.audio.samples.iter().zip(&input.samples) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn getter_reports_declared_defaults() {
    let session = Session::open(gain::module(), &config(64)).unwrap();
    for (index, default) in gain::DEFAULTS {
        assert_eq!(session.param_value(index).unwrap(), default);
    }
    assert_eq!(session.params().get(12), Some(90));
}

#[test]
fn partial_last_block() {
    let mut session = Session::open(gain::module(), &config(256)).unwrap();
    let mut renderer = BlockRenderer::new(session.context());
    let out = renderer
        .render(&mut session, &EventSchedule::new(), None, 1000)
        .unwrap();
    assert_eq!(out.render_calls, 4);
    assert_eq!(out.audio.frames(), 1000);
    assert_eq!(gain::observed().frames, 1000);
}

#[test]
fn scheduled_param_change_lands_on_its_block() {
    let mut session = Session::open(gain::module(), &config(64)).unwrap();
    let mut renderer = BlockRenderer::new(session.context());
    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, vec![0.5; 2 * 4800]);
    // 2410 sits inside the block starting at 2368.
    let schedule = EventSchedule::new().with(2410, UnitEvent::ParamChange { index: 0, value: 50 });

    let out = renderer
        .render(&mut session, &schedule, Some(&input), 4800)
        .unwrap();

    assert_abs_diff_eq!(out.audio.frame(2367)[0], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(out.audio.frame(2368)[0], 0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(out.audio.frame(4799)[1], 0.25, epsilon = 1e-6);
    assert_eq!(session.params().get(0), Some(50));
}

#[test]
fn control_queue_is_drained_before_each_block() {
    let mut session = Session::open(gain::module(), &config(64)).unwrap();
    let mut tx = session.control_channel(16).unwrap();
    tx.push(ParamMessage { index: 0, value: 10 }).unwrap();
    tx.push(ParamMessage { index: 0, value: 20 }).unwrap();

    let mut renderer = BlockRenderer::new(session.context());
    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, vec![1.0; 2 * 64]);
    let out = renderer
        .render(&mut session, &EventSchedule::new(), Some(&input), 64)
        .unwrap();

    assert!(tx.is_empty());
    assert_eq!(gain::observed().set_calls, vec![(0, 10), (0, 20)]);
    assert_abs_diff_eq!(out.audio.samples[0], 0.2, epsilon = 1e-6);
}

#[test]
fn mono_input_is_upmixed() {
    let mut session = Session::open(gain::module(), &config(32)).unwrap();
    let mut renderer = BlockRenderer::new(session.context());
    let input = AudioBuffer::new(1, TEST_SAMPLE_RATE, vec![0.3; 100]);
    let out = renderer
        .render(&mut session, &EventSchedule::new(), Some(&input), 100)
        .unwrap();
    assert!(out.audio.samples.iter().all(|s| (s - 0.3).abs() < 1e-6));
}

#[test]
fn input_shorter_than_run_continues_in_silence() {
    let mut session = Session::open(gain::module(), &config(64)).unwrap();
    let mut renderer = BlockRenderer::new(session.context());
    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, vec![1.0; 2 * 100]);
    let out = renderer
        .render(&mut session, &EventSchedule::new(), Some(&input), 256)
        .unwrap();
    assert_eq!(out.audio.frame(99), &[1.0, 1.0]);
    assert_eq!(out.audio.frame(100), &[0.0, 0.0]);
    assert_eq!(out.audio.frames(), 256);
}

#[test]
fn profiling_schedule_drives_synth_notes() {
    let mut session = Session::open(synth::module(), &config(256)).unwrap();
    let descriptor = session.descriptor().unwrap().clone();
    let total = 3 * TEST_SAMPLE_RATE as u64;
    let schedule = EventSchedule::profiling(&descriptor, TEST_SAMPLE_RATE, total, 7);

    let mut renderer = BlockRenderer::new(session.context());
    let out = renderer.render(&mut session, &schedule, None, total).unwrap();

    let seen = synth::observed();
    assert_eq!(seen.notes, vec![(60, 100), (64, 90), (67, 110)]);
    assert_eq!(seen.held, Some(67));
    assert!(!seen.set_calls.is_empty());
    assert_eq!(out.skipped_events, 0);
    assert_abs_diff_eq!(out.audio.samples[0], 100.0 / 127.0, epsilon = 1e-6);

    let report = out.profile.unwrap();
    assert_eq!(report.calls, out.render_calls);
    assert_eq!(report.frames, total);
}

#[test]
fn note_events_to_an_effect_are_skipped() {
    let mut session = Session::open(gain::module(), &config(64)).unwrap();
    let mut renderer = BlockRenderer::new(session.context());
    let schedule = EventSchedule::new()
        .with(0, UnitEvent::NoteOn { note: 60, velocity: 100 })
        .with(64, UnitEvent::NoteOff { note: 60 });
    let out = renderer.render(&mut session, &schedule, None, 128).unwrap();
    assert_eq!(out.skipped_events, 2);
    assert_eq!(out.render_calls, 2);
}

#[test]
fn unknown_param_slots_are_skipped_without_stopping_the_render() {
    let mut session = Session::open(gain::module(), &config(64)).unwrap();
    let mut tx = session.control_channel(4).unwrap();
    tx.push(ParamMessage { index: 20, value: 1 }).unwrap();
    tx.push(ParamMessage { index: 0, value: 50 }).unwrap();

    let mut renderer = BlockRenderer::new(session.context());
    let schedule = EventSchedule::new().with(128, UnitEvent::ParamChange { index: 30, value: 5 });
    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, vec![1.0; 2 * 640]);
    let out = renderer
        .render(&mut session, &schedule, Some(&input), 640)
        .unwrap();

    assert_eq!(out.audio.frames(), 640);
    assert_eq!(out.render_calls, 10);
    assert_eq!(out.skipped_events, 2);
    assert_abs_diff_eq!(out.audio.samples[0], 0.5, epsilon = 1e-6);
    assert_eq!(gain::observed().set_calls, vec![(0, 50)]);
}
