//! Host lifecycle and rendering through the umbrella API.

use approx::assert_abs_diff_eq;
use logue_host::prelude::*;
use logue_host::{Error, InitError, ParamMessage, UnitState};

use crate::helpers::tolerances::*;
use crate::helpers::*;

#[test]
fn test_builder_defaults() {
    let host = test_host();
    assert_eq!(host.state(), UnitState::Initialized);
    assert_eq!(host.sample_rate(), TEST_SAMPLE_RATE);
    assert_eq!(host.config().block_size, TEST_BUFFER_SIZE);
    assert_eq!(host.config().output_channels, 2);
    assert_eq!(host.descriptor().unwrap().name, "Drive");
}

#[test]
fn test_invalid_config_is_rejected_before_loading() {
    let err = UnitHost::builder()
        .block_size(0)
        .build_from_path("/nonexistent/unit.so")
        .unwrap_err();
    assert!(err.as_load().is_none());
    assert!(err.to_string().contains("Invalid config"));
}

#[test]
fn test_missing_unit_is_a_load_error() {
    let err = UnitHost::builder()
        .build_from_path("/nonexistent/unit.so")
        .unwrap_err();
    assert!(err.as_load().is_some());
}

#[test]
fn test_geometry_rejection_surfaces_as_init_error() {
    let err = UnitHost::builder()
        .channels(1)
        .build_from_module(drive_module())
        .unwrap_err();
    assert_eq!(err.as_init(), Some(InitError::Geometry));
}

#[test]
fn test_passthrough_at_unity() {
    let mut host = test_host();
    let mono = generate_sine(1000.0, TEST_SAMPLE_RATE as f64, 4800);
    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, interleave(&mono, 2));

    let out = host.render_seconds(0.1, Some(&input)).unwrap();
    assert_eq!(out.audio.frames(), 4800);
    assert_eq!(out.render_calls, 75);
    assert!(signals_approx_equal(&out.audio.samples, &input.samples, FLOAT_EPSILON));
    assert!(out.audibility.is_clean());
}

#[test]
fn test_param_scales_output_and_clips_are_reported() {
    let mut host = test_host();
    host.set_param(0, 200).unwrap();
    assert_eq!(host.param_value(0).unwrap(), 200);

    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, vec![0.75; 2 * 640]);
    let out = host.render_seconds(640.0 / TEST_SAMPLE_RATE as f64, Some(&input)).unwrap();
    assert_abs_diff_eq!(out.audio.samples[0], 1.5, epsilon = FLOAT_EPSILON);
    assert_eq!(out.audibility.clipped, 2 * 640);
    assert_eq!(out.audibility.affected_blocks, 10);
    assert!(!out.audibility.has_nonfinite());
}

#[test]
fn test_out_of_range_param_index() {
    let mut host = test_host();
    let err = host.set_param(1, 0).unwrap_err();
    assert!(matches!(
        err,
        Error::Core(logue_host::core::Error::ParamIndex(1))
    ));
}

#[test]
fn test_control_queue_from_another_thread() {
    let mut host = test_host();
    let mut tx = host.control(64).unwrap();
    std::thread::spawn(move || {
        for value in [10, 20, 30] {
            while tx.push(ParamMessage { index: 0, value }).is_err() {
                std::thread::yield_now();
            }
        }
    })
    .join()
    .unwrap();

    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, vec![1.0; 2 * 64]);
    let out = host.render(&EventSchedule::new(), Some(&input), 64).unwrap();
    assert_abs_diff_eq!(out.audio.samples[0], 0.3, epsilon = FLOAT_EPSILON);
    assert_eq!(host.session().params().get(0), Some(30));
}

#[test]
fn test_silence_in_silence_out() {
    let mut host = test_host();
    let out = host.render_seconds(0.05, None).unwrap();
    assert_silence(&out.audio.samples, SILENCE_THRESHOLD);
}

#[test]
fn test_negative_duration_is_rejected() {
    let mut host = test_host();
    assert!(matches!(
        host.render_seconds(-1.0, None),
        Err(Error::InvalidDuration(_))
    ));
}

#[test]
fn test_close_tears_down() {
    let host = test_host();
    host.close().unwrap();
}

#[test]
fn test_info_lists_params() {
    let info = test_host().info().unwrap();
    assert_eq!(info.kind, ModuleKind::MasterFx);
    assert_eq!(info.params.len(), 1);
    assert_eq!(info.params[0].display, "100%");
}

#[test]
fn test_bad_queued_param_does_not_discard_the_render() {
    let mut host = test_host();
    let mut tx = host.control(8).unwrap();
    tx.push(ParamMessage { index: 7, value: 1 }).unwrap();

    let input = AudioBuffer::new(2, TEST_SAMPLE_RATE, vec![0.5; 2 * 640]);
    let out = host.render(&EventSchedule::new(), Some(&input), 640).unwrap();
    assert_eq!(out.audio.frames(), 640);
    assert_eq!(out.skipped_events, 1);
    assert!(signals_approx_equal(&out.audio.samples, &input.samples, FLOAT_EPSILON));
}
