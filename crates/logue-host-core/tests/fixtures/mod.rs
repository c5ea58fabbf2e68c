//! In-process units for integration tests.
//!
//! Each unit keeps its state in a thread-local, so tests running in parallel
//! never see each other's calls. All entry points are called on the test's
//! own thread.

#![allow(dead_code)]

use std::cell::RefCell;
use std::ffi::c_char;

use logue_host_core::abi::{
    ModuleKind, ParamDescriptor, ParamType, RuntimeDesc, UnitDescriptor, MAX_PARAMS,
};
use logue_host_core::{Module, UnitCallbacks};

pub const TEST_SAMPLE_RATE: u32 = 48_000;

/// What a unit observed through its entry points.
#[derive(Debug, Clone, Default)]
pub struct Observed {
    pub params: [i32; MAX_PARAMS],
    pub init_calls: u32,
    pub renders: u64,
    pub frames: u64,
    pub teardowns: u32,
    pub resets: u32,
    pub inputs: usize,
    pub outputs: usize,
    pub sample_rate: u32,
    pub target: u16,
    pub notes: Vec<(u8, u8)>,
    pub held: Option<u8>,
    pub preset: u8,
    pub set_calls: Vec<(u8, i32)>,
}

fn observe(desc: *const RuntimeDesc, state: &mut Observed) {
    let desc = unsafe { &*desc };
    state.init_calls += 1;
    state.inputs = desc.input_channels as usize;
    state.outputs = desc.output_channels as usize;
    state.sample_rate = { desc.samplerate };
    state.target = { desc.target };
}

/// Stereo gain effect: output = input * LEVEL / 100.
///
/// Parameters sit in slots 0, 4, 8 and 12 with defaults 100, 80, 80, 90.
pub mod gain {
    use super::*;

    thread_local! {
        static STATE: RefCell<Observed> = RefCell::new(Observed::default());
        static INIT_RESULT: RefCell<i8> = const { RefCell::new(0) };
    }

    pub const DEFAULTS: [(usize, i32); 4] = [(0, 100), (4, 80), (8, 80), (12, 90)];

    pub fn descriptor() -> UnitDescriptor {
        UnitDescriptor::new("GainFx", ModuleKind::DelayFx)
            .with_ids(0x434C_444D, 0x0000_0101)
            .with_param(0, ParamDescriptor::new("LEVEL", 0, 100, 100).with_type(ParamType::Percent))
            .with_param(4, ParamDescriptor::new("TIME", 0, 100, 80).with_type(ParamType::Percent))
            .with_param(8, ParamDescriptor::new("FEEDBACK", 0, 100, 80).with_type(ParamType::Percent))
            .with_param(12, ParamDescriptor::new("MIX", 0, 100, 90).with_type(ParamType::Percent))
    }

    unsafe extern "C" fn init(desc: *const RuntimeDesc) -> i8 {
        let result = INIT_RESULT.with(|r| *r.borrow());
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            observe(desc, &mut s);
            if result == 0 {
                for (index, value) in DEFAULTS {
                    s.params[index] = value;
                }
            }
        });
        result
    }

    unsafe extern "C" fn render(input: *const f32, output: *mut f32, frames: u32) {
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            s.renders += 1;
            s.frames += frames as u64;
            let (inputs, outputs) = (s.inputs, s.outputs);
            let gain = s.params[0] as f32 / 100.0;
            let input = std::slice::from_raw_parts(input, frames as usize * inputs);
            let output = std::slice::from_raw_parts_mut(output, frames as usize * outputs);
            for f in 0..frames as usize {
                for c in 0..outputs {
                    output[f * outputs + c] = if inputs == 0 {
                        0.0
                    } else {
                        input[f * inputs + c % inputs] * gain
                    };
                }
            }
        });
    }

    unsafe extern "C" fn teardown() {
        STATE.with(|s| s.borrow_mut().teardowns += 1);
    }

    unsafe extern "C" fn reset() {
        STATE.with(|s| s.borrow_mut().resets += 1);
    }

    unsafe extern "C" fn set_param(index: u8, value: i32) {
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            s.set_calls.push((index, value));
            if let Some(slot) = s.params.get_mut(index as usize) {
                *slot = value;
            }
        });
    }

    unsafe extern "C" fn get_param(index: u8) -> i32 {
        STATE.with(|s| s.borrow().params.get(index as usize).copied().unwrap_or(0))
    }

    pub fn callbacks() -> UnitCallbacks {
        UnitCallbacks {
            teardown: Some(teardown),
            reset: Some(reset),
            set_param_value: Some(set_param),
            get_param_value: Some(get_param),
            ..UnitCallbacks::new(init, render)
        }
    }

    /// Fresh module with cleared observations.
    pub fn module() -> Module {
        STATE.with(|s| *s.borrow_mut() = Observed::default());
        INIT_RESULT.with(|r| *r.borrow_mut() = 0);
        Module::from_parts(descriptor(), callbacks()).unwrap()
    }

    /// Makes the next `unit_init` calls return `code`.
    pub fn fail_init_with(code: i8) {
        INIT_RESULT.with(|r| *r.borrow_mut() = code);
    }

    pub fn observed() -> Observed {
        STATE.with(|s| s.borrow().clone())
    }
}

/// Mono-voice synth: holds a constant level of `velocity / 127` while a note
/// is down. Ships three presets; reset returns to preset 0.
pub mod synth {
    use super::*;

    thread_local! {
        static STATE: RefCell<Observed> = RefCell::new(Observed::default());
    }

    const PRESET_NAMES: [&[u8]; 3] = [b"INIT\0", b"BASS\0", b"LEAD\0"];

    pub fn descriptor() -> UnitDescriptor {
        UnitDescriptor::new("MonoSynth", ModuleKind::Synth)
            .with_ids(0x434C_444D, 0x0000_0201)
            .with_presets(PRESET_NAMES.len() as u32)
            .with_param(0, ParamDescriptor::new("LEVEL", 0, 100, 100).with_type(ParamType::Percent))
            .with_param(1, ParamDescriptor::new("CUTOFF", 0, 127, 64).with_type(ParamType::Hertz))
    }

    unsafe extern "C" fn init(desc: *const RuntimeDesc) -> i8 {
        STATE.with(|s| observe(desc, &mut s.borrow_mut()));
        0
    }

    unsafe extern "C" fn render(_input: *const f32, output: *mut f32, frames: u32) {
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            s.renders += 1;
            s.frames += frames as u64;
            let level = match (s.held, s.notes.last()) {
                (Some(_), Some(&(_, velocity))) => velocity as f32 / 127.0,
                _ => 0.0,
            };
            let output = std::slice::from_raw_parts_mut(output, frames as usize * s.outputs);
            output.fill(level);
        });
    }

    unsafe extern "C" fn note_on(note: u8, velocity: u8) {
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            s.notes.push((note, velocity));
            s.held = Some(note);
        });
    }

    unsafe extern "C" fn note_off(note: u8) {
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            if s.held == Some(note) {
                s.held = None;
            }
        });
    }

    unsafe extern "C" fn set_param(index: u8, value: i32) {
        STATE.with(|s| s.borrow_mut().set_calls.push((index, value)));
    }

    unsafe extern "C" fn reset() {
        STATE.with(|s| {
            let mut s = s.borrow_mut();
            s.resets += 1;
            s.preset = 0;
        });
    }

    unsafe extern "C" fn load_preset(index: u8) {
        if (index as usize) < PRESET_NAMES.len() {
            STATE.with(|s| s.borrow_mut().preset = index);
        }
    }

    unsafe extern "C" fn preset_index() -> u8 {
        STATE.with(|s| s.borrow().preset)
    }

    unsafe extern "C" fn preset_name(index: u8) -> *const c_char {
        match PRESET_NAMES.get(index as usize) {
            Some(name) => name.as_ptr() as *const c_char,
            None => std::ptr::null(),
        }
    }

    pub fn callbacks() -> UnitCallbacks {
        UnitCallbacks {
            reset: Some(reset),
            set_param_value: Some(set_param),
            note_on: Some(note_on),
            note_off: Some(note_off),
            load_preset: Some(load_preset),
            get_preset_index: Some(preset_index),
            get_preset_name: Some(preset_name),
            ..UnitCallbacks::new(init, render)
        }
    }

    pub fn module() -> Module {
        STATE.with(|s| *s.borrow_mut() = Observed::default());
        Module::from_parts(descriptor(), callbacks()).unwrap()
    }

    pub fn observed() -> Observed {
        STATE.with(|s| s.borrow().clone())
    }
}

/// Master effect that emits a NaN on the 11th frame it renders and `2.0`
/// everywhere else.
pub mod broken {
    use super::*;

    thread_local! {
        static FRAMES: RefCell<u64> = const { RefCell::new(0) };
    }

    unsafe extern "C" fn init(_desc: *const RuntimeDesc) -> i8 {
        FRAMES.with(|f| *f.borrow_mut() = 0);
        0
    }

    unsafe extern "C" fn render(_input: *const f32, output: *mut f32, frames: u32) {
        let output = std::slice::from_raw_parts_mut(output, frames as usize * 2);
        FRAMES.with(|seen| {
            let mut seen = seen.borrow_mut();
            for f in 0..frames as usize {
                let value = if *seen + f as u64 == 10 { f32::NAN } else { 2.0 };
                output[f * 2] = value;
                output[f * 2 + 1] = value;
            }
            *seen += frames as u64;
        });
    }

    pub fn module() -> Module {
        let desc = UnitDescriptor::new("Broken", ModuleKind::MasterFx);
        Module::from_parts(desc, UnitCallbacks::new(init, render)).unwrap()
    }
}

/// Adds its input onto whatever is already in the output buffer, so any
/// stale scratch content would leak into the result.
pub mod accumulate {
    use super::*;

    thread_local! {
        static CHANNELS: RefCell<(usize, usize)> = const { RefCell::new((0, 0)) };
    }

    unsafe extern "C" fn init(desc: *const RuntimeDesc) -> i8 {
        let desc = &*desc;
        CHANNELS.with(|c| {
            *c.borrow_mut() = (desc.input_channels as usize, desc.output_channels as usize)
        });
        0
    }

    unsafe extern "C" fn render(input: *const f32, output: *mut f32, frames: u32) {
        let (inputs, outputs) = CHANNELS.with(|c| *c.borrow());
        let input = std::slice::from_raw_parts(input, frames as usize * inputs);
        let output = std::slice::from_raw_parts_mut(output, frames as usize * outputs);
        for f in 0..frames as usize {
            for c in 0..outputs {
                output[f * outputs + c] += input[f * inputs + c % inputs];
            }
        }
    }

    pub fn module() -> Module {
        let desc = UnitDescriptor::new("Accum", ModuleKind::ReverbFx);
        Module::from_parts(desc, UnitCallbacks::new(init, render)).unwrap()
    }
}

/// Interleaved ramp, `frames` long, distinct per channel.
pub fn ramp(channels: usize, frames: usize) -> Vec<f32> {
    (0..frames * channels)
        .map(|i| {
            let (f, c) = (i / channels, i % channels);
            ((f % 100) as f32 / 100.0) * if c % 2 == 0 { 1.0 } else { -1.0 }
        })
        .collect()
}
