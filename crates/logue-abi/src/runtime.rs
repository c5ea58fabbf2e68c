//! Runtime descriptor handed to `unit_init`, and the C signatures of every unit entry point.

use std::ffi::c_char;

/// `k_unit_api_2_0_0`
pub const UNIT_API_VERSION: u32 = 0x0002_0000;

/// drumlogue platform id, in the high byte of the target field.
pub const UNIT_TARGET_PLATFORM: u16 = 0x0400;

const API_MAJOR_MASK: u32 = 0x007F_0000;
const API_MINOR_MASK: u32 = 0x0000_FF00;

/// A unit built against `api` can run on this host: same major, minor not newer.
pub fn api_is_compatible(api: u32) -> bool {
    (api & API_MAJOR_MASK) == (UNIT_API_VERSION & API_MAJOR_MASK)
        && (api & API_MINOR_MASK) <= (UNIT_API_VERSION & API_MINOR_MASK)
}

/// Sample exposed through the sample-bank accessors.
#[repr(C)]
#[derive(Debug)]
pub struct SampleWrapper {
    pub frames: u32,
    pub channels: u8,
    pub sample_ptr: *const f32,
}

// Points at immutable, 'static sample data.
unsafe impl Send for SampleWrapper {}
unsafe impl Sync for SampleWrapper {}

pub type GetNumSampleBanksFn = unsafe extern "C" fn() -> u8;
pub type GetNumSamplesForBankFn = unsafe extern "C" fn(bank: u8) -> u8;
pub type GetSampleFn = unsafe extern "C" fn(bank: u8, index: u8) -> *const SampleWrapper;

/// `unit_runtime_desc_t`, packed exactly as the unit sees it.
///
/// Never take a reference to a field of this struct; copy fields out by value.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RuntimeDesc {
    pub target: u16,
    pub api: u32,
    pub samplerate: u32,
    pub frames_per_buffer: u16,
    pub input_channels: u8,
    pub output_channels: u8,
    pub get_num_sample_banks: Option<GetNumSampleBanksFn>,
    pub get_num_samples_for_bank: Option<GetNumSamplesForBankFn>,
    pub get_sample: Option<GetSampleFn>,
}

impl std::fmt::Debug for RuntimeDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (target, api, samplerate, frames, inputs, outputs) = (
            self.target,
            self.api,
            self.samplerate,
            self.frames_per_buffer,
            self.input_channels,
            self.output_channels,
        );
        f.debug_struct("RuntimeDesc")
            .field("target", &format_args!("{target:#06x}"))
            .field("api", &format_args!("{api:#010x}"))
            .field("samplerate", &samplerate)
            .field("frames_per_buffer", &frames)
            .field("input_channels", &inputs)
            .field("output_channels", &outputs)
            .finish_non_exhaustive()
    }
}

// Unit entry points. Symbol names are listed in `symbols`.
pub type InitFn = unsafe extern "C" fn(desc: *const RuntimeDesc) -> i8;
pub type TeardownFn = unsafe extern "C" fn();
pub type ResetFn = unsafe extern "C" fn();
pub type ResumeFn = unsafe extern "C" fn();
pub type SuspendFn = unsafe extern "C" fn();
pub type RenderFn = unsafe extern "C" fn(input: *const f32, output: *mut f32, frames: u32);
pub type SetParamValueFn = unsafe extern "C" fn(id: u8, value: i32);
pub type GetParamValueFn = unsafe extern "C" fn(id: u8) -> i32;
pub type GetParamStrValueFn = unsafe extern "C" fn(id: u8, value: i32) -> *const c_char;
pub type GetParamBmpValueFn = unsafe extern "C" fn(id: u8, value: i32) -> *const u8;
pub type SetTempoFn = unsafe extern "C" fn(tempo: u32);
pub type NoteOnFn = unsafe extern "C" fn(note: u8, velocity: u8);
pub type NoteOffFn = unsafe extern "C" fn(note: u8);
pub type GateOnFn = unsafe extern "C" fn(velocity: u8);
pub type GateOffFn = unsafe extern "C" fn();
pub type AllNoteOffFn = unsafe extern "C" fn();
pub type PitchBendFn = unsafe extern "C" fn(bend: u16);
pub type ChannelPressureFn = unsafe extern "C" fn(pressure: u8);
pub type AftertouchFn = unsafe extern "C" fn(note: u8, aftertouch: u8);
pub type LoadPresetFn = unsafe extern "C" fn(index: u8);
pub type GetPresetIndexFn = unsafe extern "C" fn() -> u8;
pub type GetPresetNameFn = unsafe extern "C" fn(index: u8) -> *const c_char;

// `dsp::PerfMon` statics, exported only by units built with `PERF_MON=1`.
pub type PerfCounterCountFn = unsafe extern "C" fn() -> u8;
pub type PerfCounterNameFn = unsafe extern "C" fn(index: u8) -> *const c_char;
pub type PerfCounterValueFn = unsafe extern "C" fn(index: u8) -> u32;

/// Exported symbol names, NUL-terminated for `dlsym`.
pub mod symbols {
    pub const HEADER: &[u8] = b"unit_header\0";
    pub const INIT: &[u8] = b"unit_init\0";
    pub const RENDER: &[u8] = b"unit_render\0";
    pub const TEARDOWN: &[u8] = b"unit_teardown\0";
    pub const RESET: &[u8] = b"unit_reset\0";
    pub const RESUME: &[u8] = b"unit_resume\0";
    pub const SUSPEND: &[u8] = b"unit_suspend\0";
    pub const SET_PARAM_VALUE: &[u8] = b"unit_set_param_value\0";
    pub const GET_PARAM_VALUE: &[u8] = b"unit_get_param_value\0";
    pub const GET_PARAM_STR_VALUE: &[u8] = b"unit_get_param_str_value\0";
    pub const GET_PARAM_BMP_VALUE: &[u8] = b"unit_get_param_bmp_value\0";
    pub const SET_TEMPO: &[u8] = b"unit_set_tempo\0";
    pub const NOTE_ON: &[u8] = b"unit_note_on\0";
    pub const NOTE_OFF: &[u8] = b"unit_note_off\0";
    pub const GATE_ON: &[u8] = b"unit_gate_on\0";
    pub const GATE_OFF: &[u8] = b"unit_gate_off\0";
    pub const ALL_NOTE_OFF: &[u8] = b"unit_all_note_off\0";
    pub const PITCH_BEND: &[u8] = b"unit_pitch_bend\0";
    pub const CHANNEL_PRESSURE: &[u8] = b"unit_channel_pressure\0";
    pub const AFTERTOUCH: &[u8] = b"unit_aftertouch\0";
    pub const LOAD_PRESET: &[u8] = b"unit_load_preset\0";
    pub const GET_PRESET_INDEX: &[u8] = b"unit_get_preset_index\0";
    pub const GET_PRESET_NAME: &[u8] = b"unit_get_preset_name\0";

    /// Itanium-mangled `dsp::PerfMon` static methods.
    pub mod perf_mon {
        pub const COUNTER_COUNT: &[u8] = b"_ZN3dsp7PerfMon15GetCounterCountEv\0";
        pub const COUNTER_NAME: &[u8] = b"_ZN3dsp7PerfMon14GetCounterNameEh\0";
        pub const AVERAGE_CYCLES: &[u8] = b"_ZN3dsp7PerfMon17GetAverageCyclesEh\0";
        pub const PEAK_CYCLES: &[u8] = b"_ZN3dsp7PerfMon14GetPeakCyclesEh\0";
        pub const MIN_CYCLES: &[u8] = b"_ZN3dsp7PerfMon13GetMinCyclesEh\0";
        pub const FRAME_COUNT: &[u8] = b"_ZN3dsp7PerfMon13GetFrameCountEh\0";
    }

    /// Symbol name without the trailing NUL, for messages.
    pub fn display(symbol: &[u8]) -> &str {
        let trimmed = symbol.strip_suffix(b"\0").unwrap_or(symbol);
        std::str::from_utf8(trimmed).unwrap_or("<non-utf8 symbol>")
    }
}

/// Result codes returned by `unit_init`.
pub mod init_code {
    pub const NONE: i8 = 0;
    pub const TARGET: i8 = -1;
    pub const API_VERSION: i8 = -2;
    pub const SAMPLERATE: i8 = -4;
    pub const GEOMETRY: i8 = -8;
    pub const MEMORY: i8 = -16;
    pub const UNDEF: i8 = -32;
}
