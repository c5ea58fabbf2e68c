//! Runtime environment handed to `unit_init`.

use std::f32::consts::TAU;
use std::sync::OnceLock;

use logue_abi::{
    GetNumSampleBanksFn, GetNumSamplesForBankFn, GetSampleFn, ModuleKind, RuntimeDesc,
    SampleWrapper, UNIT_API_VERSION, UNIT_TARGET_PLATFORM,
};
use tracing::debug;

use crate::config::HostConfig;
use crate::Result;

/// Sample-bank accessors exposed to the unit through the runtime descriptor.
#[derive(Debug, Clone, Copy)]
pub struct SampleBankAccessors {
    pub num_banks: GetNumSampleBanksFn,
    pub num_samples_for_bank: GetNumSamplesForBankFn,
    pub sample: GetSampleFn,
}

impl SampleBankAccessors {
    /// One bank holding one second of a 440 Hz sine at 0.1 amplitude (48 kHz, mono).
    pub fn synthetic() -> Self {
        // Build the bank now so the unit's first lookup never allocates.
        synthetic_bank();
        Self {
            num_banks: synthetic_num_banks,
            num_samples_for_bank: synthetic_num_samples,
            sample: synthetic_sample,
        }
    }
}

const SYNTHETIC_FRAMES: usize = 48000;

struct SyntheticBank {
    _data: Box<[f32]>,
    wrapper: SampleWrapper,
}

// The accessor signatures carry no user pointer, so the bank the unit sees has
// to be reachable globally. It is immutable once built.
static SYNTHETIC_BANK: OnceLock<SyntheticBank> = OnceLock::new();

fn synthetic_bank() -> &'static SyntheticBank {
    SYNTHETIC_BANK.get_or_init(|| {
        let data: Box<[f32]> = (0..SYNTHETIC_FRAMES)
            .map(|i| 0.1 * (TAU * 440.0 * i as f32 / SYNTHETIC_FRAMES as f32).sin())
            .collect();
        let wrapper = SampleWrapper {
            frames: SYNTHETIC_FRAMES as u32,
            channels: 1,
            sample_ptr: data.as_ptr(),
        };
        SyntheticBank {
            _data: data,
            wrapper,
        }
    })
}

unsafe extern "C" fn synthetic_num_banks() -> u8 {
    1
}

unsafe extern "C" fn synthetic_num_samples(bank: u8) -> u8 {
    u8::from(bank == 0)
}

unsafe extern "C" fn synthetic_sample(bank: u8, index: u8) -> *const SampleWrapper {
    if bank == 0 && index == 0 {
        &synthetic_bank().wrapper
    } else {
        std::ptr::null()
    }
}

/// The environment a unit is initialized with.
///
/// The descriptor is boxed so its address stays fixed for as long as the unit
/// may hold on to it. A context must outlive every unit initialized with it;
/// [`Session`](crate::Session) guarantees this by tearing the unit down first.
#[derive(Debug)]
pub struct RuntimeContext {
    desc: Box<RuntimeDesc>,
    config: HostConfig,
    bound: Option<ModuleKind>,
}

impl RuntimeContext {
    pub fn build(config: &HostConfig) -> Result<Self> {
        config.validate()?;
        let banks = SampleBankAccessors::synthetic();
        let desc = RuntimeDesc {
            target: UNIT_TARGET_PLATFORM,
            api: UNIT_API_VERSION,
            samplerate: config.sample_rate,
            frames_per_buffer: config.block_size as u16,
            input_channels: config.input_channels,
            output_channels: config.output_channels,
            get_num_sample_banks: Some(banks.num_banks),
            get_num_samples_for_bank: Some(banks.num_samples_for_bank),
            get_sample: Some(banks.sample),
        };
        debug!(?desc, "runtime context built");
        Ok(Self {
            desc: Box::new(desc),
            config: *config,
            bound: None,
        })
    }

    pub fn new(
        sample_rate: u32,
        block_size: usize,
        input_channels: u8,
        output_channels: u8,
    ) -> Result<Self> {
        Self::build(&HostConfig::new(
            sample_rate,
            block_size,
            input_channels,
            output_channels,
        ))
    }

    /// Replaces the synthetic sample bank with caller-provided accessors.
    pub fn with_sample_bank(mut self, accessors: SampleBankAccessors) -> Self {
        self.desc.get_num_sample_banks = Some(accessors.num_banks);
        self.desc.get_num_samples_for_bank = Some(accessors.num_samples_for_bank);
        self.desc.get_sample = Some(accessors.sample);
        self
    }

    /// Folds the unit's module kind into the target field. Must happen before init.
    pub fn bind_target(&mut self, kind: ModuleKind) {
        self.desc.target = UNIT_TARGET_PLATFORM | kind.raw() as u16;
        self.bound = Some(kind);
    }

    pub fn bound_kind(&self) -> Option<ModuleKind> {
        self.bound
    }

    pub fn target(&self) -> u16 {
        self.desc.target
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    pub fn input_channels(&self) -> usize {
        self.config.input_channels as usize
    }

    pub fn output_channels(&self) -> usize {
        self.config.output_channels as usize
    }

    /// Copy of the descriptor as the unit sees it.
    pub fn desc(&self) -> RuntimeDesc {
        *self.desc
    }

    pub(crate) fn as_ptr(&self) -> *const RuntimeDesc {
        &*self.desc
    }
}
