//! Error types for unit hosting

use std::path::PathBuf;

use logue_abi::{init_code, DescriptorError};
use thiserror::Error;

use crate::lifecycle::UnitState;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot open unit: {path}\n  Reason: {reason}")]
    CannotOpen { path: PathBuf, reason: String },

    #[error("Unit {path} does not export required symbol `{symbol}`")]
    MissingRequiredSymbol { path: PathBuf, symbol: &'static str },

    #[error("Unit {path} has an invalid header: {source}")]
    InvalidDescriptor {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },
}

/// Non-zero result of `unit_init`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("unit rejected the runtime target")]
    Target,

    #[error("unit rejected the API version")]
    ApiVersion,

    #[error("unit rejected the sample rate")]
    SampleRate,

    #[error("unit rejected the buffer geometry")]
    Geometry,

    #[error("unit ran out of memory")]
    Memory,

    #[error("unit init failed (code {0})")]
    Undefined(i8),
}

impl InitError {
    /// Maps an init result code; `None` means success.
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            init_code::NONE => None,
            init_code::TARGET => Some(Self::Target),
            init_code::API_VERSION => Some(Self::ApiVersion),
            init_code::SAMPLERATE => Some(Self::SampleRate),
            init_code::GEOMETRY => Some(Self::Geometry),
            init_code::MEMORY => Some(Self::Memory),
            other => Some(Self::Undefined(other)),
        }
    }

    pub fn code(self) -> i8 {
        match self {
            Self::Target => init_code::TARGET,
            Self::ApiVersion => init_code::API_VERSION,
            Self::SampleRate => init_code::SAMPLERATE,
            Self::Geometry => init_code::GEOMETRY,
            Self::Memory => init_code::MEMORY,
            Self::Undefined(code) => code,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{operation} requires an initialized unit (state: {state})")]
    NotRunning {
        operation: &'static str,
        state: UnitState,
    },

    #[error("{operation} is not legal in state {state}")]
    InvalidTransition {
        operation: &'static str,
        state: UnitState,
    },

    #[error("runtime target must be bound before init")]
    TargetNotBound,

    #[error("{buffer} buffer holds {actual} samples, render needs {required}")]
    BufferTooSmall {
        buffer: &'static str,
        required: usize,
        actual: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("capacity {0} is not a power of two (>= 2)")]
    CapacityNotPowerOfTwo(usize),
}

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("preset name is empty")]
    EmptyName,

    #[error("preset name is {0} characters (max 63)")]
    NameTooLong(usize),

    #[error("preset name contains a path separator: {0}")]
    InvalidName(String),

    #[error("preset holds {0} values (max 24)")]
    TooManyParams(usize),

    #[error("preset not found: {0}")]
    NotFound(String),

    #[error("malformed preset: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Init failed: {0}")]
    Init(#[from] InitError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Invalid descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Parameter index {0} out of range")]
    ParamIndex(usize),

    #[error("Queue: {0}")]
    Queue(#[from] QueueError),

    #[error("Preset: {0}")]
    Preset(#[from] PresetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
