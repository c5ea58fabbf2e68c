//! Error types for header decoding and validation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Header truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Header declares {declared} bytes but the layout needs {required}")]
    HeaderSizeTooSmall { declared: u32, required: usize },

    #[error("Header declares {0} parameters (max 24)")]
    TooManyParams(u32),

    #[error("Parameter {index}: range is inverted (min {min} > max {max})")]
    InvertedRange { index: usize, min: i16, max: i16 },

    #[error("Parameter {index}: default {default} outside [{min}, {max}]")]
    DefaultOutOfRange {
        index: usize,
        min: i16,
        max: i16,
        default: i16,
    },
}

pub type Result<T> = std::result::Result<T, DescriptorError>;
