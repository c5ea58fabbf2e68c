//! Error type for the umbrella crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] logue_host_core::Error),

    #[error("Invalid duration: {0} s")]
    InvalidDuration(f64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<logue_host_core::LoadError> for Error {
    fn from(err: logue_host_core::LoadError) -> Self {
        Self::Core(err.into())
    }
}

impl From<logue_host_core::LifecycleError> for Error {
    fn from(err: logue_host_core::LifecycleError) -> Self {
        Self::Core(err.into())
    }
}

impl From<logue_host_core::PresetError> for Error {
    fn from(err: logue_host_core::PresetError) -> Self {
        Self::Core(err.into())
    }
}

impl Error {
    /// The load failure behind this error, if any.
    pub fn as_load(&self) -> Option<&logue_host_core::LoadError> {
        match self {
            Self::Core(logue_host_core::Error::Load(e)) => Some(e),
            _ => None,
        }
    }

    /// The rejected init result behind this error, if any.
    pub fn as_init(&self) -> Option<logue_host_core::InitError> {
        match self {
            Self::Core(logue_host_core::Error::Init(e)) => Some(*e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
