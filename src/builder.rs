//! Builder for configuring and constructing a `UnitHost`.

use std::path::Path;

use logue_host_core::{HostConfig, Module, Session};
use tracing::debug;

use crate::{Result, UnitHost};

/// Host settings default to 48 kHz, 256-frame blocks, stereo in and out.
///
/// # Example
///
/// ```ignore
/// use logue_host::prelude::*;
///
/// let mut host = UnitHost::builder()
///     .sample_rate(48_000)
///     .block_size(64)
///     .build_from_path("units/reverb.drmlgunit")?;
///
/// let out = host.render_seconds(2.0, None)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct UnitHostBuilder {
    config: HostConfig,
}

impl UnitHostBuilder {
    /// Default: 48000
    pub fn sample_rate(mut self, hz: u32) -> Self {
        self.config.sample_rate = hz;
        self
    }

    /// Default: 256
    pub fn block_size(mut self, frames: usize) -> Self {
        self.config.block_size = frames;
        self
    }

    /// Output channel count (1 or 2). Default: 2
    pub fn channels(mut self, count: u8) -> Self {
        self.config.output_channels = count;
        self
    }

    /// Input channel count (0 to 2). Default: 2
    pub fn input_channels(mut self, count: u8) -> Self {
        self.config.input_channels = count;
        self
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the unit at `path` and brings it up.
    pub fn build_from_path(self, path: impl AsRef<Path>) -> Result<UnitHost> {
        self.config.validate()?;
        let module = Module::load(path)?;
        self.build_from_module(module)
    }

    /// Brings up an already loaded (or in-process) unit.
    pub fn build_from_module(self, module: Module) -> Result<UnitHost> {
        debug!(config = ?self.config, unit = %module.descriptor().name, "building host");
        let session = Session::open(module, &self.config)?;
        Ok(UnitHost::from_session(session))
    }
}
