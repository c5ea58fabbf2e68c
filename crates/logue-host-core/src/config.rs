//! Host session configuration.

use crate::{Error, Result};

/// Geometry and clock of a hosting session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    pub sample_rate: u32,
    /// Frames per render call.
    pub block_size: usize,
    pub input_channels: u8,
    pub output_channels: u8,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 256,
            input_channels: 2,
            output_channels: 2,
        }
    }
}

impl HostConfig {
    pub fn new(sample_rate: u32, block_size: usize, input_channels: u8, output_channels: u8) -> Self {
        Self {
            sample_rate,
            block_size,
            input_channels,
            output_channels,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(8000..=384000).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.block_size == 0 || self.block_size > u16::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "block_size {} out of range (1-{})",
                self.block_size,
                u16::MAX
            )));
        }
        if !(1..=2).contains(&self.output_channels) {
            return Err(Error::InvalidConfig(format!(
                "output_channels {} out of range (1-2)",
                self.output_channels
            )));
        }
        if self.input_channels > 2 {
            return Err(Error::InvalidConfig(format!(
                "input_channels {} out of range (0-2)",
                self.input_channels
            )));
        }
        Ok(())
    }

    /// Wall-clock length of one full block.
    pub fn block_duration_secs(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64
    }
}
