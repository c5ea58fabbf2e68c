//! NaN/Inf/clipping scan of rendered output.
//!
//! Findings are reported after a run; they never interrupt rendering.

use std::fmt;

/// Samples above this magnitude count as clipped.
pub const CLIP_LEVEL: f32 = 1.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudibilityReport {
    pub samples: u64,
    pub nan: u64,
    pub infinite: u64,
    pub clipped: u64,
    /// Largest finite magnitude seen.
    pub peak: f32,
    pub first_nonfinite_frame: Option<u64>,
    /// Blocks containing at least one non-finite or clipped sample.
    pub affected_blocks: u64,
}

impl AudibilityReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans one interleaved block whose first frame is `first_frame`.
    pub fn scan_block(&mut self, block: &[f32], channels: usize, first_frame: u64) {
        let channels = channels.max(1);
        let mut affected = false;
        for (i, &s) in block.iter().enumerate() {
            if s.is_nan() {
                self.nan += 1;
            } else if s.is_infinite() {
                self.infinite += 1;
            } else {
                let magnitude = s.abs();
                if magnitude > self.peak {
                    self.peak = magnitude;
                }
                if magnitude > CLIP_LEVEL {
                    self.clipped += 1;
                    affected = true;
                }
                continue;
            }
            affected = true;
            if self.first_nonfinite_frame.is_none() {
                self.first_nonfinite_frame = Some(first_frame + (i / channels) as u64);
            }
        }
        self.samples += block.len() as u64;
        if affected {
            self.affected_blocks += 1;
        }
    }

    pub fn has_nonfinite(&self) -> bool {
        self.nan > 0 || self.infinite > 0
    }

    pub fn is_clean(&self) -> bool {
        !self.has_nonfinite() && self.clipped == 0
    }

    pub fn peak_dbfs(&self) -> f32 {
        if self.peak > 0.0 {
            20.0 * self.peak.log10()
        } else {
            f32::NEG_INFINITY
        }
    }
}

impl fmt::Display for AudibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(f, "clean (peak {:.1} dBFS)", self.peak_dbfs());
        }
        write!(
            f,
            "{} NaN, {} Inf, {} clipped in {} blocks (peak {:.1} dBFS)",
            self.nan,
            self.infinite,
            self.clipped,
            self.affected_blocks,
            self.peak_dbfs()
        )?;
        if let Some(frame) = self.first_nonfinite_frame {
            write!(f, ", first non-finite at frame {frame}")?;
        }
        Ok(())
    }
}
