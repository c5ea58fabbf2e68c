//! Block scheduler: drives a session through a fixed-size render loop.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::audibility::AudibilityReport;
use crate::context::RuntimeContext;
use crate::event::EventSchedule;
use crate::perf::{LoadMeter, ProfileReport, RenderProfiler};
use crate::session::Session;
use crate::{Error, Result};

/// Interleaved audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub channels: usize,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    pub fn new(channels: usize, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            channels,
            sample_rate,
            samples,
        }
    }

    pub fn silent(channels: usize, sample_rate: u32, frames: usize) -> Self {
        Self::new(channels, sample_rate, vec![0.0; frames * channels])
    }

    pub fn with_capacity(channels: usize, sample_rate: u32, frames: usize) -> Self {
        Self::new(channels, sample_rate, Vec::with_capacity(frames * channels))
    }

    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn frame(&self, index: usize) -> &[f32] {
        &self.samples[index * self.channels..(index + 1) * self.channels]
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Result of a render run.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub audio: AudioBuffer,
    pub audibility: AudibilityReport,
    pub profile: Option<ProfileReport>,
    pub render_calls: u64,
    /// Events not delivered: the unit lacks the entry point they need, or
    /// they name a parameter slot the unit doesn't have.
    pub skipped_events: u64,
}

/// Fixed-size render loop with preallocated scratch buffers.
///
/// Per block, before the render call: queued control messages are drained,
/// then scheduled events in the block window are applied in order, then the
/// input scratch is filled (copied, downmixed, upmixed, or silence) and the
/// output scratch is zeroed. Nothing inside the loop allocates except the
/// growth of the output buffer, which is reserved up front.
pub struct BlockRenderer {
    block_size: usize,
    input_channels: usize,
    output_channels: usize,
    sample_rate: u32,
    input: Vec<f32>,
    output: Vec<f32>,
    load_meter: Option<Arc<LoadMeter>>,
}

impl BlockRenderer {
    pub fn new(ctx: &RuntimeContext) -> Self {
        let block_size = ctx.block_size();
        Self {
            block_size,
            input_channels: ctx.input_channels(),
            output_channels: ctx.output_channels(),
            sample_rate: ctx.sample_rate(),
            input: vec![0.0; block_size * ctx.input_channels()],
            output: vec![0.0; block_size * ctx.output_channels()],
            load_meter: None,
        }
    }

    /// Also feeds every render timing to `meter`.
    pub fn with_load_meter(mut self, meter: Arc<LoadMeter>) -> Self {
        self.load_meter = Some(meter);
        self
    }

    /// Fills the scratch buffers with `value`. Output must not depend on it.
    pub fn poison(&mut self, value: f32) {
        self.input.fill(value);
        self.output.fill(value);
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Renders `total_frames` frames.
    ///
    /// `input` is read from frame 0; when it is absent or runs out, the unit
    /// gets silence. Lifecycle errors abort the run. Undeliverable events and
    /// audibility problems are counted in the output and never stop it.
    pub fn render(
        &mut self,
        session: &mut Session,
        schedule: &EventSchedule,
        input: Option<&AudioBuffer>,
        total_frames: u64,
    ) -> Result<RenderOutput> {
        let input = input.filter(|buf| buf.channels > 0);
        let mut audio = AudioBuffer::with_capacity(
            self.output_channels,
            self.sample_rate,
            total_frames as usize,
        );
        let mut audibility = AudibilityReport::new();
        let mut profiler = RenderProfiler::new(self.sample_rate, self.block_size);
        if let Some(meter) = &self.load_meter {
            profiler = profiler.with_meter(meter.clone());
        }
        let mut skipped_events = 0u64;

        let mut frame = 0u64;
        while frame < total_frames {
            let frames = (total_frames - frame).min(self.block_size as u64) as usize;

            skipped_events += session.drain_control()?.rejected as u64;
            for scheduled in schedule.window(frame, frames as u64) {
                match session.apply_event(&scheduled.event) {
                    Ok(true) => {}
                    Ok(false) => {
                        skipped_events += 1;
                        debug!(frame = scheduled.frame, event = ?scheduled.event, "event skipped");
                    }
                    Err(Error::ParamIndex(index)) => {
                        skipped_events += 1;
                        warn!(frame = scheduled.frame, index, "scheduled parameter change rejected");
                    }
                    Err(e) => return Err(e),
                }
            }

            self.fill_input(input, frame as usize, frames);
            let out_len = frames * self.output_channels;
            self.output[..out_len].fill(0.0);

            let in_len = frames * self.input_channels;
            let (inbuf, outbuf) = (&self.input[..in_len], &mut self.output[..out_len]);
            profiler.time(frames, || session.render_block(inbuf, outbuf, frames as u32))?;

            let block = &self.output[..out_len];
            audibility.scan_block(block, self.output_channels, frame);
            audio.samples.extend_from_slice(block);
            frame += frames as u64;
        }

        if audibility.has_nonfinite() {
            warn!(%audibility, "unit produced non-finite output");
        }
        if skipped_events > 0 {
            warn!(skipped_events, "some events were not delivered to the unit");
        }

        Ok(RenderOutput {
            audio,
            audibility,
            render_calls: profiler.calls(),
            profile: profiler.report(),
            skipped_events,
        })
    }

    /// Maps frames `[start, start + frames)` of `source` onto the declared input
    /// channels. More source channels are averaged down (source channel `m`
    /// feeds input `m % N`); fewer are repeated (input `c` reads source `c % M`).
    fn fill_input(&mut self, source: Option<&AudioBuffer>, start: usize, frames: usize) {
        let n = self.input_channels;
        if n == 0 {
            return;
        }
        let dst = &mut self.input[..frames * n];
        dst.fill(0.0);

        let Some(source) = source else {
            return;
        };
        let m = source.channels;
        let available = source.frames().saturating_sub(start).min(frames);

        for f in 0..available {
            let src = source.frame(start + f);
            let out = &mut dst[f * n..(f + 1) * n];
            if m > n {
                for (c, s) in src.iter().enumerate() {
                    out[c % n] += s;
                }
                for (k, o) in out.iter_mut().enumerate() {
                    // Number of source channels folded into input k.
                    let folded = (m - k).div_ceil(n);
                    *o /= folded as f32;
                }
            } else {
                for (c, o) in out.iter_mut().enumerate() {
                    *o = src[c % m];
                }
            }
        }
    }
}
