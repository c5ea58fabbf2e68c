//! `UnitHost`: a session plus its render loop behind one handle.

use std::sync::Arc;

use logue_host_core::abi::UnitDescriptor;
use logue_host_core::{
    AudioBuffer, BlockRenderer, EventSchedule, HostConfig, LoadMeter, LoadMetrics, ParamMessage,
    PerfCounters, Preset, PresetApplication, PresetAudit, Producer, RenderOutput, Session,
    UnitInfo, UnitState, GENERATOR_PROFILE_SECS,
};
use tracing::info;

use crate::{Error, Result};

/// A unit brought up and ready to render.
///
/// # Example
///
/// ```ignore
/// use logue_host::prelude::*;
///
/// let mut host = UnitHost::builder().block_size(64).build_from_path("synth.drmlgunit")?;
/// let out = host.profile(10.0, None, 42)?;
/// if let Some(report) = &out.profile {
///     println!("{report}");
/// }
/// ```
pub struct UnitHost {
    session: Session,
    renderer: BlockRenderer,
    load_meter: Arc<LoadMeter>,
}

impl UnitHost {
    pub fn builder() -> crate::UnitHostBuilder {
        crate::UnitHostBuilder::default()
    }

    pub(crate) fn from_session(session: Session) -> Self {
        let ctx = session.context();
        let load_meter = Arc::new(LoadMeter::new(ctx.sample_rate(), ctx.block_size()));
        let renderer = BlockRenderer::new(ctx).with_load_meter(load_meter.clone());
        Self {
            session,
            renderer,
            load_meter,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn config(&self) -> &HostConfig {
        self.session.context().config()
    }

    pub fn sample_rate(&self) -> u32 {
        self.session.context().sample_rate()
    }

    pub fn state(&self) -> UnitState {
        self.session.state()
    }

    pub fn descriptor(&self) -> Option<&UnitDescriptor> {
        self.session.descriptor()
    }

    pub fn info(&self) -> Option<UnitInfo> {
        self.session.describe()
    }

    pub fn set_param(&mut self, index: usize, value: i32) -> Result<()> {
        Ok(self.session.set_param(index, value)?)
    }

    pub fn param_value(&self, index: usize) -> Result<i32> {
        Ok(self.session.param_value(index)?)
    }

    /// Sender for parameter changes from another thread, applied at block
    /// boundaries.
    pub fn control(&mut self, capacity: usize) -> Result<Producer<ParamMessage>> {
        Ok(self.session.control_channel(capacity)?)
    }

    /// Live load figures, readable from any thread.
    pub fn load_meter(&self) -> Arc<LoadMeter> {
        self.load_meter.clone()
    }

    pub fn load_metrics(&self) -> LoadMetrics {
        self.load_meter.metrics()
    }

    pub fn render(
        &mut self,
        schedule: &EventSchedule,
        input: Option<&AudioBuffer>,
        frames: u64,
    ) -> Result<RenderOutput> {
        Ok(self
            .renderer
            .render(&mut self.session, schedule, input, frames)?)
    }

    /// Renders `seconds` of audio. Generators are played the standard note
    /// sequence; effects get no events.
    pub fn render_seconds(
        &mut self,
        seconds: f64,
        input: Option<&AudioBuffer>,
    ) -> Result<RenderOutput> {
        let frames = self.frames_for(seconds)?;
        let schedule = match self.session.descriptor() {
            Some(descriptor) => EventSchedule::notes(descriptor, self.sample_rate(), frames),
            None => EventSchedule::new(),
        };
        self.render(&schedule, input, frames)
    }

    /// Renders under the profiling workload (notes and parameter sweeps for
    /// generators, plain audio for effects).
    ///
    /// Generators always run for at least [`GENERATOR_PROFILE_SECS`], with
    /// silence once `input` runs out.
    pub fn profile(
        &mut self,
        seconds: f64,
        input: Option<&AudioBuffer>,
        seed: u64,
    ) -> Result<RenderOutput> {
        let mut frames = self.frames_for(seconds)?;
        let schedule = match self.session.descriptor() {
            Some(descriptor) => {
                if descriptor.kind().is_generator() {
                    frames = frames.max(GENERATOR_PROFILE_SECS as u64 * self.sample_rate() as u64);
                }
                EventSchedule::profiling(descriptor, self.sample_rate(), frames, seed)
            }
            None => EventSchedule::new(),
        };
        info!(frames, events = schedule.len(), "profiling unit");
        self.render(&schedule, input, frames)
    }

    fn frames_for(&self, seconds: f64) -> Result<u64> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(Error::InvalidDuration(seconds));
        }
        Ok((seconds * self.sample_rate() as f64).round() as u64)
    }

    pub fn audit_presets(&mut self) -> Result<Option<PresetAudit>> {
        Ok(PresetAudit::run(&mut self.session)?)
    }

    pub fn snapshot_preset(&self, name: &str) -> Result<Preset> {
        Ok(self.session.snapshot_preset(name)?)
    }

    pub fn apply_preset(&mut self, preset: &Preset) -> Result<PresetApplication> {
        Ok(self.session.apply_preset(preset)?)
    }

    /// Cycle counters the unit keeps itself; `None` without `PERF_MON=1`.
    pub fn perf_counters(&self) -> Option<PerfCounters> {
        self.session.perf_counters()
    }

    /// Tears the unit down and unloads it.
    pub fn close(self) -> Result<()> {
        Ok(self.session.close()?)
    }
}

impl std::fmt::Debug for UnitHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitHost")
            .field("session", &self.session)
            .field("block_size", &self.renderer.block_size())
            .finish()
    }
}
