//! Host runtime for drumlogue units.
//!
//! # Primary API
//!
//! - [`Module`]: a loaded unit (shared library or in-process callbacks)
//! - [`Session`]: one unit driven through its lifecycle with a parameter cache
//!   and a control queue
//! - [`BlockRenderer`]: the fixed-block render loop, with event scheduling,
//!   audibility scanning and profiling
//! - [`UnitInstance`]: the lifecycle state machine guarding every call into a unit
//! - [`PresetStore`] / [`PresetAudit`]: host presets and the unit's own presets
//!
//! # Example
//!
//! ```ignore
//! use logue_host_core::{BlockRenderer, EventSchedule, HostConfig, Module, Session};
//!
//! let module = Module::load("units/delay.drmlgunit")?;
//! let mut session = Session::open(module, &HostConfig::default())?;
//! let mut renderer = BlockRenderer::new(session.context());
//! let out = renderer.render(&mut session, &EventSchedule::new(), None, 48_000)?;
//! println!("{}", out.audibility);
//! ```

mod audibility;
mod config;
mod context;
mod error;
mod event;
mod lifecycle;
mod module;
mod perf;
mod preset;
pub mod queue;
mod render;
mod session;

pub use audibility::{AudibilityReport, CLIP_LEVEL};
pub use config::HostConfig;
pub use context::{RuntimeContext, SampleBankAccessors};
pub use error::{Error, InitError, LifecycleError, LoadError, PresetError, QueueError, Result};
pub use event::{
    EventSchedule, ScheduledEvent, UnitEvent, GENERATOR_PROFILE_SECS, PROFILE_NOTES,
    PROFILE_VARIATIONS, PROFILE_VELOCITIES,
};
pub use lifecycle::{UnitInstance, UnitState};
pub use module::{Capability, Module, PerfMonCallbacks, UnitCallbacks};
pub use perf::{
    Headroom, HeadroomAssessment, LoadMeter, LoadMetrics, PerfCounter, PerfCounters,
    ProfileReport, RenderProfiler, CYCLES_PER_SAMPLE,
};
pub use preset::{
    IdentityMismatch, Preset, PresetApplication, PresetAudit, PresetCheck, PresetStore,
    ResetObservation, SwitchFailure, MAX_PRESET_NAME_LEN, SWITCH_CYCLES,
};
pub use queue::{Consumer, Producer};
pub use render::{AudioBuffer, BlockRenderer, RenderOutput};
pub use session::{Drained, ParamInfo, ParamMessage, ParamVector, Session, UnitInfo};

pub use logue_abi as abi;
