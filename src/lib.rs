//! # logue-host
//!
//! Desktop host runtime for drumlogue units.
//!
//! ## Architecture
//!
//! `logue-host` is an umbrella crate over:
//! - **logue-abi** - unit header layout, parameter metadata, runtime descriptor and entry-point types
//! - **logue-host-core** - loader, runtime context, lifecycle state machine, render loop,
//!   profiling, control queue, presets
//!
//! ## Quick Start
//!
//! ```ignore
//! use logue_host::prelude::*;
//!
//! let mut host = UnitHost::builder()
//!     .sample_rate(48_000)
//!     .block_size(64)
//!     .build_from_path("build/delay.drmlgunit")?;
//!
//! host.set_param(0, 50)?;
//! let out = host.render_seconds(1.0, None)?;
//! assert!(!out.audibility.has_nonfinite());
//! ```

/// Re-export of logue-abi for direct access
pub use logue_abi as abi;

/// Re-export of logue-host-core for direct access
pub use logue_host_core as core;

pub use logue_abi::{
    FracMode, ModuleKind, ParamDescriptor, ParamType, UnitDescriptor, UnitVersion, MAX_PARAMS,
    UNIT_API_VERSION, UNIT_HEADER_SIZE, UNIT_TARGET_PLATFORM,
};

pub use logue_host_core::{
    queue, AudibilityReport, AudioBuffer, BlockRenderer, Capability, Drained, EventSchedule,
    Headroom, HeadroomAssessment, HostConfig, IdentityMismatch, InitError, LifecycleError,
    LoadError, LoadMeter, LoadMetrics, Module, ParamMessage, PerfCounter, PerfCounters, PerfMonCallbacks,
    Preset, PresetApplication, PresetAudit, PresetError, PresetStore, ProfileReport, RenderOutput,
    RenderProfiler, RuntimeContext, ScheduledEvent, Session, UnitCallbacks, UnitEvent, UnitInfo,
    UnitInstance, UnitState,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod host;

pub use builder::UnitHostBuilder;
pub use host::UnitHost;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{UnitHost, UnitHostBuilder};

    pub use crate::{AudioBuffer, EventSchedule, HostConfig, UnitEvent};

    pub use crate::{ModuleKind, ParamType, UnitDescriptor};

    pub use crate::{Preset, PresetStore};
}
