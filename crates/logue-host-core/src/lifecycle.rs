//! Lifecycle state machine guarding every call into a unit.
//!
//! ```text
//! Unloaded <- Loaded -> Initialized <-> Suspended
//!               |            |              |
//!               +------------+--------------+--> TornDown --> Unloaded
//! ```
//!
//! Render, parameter, note, tempo and preset calls are legal only while the
//! unit is `Initialized` or `Suspended`. Anywhere else they fail with
//! [`LifecycleError::NotRunning`] instead of silently doing nothing.

use std::ffi::{c_char, CStr};
use std::fmt;
use std::ptr::NonNull;

use logue_abi::{ModuleKind, UnitDescriptor};
use tracing::{debug, info, warn};

use crate::context::RuntimeContext;
use crate::error::{InitError, LifecycleError};
use crate::module::{Module, UnitCallbacks};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitState {
    Unloaded,
    Loaded,
    Initialized,
    Suspended,
    TornDown,
}

impl UnitState {
    /// Render and parameter calls are legal.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Initialized | Self::Suspended)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loaded => write!(f, "loaded"),
            Self::Initialized => write!(f, "initialized"),
            Self::Suspended => write!(f, "suspended"),
            Self::TornDown => write!(f, "torn down"),
        }
    }
}

type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

/// A module plus the host-side state that gates calls into it.
pub struct UnitInstance {
    module: Option<Module>,
    state: UnitState,
    /// (input, output) channels the unit was initialized with.
    geometry: (usize, usize),
}

impl UnitInstance {
    pub fn new(module: Module) -> Self {
        Self {
            module: Some(module),
            state: UnitState::Loaded,
            geometry: (0, 0),
        }
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    pub fn descriptor(&self) -> Option<&UnitDescriptor> {
        self.module.as_ref().map(Module::descriptor)
    }

    pub fn kind(&self) -> Option<ModuleKind> {
        self.module.as_ref().map(Module::kind)
    }

    fn loaded(&self, operation: &'static str) -> LifecycleResult<&UnitCallbacks> {
        match &self.module {
            Some(module) if self.state != UnitState::TornDown => Ok(module.callbacks()),
            _ => Err(LifecycleError::InvalidTransition {
                operation,
                state: self.state,
            }),
        }
    }

    fn running(&self, operation: &'static str) -> LifecycleResult<&UnitCallbacks> {
        match &self.module {
            Some(module) if self.state.is_running() => Ok(module.callbacks()),
            _ => Err(LifecycleError::NotRunning {
                operation,
                state: self.state,
            }),
        }
    }

    /// `Loaded -> Initialized`. A rejected init leaves the unit `Loaded` so the
    /// caller can retry with a different context.
    pub fn init(&mut self, context: &RuntimeContext) -> Result<()> {
        if self.state != UnitState::Loaded {
            return Err(LifecycleError::InvalidTransition {
                operation: "init",
                state: self.state,
            }
            .into());
        }
        if context.bound_kind().is_none() {
            return Err(LifecycleError::TargetNotBound.into());
        }
        let init = self.loaded("init")?.init;

        let code = unsafe { init(context.as_ptr()) };
        if let Some(err) = InitError::from_code(code) {
            warn!(code, %err, "unit init rejected");
            return Err(err.into());
        }

        self.geometry = (context.input_channels(), context.output_channels());
        self.state = UnitState::Initialized;
        info!(
            sample_rate = context.sample_rate(),
            block_size = context.block_size(),
            "unit initialized"
        );
        Ok(())
    }

    /// Forwards `unit_reset`. No state change.
    pub fn reset(&mut self) -> LifecycleResult<()> {
        if let Some(reset) = self.running("reset")?.reset {
            unsafe { reset() };
        }
        Ok(())
    }

    /// `Initialized -> Suspended`. Suspending twice is a no-op.
    pub fn suspend(&mut self) -> LifecycleResult<()> {
        let suspend = self.running("suspend")?.suspend;
        if self.state == UnitState::Suspended {
            return Ok(());
        }
        if let Some(suspend) = suspend {
            unsafe { suspend() };
        }
        self.state = UnitState::Suspended;
        Ok(())
    }

    /// `Suspended -> Initialized`. Also forwarded while already initialized,
    /// which is how a unit is brought up after init.
    pub fn resume(&mut self) -> LifecycleResult<()> {
        if let Some(resume) = self.running("resume")?.resume {
            unsafe { resume() };
        }
        self.state = UnitState::Initialized;
        Ok(())
    }

    /// Any live state `-> TornDown`. Teardown is only forwarded to units that
    /// were initialized, and never twice.
    pub fn teardown(&mut self) -> LifecycleResult<()> {
        match self.state {
            UnitState::TornDown => {
                warn!("teardown requested on a unit that is already torn down");
                Ok(())
            }
            UnitState::Unloaded => Err(LifecycleError::InvalidTransition {
                operation: "teardown",
                state: self.state,
            }),
            UnitState::Loaded => {
                self.state = UnitState::TornDown;
                Ok(())
            }
            UnitState::Initialized | UnitState::Suspended => {
                if let Some(teardown) = self.running("teardown")?.teardown {
                    unsafe { teardown() };
                }
                self.state = UnitState::TornDown;
                info!("unit torn down");
                Ok(())
            }
        }
    }

    /// Tears down if needed and releases the module. Always ends `Unloaded`.
    pub fn unload(&mut self) -> LifecycleResult<()> {
        if self.state == UnitState::Unloaded {
            return Ok(());
        }
        if self.state != UnitState::TornDown {
            self.teardown()?;
        }
        if let Some(module) = self.module.take() {
            module.close();
        }
        self.state = UnitState::Unloaded;
        Ok(())
    }

    /// Calls `unit_render` for `frames` frames of interleaved audio.
    ///
    /// The buffers must hold at least `frames` times the channel counts the unit
    /// was initialized with.
    pub fn render(&mut self, input: &[f32], output: &mut [f32], frames: u32) -> LifecycleResult<()> {
        let render = self.running("render")?.render;
        let (inputs, outputs) = self.geometry;
        let frames_usize = frames as usize;
        if input.len() < frames_usize * inputs {
            return Err(LifecycleError::BufferTooSmall {
                buffer: "input",
                required: frames_usize * inputs,
                actual: input.len(),
            });
        }
        if output.len() < frames_usize * outputs {
            return Err(LifecycleError::BufferTooSmall {
                buffer: "output",
                required: frames_usize * outputs,
                actual: output.len(),
            });
        }
        unsafe { render(input.as_ptr(), output.as_mut_ptr(), frames) };
        Ok(())
    }

    /// Returns `false` when the unit has no `unit_set_param_value`.
    pub fn set_param(&mut self, index: u8, value: i32) -> LifecycleResult<bool> {
        Ok(match self.running("set_param")?.set_param_value {
            Some(set) => {
                unsafe { set(index, value) };
                true
            }
            None => false,
        })
    }

    pub fn get_param(&self, index: u8) -> LifecycleResult<Option<i32>> {
        Ok(self
            .running("get_param")?
            .get_param_value
            .map(|get| unsafe { get(index) }))
    }

    /// String the unit renders for `value`, when it provides one.
    pub fn param_str(&self, index: u8, value: i32) -> LifecycleResult<Option<String>> {
        Ok(match self.running("param_str")?.get_param_str_value {
            Some(get) => unsafe { owned_c_str(get(index, value)) },
            None => None,
        })
    }

    /// Bitmap the unit renders for `value`. The data is owned by the unit.
    pub fn param_bitmap(&self, index: u8, value: i32) -> LifecycleResult<Option<NonNull<u8>>> {
        Ok(self
            .running("param_bitmap")?
            .get_param_bmp_value
            .and_then(|get| NonNull::new(unsafe { get(index, value) } as *mut u8)))
    }

    pub fn set_tempo(&mut self, tempo: u32) -> LifecycleResult<bool> {
        let set = self.running("set_tempo")?.set_tempo;
        Ok(forward(set, |f| unsafe { f(tempo) }))
    }

    pub fn note_on(&mut self, note: u8, velocity: u8) -> LifecycleResult<bool> {
        let on = self.running("note_on")?.note_on;
        Ok(forward(on, |f| unsafe { f(note, velocity) }))
    }

    pub fn note_off(&mut self, note: u8) -> LifecycleResult<bool> {
        let off = self.running("note_off")?.note_off;
        Ok(forward(off, |f| unsafe { f(note) }))
    }

    pub fn gate_on(&mut self, velocity: u8) -> LifecycleResult<bool> {
        let on = self.running("gate_on")?.gate_on;
        Ok(forward(on, |f| unsafe { f(velocity) }))
    }

    pub fn gate_off(&mut self) -> LifecycleResult<bool> {
        let off = self.running("gate_off")?.gate_off;
        Ok(forward(off, |f| unsafe { f() }))
    }

    pub fn all_notes_off(&mut self) -> LifecycleResult<bool> {
        let off = self.running("all_notes_off")?.all_note_off;
        Ok(forward(off, |f| unsafe { f() }))
    }

    pub fn pitch_bend(&mut self, bend: u16) -> LifecycleResult<bool> {
        let bend_fn = self.running("pitch_bend")?.pitch_bend;
        Ok(forward(bend_fn, |f| unsafe { f(bend) }))
    }

    pub fn channel_pressure(&mut self, pressure: u8) -> LifecycleResult<bool> {
        let cp = self.running("channel_pressure")?.channel_pressure;
        Ok(forward(cp, |f| unsafe { f(pressure) }))
    }

    pub fn aftertouch(&mut self, note: u8, pressure: u8) -> LifecycleResult<bool> {
        let at = self.running("aftertouch")?.aftertouch;
        Ok(forward(at, |f| unsafe { f(note, pressure) }))
    }

    pub fn load_preset(&mut self, index: u8) -> LifecycleResult<bool> {
        let load = self.running("load_preset")?.load_preset;
        let loaded = forward(load, |f| unsafe { f(index) });
        if loaded {
            debug!(index, "unit preset loaded");
        }
        Ok(loaded)
    }

    pub fn preset_index(&self) -> LifecycleResult<Option<u8>> {
        Ok(self
            .running("preset_index")?
            .get_preset_index
            .map(|get| unsafe { get() }))
    }

    pub fn preset_name(&self, index: u8) -> LifecycleResult<Option<String>> {
        Ok(match self.running("preset_name")?.get_preset_name {
            Some(get) => unsafe { owned_c_str(get(index)) },
            None => None,
        })
    }
}

impl Drop for UnitInstance {
    fn drop(&mut self) {
        if let Err(e) = self.unload() {
            warn!("unit did not unload cleanly: {e}");
        }
    }
}

impl fmt::Debug for UnitInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitInstance")
            .field("module", &self.module)
            .field("state", &self.state)
            .finish()
    }
}

fn forward<F>(callback: Option<F>, call: impl FnOnce(F)) -> bool {
    match callback {
        Some(f) => {
            call(f);
            true
        }
        None => false,
    }
}

unsafe fn owned_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}
