//! One hosting session: a unit, its context, its parameter cache and its
//! control queue, owned together.

use std::fmt;

use logue_abi::{api_is_compatible, ModuleKind, ParamType, UnitDescriptor, MAX_PARAMS};
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::context::RuntimeContext;
use crate::error::{Error, LifecycleError};
use crate::event::UnitEvent;
use crate::lifecycle::{UnitInstance, UnitState};
use crate::module::{Capability, Module};
use crate::perf::PerfCounters;
use crate::preset::{IdentityMismatch, Preset, PresetApplication};
use crate::queue::{self, Consumer, Producer};
use crate::Result;

/// Parameter change sent from a control thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamMessage {
    pub index: u8,
    pub value: i32,
}

/// Outcome of one [`Session::drain_control`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    pub applied: usize,
    pub rejected: usize,
}

/// Host-side mirror of the unit's parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamVector {
    values: [i32; MAX_PARAMS],
}

impl ParamVector {
    /// Seeded from the descriptor's defaults.
    pub fn from_defaults(descriptor: &UnitDescriptor) -> Self {
        Self {
            values: descriptor.defaults(),
        }
    }

    pub fn get(&self, index: usize) -> Option<i32> {
        self.values.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: i32) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.values
    }
}

/// A unit driven through its whole lifecycle.
///
/// Fields drop in declaration order, so the unit is torn down and unloaded
/// while its runtime context is still alive.
pub struct Session {
    instance: UnitInstance,
    params: ParamVector,
    control: Option<Consumer<ParamMessage>>,
    context: RuntimeContext,
}

impl Session {
    /// Binds `module` to a fresh context. The unit stays `Loaded` until [`Session::start`].
    pub fn new(module: Module, config: &HostConfig) -> Result<Self> {
        let mut context = RuntimeContext::build(config)?;
        context.bind_target(module.kind());
        let params = ParamVector::from_defaults(module.descriptor());
        if !api_is_compatible(module.descriptor().api) {
            warn!(
                api = format_args!("{:#010x}", module.descriptor().api),
                "unit was built against an incompatible API version"
            );
        }
        Ok(Self {
            instance: UnitInstance::new(module),
            params,
            control: None,
            context,
        })
    }

    /// Creates and starts a session.
    pub fn open(module: Module, config: &HostConfig) -> Result<Self> {
        let mut session = Self::new(module, config)?;
        session.start()?;
        Ok(session)
    }

    /// `init`, then `reset` and `resume`, the bring-up sequence units expect.
    ///
    /// A rejected init leaves the session `Loaded`; call
    /// [`Session::reconfigure`] and try again.
    pub fn start(&mut self) -> Result<()> {
        self.instance.init(&self.context)?;
        self.instance.reset()?;
        self.instance.resume()?;
        Ok(())
    }

    /// Replaces the runtime context. Only legal before a successful init.
    pub fn reconfigure(&mut self, config: &HostConfig) -> Result<()> {
        if self.instance.state() != UnitState::Loaded {
            return Err(LifecycleError::InvalidTransition {
                operation: "reconfigure",
                state: self.instance.state(),
            }
            .into());
        }
        let mut context = RuntimeContext::build(config)?;
        if let Some(kind) = self.instance.kind() {
            context.bind_target(kind);
        }
        self.context = context;
        Ok(())
    }

    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    pub fn instance(&self) -> &UnitInstance {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut UnitInstance {
        &mut self.instance
    }

    pub fn state(&self) -> UnitState {
        self.instance.state()
    }

    pub fn descriptor(&self) -> Option<&UnitDescriptor> {
        self.instance.descriptor()
    }

    pub fn kind(&self) -> Option<ModuleKind> {
        self.instance.kind()
    }

    /// The unit's `PERF_MON` cycle counters, when it exports them.
    pub fn perf_counters(&self) -> Option<PerfCounters> {
        self.instance.module().and_then(Module::perf_counters)
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.instance
            .module()
            .is_some_and(|m| m.supports(capability))
    }

    pub fn params(&self) -> &ParamVector {
        &self.params
    }

    fn check_index(&self, index: usize) -> Result<u8> {
        let slots = self.descriptor().map_or(0, UnitDescriptor::active_slots);
        if index < slots {
            Ok(index as u8)
        } else {
            Err(Error::ParamIndex(index))
        }
    }

    /// Updates the cache and forwards the value to the unit.
    pub fn set_param(&mut self, index: usize, value: i32) -> Result<()> {
        let id = self.check_index(index)?;
        if !self.instance.set_param(id, value)? {
            debug!(index, "unit has no set-param entry point, cache only");
        }
        self.params.set(index, value);
        Ok(())
    }

    /// The unit's own value when it can report one, else the cached value.
    pub fn param_value(&self, index: usize) -> Result<i32> {
        let id = self.check_index(index)?;
        match self.instance.get_param(id)? {
            Some(value) => Ok(value),
            None => Ok(self.params.get(index).unwrap_or_default()),
        }
    }

    /// Display text for the current value of `index`.
    pub fn param_display(&self, index: usize) -> Result<String> {
        let value = self.param_value(index)?;
        let param = self
            .descriptor()
            .and_then(|d| d.param(index))
            .ok_or(Error::ParamIndex(index))?;
        if param.kind == ParamType::Strings {
            if let Some(text) = self.instance.param_str(index as u8, value)? {
                return Ok(text);
            }
        }
        Ok(param.format_value(value))
    }

    /// Producer half of a fresh control queue; the session keeps the consumer
    /// and drains it before every block.
    pub fn control_channel(&mut self, capacity: usize) -> Result<Producer<ParamMessage>> {
        let (producer, consumer) = queue::channel(capacity)?;
        self.control = Some(consumer);
        Ok(producer)
    }

    /// Applies every queued parameter message in FIFO order.
    ///
    /// Messages naming a slot the unit doesn't have are dropped with a warning
    /// and counted in [`Drained::rejected`]; draining continues past them.
    pub fn drain_control(&mut self) -> Result<Drained> {
        let Some(mut control) = self.control.take() else {
            return Ok(Drained::default());
        };
        let mut drained = Drained::default();
        let mut outcome = Ok(());
        while let Some(msg) = control.pop() {
            match self.set_param(msg.index as usize, msg.value) {
                Ok(()) => drained.applied += 1,
                Err(Error::ParamIndex(index)) => {
                    warn!(index, value = msg.value, "queued parameter change rejected");
                    drained.rejected += 1;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        self.control = Some(control);
        outcome.map(|()| drained)
    }

    /// Applies one event. Returns `false` when the unit lacks the entry point.
    pub fn apply_event(&mut self, event: &UnitEvent) -> Result<bool> {
        if let UnitEvent::ParamChange { index, value } = *event {
            self.set_param(index as usize, value)?;
            return Ok(true);
        }
        let unit = &mut self.instance;
        let applied = match *event {
            UnitEvent::ParamChange { .. } => true,
            UnitEvent::NoteOn { note, velocity } => unit.note_on(note, velocity)?,
            UnitEvent::NoteOff { note } => unit.note_off(note)?,
            UnitEvent::GateOn { velocity } => unit.gate_on(velocity)?,
            UnitEvent::GateOff => unit.gate_off()?,
            UnitEvent::AllNotesOff => unit.all_notes_off()?,
            UnitEvent::PitchBend(bend) => unit.pitch_bend(bend)?,
            UnitEvent::ChannelPressure(pressure) => unit.channel_pressure(pressure)?,
            UnitEvent::Aftertouch { note, pressure } => unit.aftertouch(note, pressure)?,
            UnitEvent::Tempo(tempo) => unit.set_tempo(tempo)?,
            UnitEvent::LoadPreset(index) => unit.load_preset(index)?,
        };
        Ok(applied)
    }

    /// One render call. Buffers are interleaved and sized for the context's channels.
    pub fn render_block(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        frames: u32,
    ) -> std::result::Result<(), LifecycleError> {
        self.instance.render(input, output, frames)
    }

    pub fn suspend(&mut self) -> Result<()> {
        Ok(self.instance.suspend()?)
    }

    pub fn resume(&mut self) -> Result<()> {
        Ok(self.instance.resume()?)
    }

    pub fn reset(&mut self) -> Result<()> {
        Ok(self.instance.reset()?)
    }

    pub fn teardown(&mut self) -> Result<()> {
        Ok(self.instance.teardown()?)
    }

    /// Tears the unit down and releases it.
    pub fn close(mut self) -> Result<()> {
        self.instance.unload()?;
        Ok(())
    }

    /// Captures the current parameter values as a preset.
    pub fn snapshot_preset(&self, name: &str) -> Result<Preset> {
        let descriptor = self
            .descriptor()
            .ok_or(LifecycleError::NotRunning {
                operation: "snapshot_preset",
                state: self.state(),
            })?;
        let count = descriptor.active_slots();
        let mut values = Vec::with_capacity(count);
        for index in 0..count {
            values.push(self.param_value(index)?);
        }
        let preset = Preset::new(name, descriptor, values)?;
        debug!(preset = %preset.name, params = count, "preset captured");
        Ok(preset)
    }

    /// Applies `preset`, warning (but proceeding) when it was saved from another unit.
    pub fn apply_preset(&mut self, preset: &Preset) -> Result<PresetApplication> {
        let descriptor = self
            .descriptor()
            .ok_or(LifecycleError::NotRunning {
                operation: "apply_preset",
                state: self.state(),
            })?;
        let mismatch = IdentityMismatch::check(preset, descriptor);
        if let Some(m) = &mismatch {
            warn!(preset = %preset.name, "{m}; applying anyway");
        }

        let count = (preset.num_params as usize)
            .min(preset.params.len())
            .min(descriptor.active_slots());
        for (index, value) in preset.params.iter().take(count).enumerate() {
            self.set_param(index, *value)?;
        }
        info!(preset = %preset.name, applied = count, "preset applied");
        Ok(PresetApplication {
            applied: count,
            mismatch,
        })
    }

    /// Summary of the loaded unit.
    pub fn describe(&self) -> Option<UnitInfo> {
        let module = self.instance.module()?;
        let d = module.descriptor();
        let params = d
            .params()
            .map(|(index, p)| ParamInfo {
                index,
                name: p.name.clone(),
                min: p.min,
                max: p.max,
                default: p.default,
                kind: p.kind,
                display: self
                    .param_display(index)
                    .unwrap_or_else(|_| p.format_value(p.default as i32)),
            })
            .collect();
        Some(UnitInfo {
            name: d.name.clone(),
            kind: d.kind(),
            dev_id: d.dev_id,
            unit_id: d.unit_id,
            version: d.version.to_string(),
            api: d.api,
            target: d.target,
            num_presets: d.num_presets,
            capabilities: module.capabilities(),
            params,
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("instance", &self.instance)
            .field("context", &self.context)
            .field("control", &self.control.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub index: usize,
    pub name: String,
    pub min: i16,
    pub max: i16,
    pub default: i16,
    pub kind: ParamType,
    pub display: String,
}

/// Identity, capabilities and parameter table of a loaded unit.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub name: String,
    pub kind: ModuleKind,
    pub dev_id: u32,
    pub unit_id: u32,
    pub version: String,
    pub api: u32,
    pub target: u16,
    pub num_presets: u32,
    pub capabilities: Vec<Capability>,
    pub params: Vec<ParamInfo>,
}

impl fmt::Display for UnitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name:      {}", self.name)?;
        writeln!(f, "Kind:      {}", self.kind)?;
        writeln!(f, "Developer: {:#010x}", self.dev_id)?;
        writeln!(f, "Unit ID:   {:#010x}", self.unit_id)?;
        writeln!(f, "Version:   {}", self.version)?;
        writeln!(f, "API:       {:#010x}", self.api)?;
        writeln!(f, "Target:    {:#06x}", self.target)?;
        writeln!(f, "Presets:   {}", self.num_presets)?;
        let caps: Vec<_> = self.capabilities.iter().map(|c| c.name()).collect();
        writeln!(f, "Optional:  {}", caps.join(", "))?;
        write!(f, "Parameters ({}):", self.params.len())?;
        for p in &self.params {
            write!(
                f,
                "\n  [{:2}] {:<13} {:>6}..{:<6} default {:<6} {}",
                p.index, p.name, p.min, p.max, p.default, p.display
            )?;
        }
        Ok(())
    }
}
