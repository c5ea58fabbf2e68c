//! Bound unit handle and the loader that produces it.

use std::ffi::CStr;
use std::path::{Path, PathBuf};

use libloading::Library;
use logue_abi::{
    symbols, AftertouchFn, AllNoteOffFn, ChannelPressureFn, DescriptorError, GateOffFn, GateOnFn,
    GetParamBmpValueFn, GetParamStrValueFn, GetParamValueFn, GetPresetIndexFn, GetPresetNameFn,
    InitFn, LoadPresetFn, ModuleKind, NoteOffFn, NoteOnFn, PerfCounterCountFn,
    PerfCounterNameFn, PerfCounterValueFn, PitchBendFn, RenderFn, ResetFn, ResumeFn,
    SetParamValueFn, SetTempoFn, SuspendFn, TeardownFn, UnitDescriptor, UNIT_HEADER_SIZE,
};
use tracing::{debug, info};

use crate::error::LoadError;
use crate::perf::{PerfCounter, PerfCounters};

/// Optional entry points, resolved once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Teardown,
    Reset,
    Resume,
    Suspend,
    SetParam,
    GetParam,
    ParamString,
    ParamBitmap,
    Tempo,
    NoteOn,
    NoteOff,
    GateOn,
    GateOff,
    AllNotesOff,
    PitchBend,
    ChannelPressure,
    Aftertouch,
    LoadPreset,
    PresetIndex,
    PresetName,
}

impl Capability {
    pub const ALL: [Capability; 20] = [
        Self::Teardown,
        Self::Reset,
        Self::Resume,
        Self::Suspend,
        Self::SetParam,
        Self::GetParam,
        Self::ParamString,
        Self::ParamBitmap,
        Self::Tempo,
        Self::NoteOn,
        Self::NoteOff,
        Self::GateOn,
        Self::GateOff,
        Self::AllNotesOff,
        Self::PitchBend,
        Self::ChannelPressure,
        Self::Aftertouch,
        Self::LoadPreset,
        Self::PresetIndex,
        Self::PresetName,
    ];

    pub fn symbol(self) -> &'static [u8] {
        match self {
            Self::Teardown => symbols::TEARDOWN,
            Self::Reset => symbols::RESET,
            Self::Resume => symbols::RESUME,
            Self::Suspend => symbols::SUSPEND,
            Self::SetParam => symbols::SET_PARAM_VALUE,
            Self::GetParam => symbols::GET_PARAM_VALUE,
            Self::ParamString => symbols::GET_PARAM_STR_VALUE,
            Self::ParamBitmap => symbols::GET_PARAM_BMP_VALUE,
            Self::Tempo => symbols::SET_TEMPO,
            Self::NoteOn => symbols::NOTE_ON,
            Self::NoteOff => symbols::NOTE_OFF,
            Self::GateOn => symbols::GATE_ON,
            Self::GateOff => symbols::GATE_OFF,
            Self::AllNotesOff => symbols::ALL_NOTE_OFF,
            Self::PitchBend => symbols::PITCH_BEND,
            Self::ChannelPressure => symbols::CHANNEL_PRESSURE,
            Self::Aftertouch => symbols::AFTERTOUCH,
            Self::LoadPreset => symbols::LOAD_PRESET,
            Self::PresetIndex => symbols::GET_PRESET_INDEX,
            Self::PresetName => symbols::GET_PRESET_NAME,
        }
    }

    pub fn name(self) -> &'static str {
        symbols::display(self.symbol())
    }
}

/// Resolved entry points of a unit.
///
/// `init` and `render` are mandatory; everything else is a capability.
#[derive(Clone, Copy)]
pub struct UnitCallbacks {
    pub init: InitFn,
    pub render: RenderFn,
    pub teardown: Option<TeardownFn>,
    pub reset: Option<ResetFn>,
    pub resume: Option<ResumeFn>,
    pub suspend: Option<SuspendFn>,
    pub set_param_value: Option<SetParamValueFn>,
    pub get_param_value: Option<GetParamValueFn>,
    pub get_param_str_value: Option<GetParamStrValueFn>,
    pub get_param_bmp_value: Option<GetParamBmpValueFn>,
    pub set_tempo: Option<SetTempoFn>,
    pub note_on: Option<NoteOnFn>,
    pub note_off: Option<NoteOffFn>,
    pub gate_on: Option<GateOnFn>,
    pub gate_off: Option<GateOffFn>,
    pub all_note_off: Option<AllNoteOffFn>,
    pub pitch_bend: Option<PitchBendFn>,
    pub channel_pressure: Option<ChannelPressureFn>,
    pub aftertouch: Option<AftertouchFn>,
    pub load_preset: Option<LoadPresetFn>,
    pub get_preset_index: Option<GetPresetIndexFn>,
    pub get_preset_name: Option<GetPresetNameFn>,
}

impl UnitCallbacks {
    /// Only the mandatory entry points; every capability absent.
    pub fn new(init: InitFn, render: RenderFn) -> Self {
        Self {
            init,
            render,
            teardown: None,
            reset: None,
            resume: None,
            suspend: None,
            set_param_value: None,
            get_param_value: None,
            get_param_str_value: None,
            get_param_bmp_value: None,
            set_tempo: None,
            note_on: None,
            note_off: None,
            gate_on: None,
            gate_off: None,
            all_note_off: None,
            pitch_bend: None,
            channel_pressure: None,
            aftertouch: None,
            load_preset: None,
            get_preset_index: None,
            get_preset_name: None,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Teardown => self.teardown.is_some(),
            Capability::Reset => self.reset.is_some(),
            Capability::Resume => self.resume.is_some(),
            Capability::Suspend => self.suspend.is_some(),
            Capability::SetParam => self.set_param_value.is_some(),
            Capability::GetParam => self.get_param_value.is_some(),
            Capability::ParamString => self.get_param_str_value.is_some(),
            Capability::ParamBitmap => self.get_param_bmp_value.is_some(),
            Capability::Tempo => self.set_tempo.is_some(),
            Capability::NoteOn => self.note_on.is_some(),
            Capability::NoteOff => self.note_off.is_some(),
            Capability::GateOn => self.gate_on.is_some(),
            Capability::GateOff => self.gate_off.is_some(),
            Capability::AllNotesOff => self.all_note_off.is_some(),
            Capability::PitchBend => self.pitch_bend.is_some(),
            Capability::ChannelPressure => self.channel_pressure.is_some(),
            Capability::Aftertouch => self.aftertouch.is_some(),
            Capability::LoadPreset => self.load_preset.is_some(),
            Capability::PresetIndex => self.get_preset_index.is_some(),
            Capability::PresetName => self.get_preset_name.is_some(),
        }
    }

    /// Resolves every entry point from an opened library.
    ///
    /// # Safety
    /// The library must be a unit built against the drumlogue ABI, so that each
    /// exported symbol has the signature its name implies.
    unsafe fn resolve(library: &Library, path: &Path) -> Result<Self, LoadError> {
        Ok(Self {
            init: required(library, path, symbols::INIT)?,
            render: required(library, path, symbols::RENDER)?,
            teardown: optional(library, symbols::TEARDOWN),
            reset: optional(library, symbols::RESET),
            resume: optional(library, symbols::RESUME),
            suspend: optional(library, symbols::SUSPEND),
            set_param_value: optional(library, symbols::SET_PARAM_VALUE),
            get_param_value: optional(library, symbols::GET_PARAM_VALUE),
            get_param_str_value: optional(library, symbols::GET_PARAM_STR_VALUE),
            get_param_bmp_value: optional(library, symbols::GET_PARAM_BMP_VALUE),
            set_tempo: optional(library, symbols::SET_TEMPO),
            note_on: optional(library, symbols::NOTE_ON),
            note_off: optional(library, symbols::NOTE_OFF),
            gate_on: optional(library, symbols::GATE_ON),
            gate_off: optional(library, symbols::GATE_OFF),
            all_note_off: optional(library, symbols::ALL_NOTE_OFF),
            pitch_bend: optional(library, symbols::PITCH_BEND),
            channel_pressure: optional(library, symbols::CHANNEL_PRESSURE),
            aftertouch: optional(library, symbols::AFTERTOUCH),
            load_preset: optional(library, symbols::LOAD_PRESET),
            get_preset_index: optional(library, symbols::GET_PRESET_INDEX),
            get_preset_name: optional(library, symbols::GET_PRESET_NAME),
        })
    }
}

impl std::fmt::Debug for UnitCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let present: Vec<&str> = Capability::ALL
            .iter()
            .filter(|c| self.has(**c))
            .map(|c| c.name())
            .collect();
        f.debug_struct("UnitCallbacks")
            .field("capabilities", &present)
            .finish_non_exhaustive()
    }
}

/// `dsp::PerfMon` accessors of a unit built with `PERF_MON=1`.
#[derive(Debug, Clone, Copy)]
pub struct PerfMonCallbacks {
    pub counter_count: PerfCounterCountFn,
    pub counter_name: PerfCounterNameFn,
    pub average_cycles: PerfCounterValueFn,
    pub peak_cycles: PerfCounterValueFn,
    pub min_cycles: PerfCounterValueFn,
    pub frame_count: PerfCounterValueFn,
}

impl PerfMonCallbacks {
    /// All six accessors, or `None` when any is missing.
    unsafe fn resolve(library: &Library) -> Option<Self> {
        use symbols::perf_mon;
        unsafe fn get<T: Copy>(library: &Library, symbol: &[u8]) -> Option<T> {
            library.get::<T>(symbol).ok().map(|sym| *sym)
        }
        Some(Self {
            counter_count: get(library, perf_mon::COUNTER_COUNT)?,
            counter_name: get(library, perf_mon::COUNTER_NAME)?,
            average_cycles: get(library, perf_mon::AVERAGE_CYCLES)?,
            peak_cycles: get(library, perf_mon::PEAK_CYCLES)?,
            min_cycles: get(library, perf_mon::MIN_CYCLES)?,
            frame_count: get(library, perf_mon::FRAME_COUNT)?,
        })
    }

    /// Reads every counter that has seen at least one frame.
    ///
    /// # Safety
    /// The accessors must belong to a unit that is still mapped.
    pub unsafe fn read(&self) -> PerfCounters {
        let count = (self.counter_count)();
        let counters = (0..count)
            .filter_map(|index| {
                let frames = (self.frame_count)(index);
                if frames == 0 {
                    return None;
                }
                let name = (self.counter_name)(index);
                Some(PerfCounter {
                    index,
                    name: (!name.is_null())
                        .then(|| CStr::from_ptr(name).to_string_lossy().into_owned()),
                    average_cycles: (self.average_cycles)(index),
                    min_cycles: (self.min_cycles)(index),
                    peak_cycles: (self.peak_cycles)(index),
                    frames,
                })
            })
            .collect();
        PerfCounters { counters }
    }
}

unsafe fn required<T: Copy>(
    library: &Library,
    path: &Path,
    symbol: &'static [u8],
) -> Result<T, LoadError> {
    library
        .get::<T>(symbol)
        .map(|sym| *sym)
        .map_err(|_| LoadError::MissingRequiredSymbol {
            path: path.to_path_buf(),
            symbol: symbols::display(symbol),
        })
}

unsafe fn optional<T: Copy>(library: &Library, symbol: &[u8]) -> Option<T> {
    let resolved = library.get::<T>(symbol).ok().map(|sym| *sym);
    if resolved.is_none() {
        debug!(symbol = symbols::display(symbol), "capability absent");
    }
    resolved
}

/// Reads and validates the header exported as `unit_header`.
unsafe fn read_header(library: &Library, path: &Path) -> Result<UnitDescriptor, LoadError> {
    let missing = || LoadError::MissingRequiredSymbol {
        path: path.to_path_buf(),
        symbol: symbols::display(symbols::HEADER),
    };
    let invalid = |source| LoadError::InvalidDescriptor {
        path: path.to_path_buf(),
        source,
    };

    let header: *const u8 = *library.get::<*const u8>(symbols::HEADER).map_err(|_| missing())?;
    if header.is_null() {
        return Err(missing());
    }

    // Never read past what the unit claims to have.
    let declared = u32::from_le_bytes(std::ptr::read_unaligned(header as *const [u8; 4]));
    if (declared as usize) < UNIT_HEADER_SIZE {
        return Err(invalid(DescriptorError::HeaderSizeTooSmall {
            declared,
            required: UNIT_HEADER_SIZE,
        }));
    }

    let bytes = std::slice::from_raw_parts(header, UNIT_HEADER_SIZE);
    let descriptor = UnitDescriptor::decode(bytes).map_err(invalid)?;
    descriptor.validate().map_err(invalid)?;
    Ok(descriptor)
}

/// A unit whose header has been decoded and whose entry points are bound.
///
/// Dropping the module (or calling [`Module::close`]) releases the OS handle.
/// Nothing here guards against calling into a unit in the wrong state; that is
/// the job of [`UnitInstance`](crate::UnitInstance).
pub struct Module {
    descriptor: UnitDescriptor,
    callbacks: UnitCallbacks,
    perf_mon: Option<PerfMonCallbacks>,
    path: Option<PathBuf>,
    // Keeps the code behind `callbacks` mapped.
    _library: Option<Library>,
}

impl Module {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();

        let library = unsafe {
            Library::new(path).map_err(|e| LoadError::CannotOpen {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        // On any failure below `library` is dropped here, closing the handle.
        let descriptor = unsafe { read_header(&library, path)? };
        let callbacks = unsafe { UnitCallbacks::resolve(&library, path)? };
        let perf_mon = unsafe { PerfMonCallbacks::resolve(&library) };
        if perf_mon.is_some() {
            debug!("unit exports PERF_MON counters");
        }

        info!(
            unit = %descriptor.name,
            kind = %descriptor.kind(),
            version = %descriptor.version,
            params = descriptor.params().count(),
            presets = descriptor.num_presets,
            "loaded unit from {}",
            path.display()
        );
        debug!(?callbacks, "bound entry points");

        Ok(Self {
            descriptor,
            callbacks,
            perf_mon,
            path: Some(path.to_path_buf()),
            _library: Some(library),
        })
    }

    /// Binds a unit that lives in this process (statically linked, or a test unit).
    /// The descriptor goes through the same validation as a loaded header.
    pub fn from_parts(
        descriptor: UnitDescriptor,
        callbacks: UnitCallbacks,
    ) -> Result<Self, DescriptorError> {
        descriptor.validate()?;
        Ok(Self {
            descriptor,
            callbacks,
            perf_mon: None,
            path: None,
            _library: None,
        })
    }

    pub fn descriptor(&self) -> &UnitDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> ModuleKind {
        self.descriptor.kind()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn callbacks(&self) -> &UnitCallbacks {
        &self.callbacks
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.callbacks.has(capability)
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }

    /// Unit-internal presets can be listed and recalled.
    pub fn supports_presets(&self) -> bool {
        self.descriptor.num_presets > 0 && self.supports(Capability::LoadPreset)
    }

    pub fn supports_notes(&self) -> bool {
        self.supports(Capability::NoteOn)
    }

    /// Attaches cycle counters to an in-process unit.
    pub fn with_perf_mon(mut self, perf_mon: PerfMonCallbacks) -> Self {
        self.perf_mon = Some(perf_mon);
        self
    }

    pub fn supports_perf_mon(&self) -> bool {
        self.perf_mon.is_some()
    }

    /// The unit's own cycle counters; `None` unless it was built with `PERF_MON=1`.
    pub fn perf_counters(&self) -> Option<PerfCounters> {
        // The accessors stay valid while `self` holds the library.
        self.perf_mon.map(|pm| unsafe { pm.read() })
    }

    /// Releases the OS handle.
    pub fn close(self) {
        debug!(unit = %self.descriptor.name, "closing unit");
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.descriptor.name)
            .field("kind", &self.descriptor.kind())
            .field("path", &self.path)
            .field("callbacks", &self.callbacks)
            .field("perf_mon", &self.perf_mon.is_some())
            .finish()
    }
}
