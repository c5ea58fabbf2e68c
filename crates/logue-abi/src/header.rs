//! The unit header: identity, module kind and parameter table.

use std::fmt;

use crate::error::{DescriptorError, Result};
use crate::layout::{
    self, read_name, read_u16, read_u32, write_name, MAX_PARAMS, PARAM_RECORD_SIZE,
    UNIT_HEADER_SIZE, UNIT_NAME_LEN,
};
use crate::param::ParamDescriptor;
use crate::runtime::{UNIT_API_VERSION, UNIT_TARGET_PLATFORM};

/// Module kind, carried in the low byte of the header's target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    DelayFx,
    ReverbFx,
    Oscillator,
    Synth,
    MasterFx,
    /// Any other kind (global, modfx, unknown values).
    Generic(u8),
}

impl ModuleKind {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            2 => Self::DelayFx,
            3 => Self::ReverbFx,
            4 => Self::Oscillator,
            5 => Self::Synth,
            6 => Self::MasterFx,
            other => Self::Generic(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::DelayFx => 2,
            Self::ReverbFx => 3,
            Self::Oscillator => 4,
            Self::Synth => 5,
            Self::MasterFx => 6,
            Self::Generic(raw) => raw,
        }
    }

    /// Generators produce sound from events alone and get silence as input.
    pub fn is_generator(self) -> bool {
        matches!(self, Self::Synth)
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DelayFx => write!(f, "delay effect"),
            Self::ReverbFx => write!(f, "reverb effect"),
            Self::Oscillator => write!(f, "oscillator"),
            Self::Synth => write!(f, "synth"),
            Self::MasterFx => write!(f, "master effect"),
            Self::Generic(raw) => write!(f, "generic ({raw})"),
        }
    }
}

/// Semantic version packed as `major << 16 | minor << 8 | patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UnitVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl UnitVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn from_packed(packed: u32) -> Self {
        Self {
            major: (packed >> 16) as u8,
            minor: (packed >> 8) as u8,
            patch: packed as u8,
        }
    }

    pub fn packed(self) -> u32 {
        (self.major as u32) << 16 | (self.minor as u32) << 8 | self.patch as u32
    }
}

impl fmt::Display for UnitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Decoded unit header.
///
/// Produced once per load and never mutated by the host. `params` always holds
/// every slot of the table; use [`UnitDescriptor::params`] to walk the ones in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDescriptor {
    pub header_size: u32,
    pub target: u16,
    pub api: u32,
    pub dev_id: u32,
    pub unit_id: u32,
    pub version: UnitVersion,
    pub name: String,
    pub num_presets: u32,
    pub num_params: u32,
    pub params: [ParamDescriptor; MAX_PARAMS],
}

impl UnitDescriptor {
    /// Starts a descriptor for an in-process unit. Header size, platform and API
    /// version are filled with the values a drumlogue build would carry.
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            header_size: UNIT_HEADER_SIZE as u32,
            target: UNIT_TARGET_PLATFORM | kind.raw() as u16,
            api: UNIT_API_VERSION,
            dev_id: 0,
            unit_id: 0,
            version: UnitVersion::new(1, 0, 0),
            name: name.into(),
            num_presets: 0,
            num_params: 0,
            params: Default::default(),
        }
    }

    pub fn with_ids(mut self, dev_id: u32, unit_id: u32) -> Self {
        self.dev_id = dev_id;
        self.unit_id = unit_id;
        self
    }

    pub fn with_version(mut self, version: UnitVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_presets(mut self, count: u32) -> Self {
        self.num_presets = count;
        self
    }

    /// Places `param` in slot `index` and grows `num_params` to cover it.
    /// Indices past the table are ignored.
    pub fn with_param(mut self, index: usize, param: ParamDescriptor) -> Self {
        if let Some(slot) = self.params.get_mut(index) {
            *slot = param;
            self.num_params = self.num_params.max(index as u32 + 1);
        }
        self
    }

    pub fn kind(&self) -> ModuleKind {
        ModuleKind::from_raw(self.target as u8)
    }

    pub fn platform(&self) -> u16 {
        self.target & 0xFF00
    }

    /// Number of table slots the unit claims, capped at the table size.
    pub fn active_slots(&self) -> usize {
        (self.num_params as usize).min(MAX_PARAMS)
    }

    /// Named parameters with their slot index. Blank slots are skipped.
    pub fn params(&self) -> impl Iterator<Item = (usize, &ParamDescriptor)> {
        self.params[..self.active_slots()]
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_blank())
    }

    pub fn param(&self, index: usize) -> Option<&ParamDescriptor> {
        self.params[..self.active_slots()]
            .get(index)
            .filter(|p| !p.is_blank())
    }

    /// Initial value of every slot; blank and inactive slots read as zero.
    pub fn defaults(&self) -> [i32; MAX_PARAMS] {
        let mut values = [0; MAX_PARAMS];
        for (index, param) in self.params() {
            values[index] = param.default as i32;
        }
        values
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let required = UNIT_HEADER_SIZE;
        if bytes.len() < layout::NAME {
            return Err(DescriptorError::Truncated {
                expected: required,
                actual: bytes.len(),
            });
        }
        let header_size = read_u32(bytes, layout::HEADER_SIZE);
        if (header_size as usize) < required {
            return Err(DescriptorError::HeaderSizeTooSmall {
                declared: header_size,
                required,
            });
        }
        if bytes.len() < required {
            return Err(DescriptorError::Truncated {
                expected: required,
                actual: bytes.len(),
            });
        }

        let params = std::array::from_fn(|i| {
            let start = layout::PARAMS + i * PARAM_RECORD_SIZE;
            ParamDescriptor::decode(&bytes[start..start + PARAM_RECORD_SIZE])
        });

        Ok(Self {
            header_size,
            target: read_u16(bytes, layout::TARGET),
            api: read_u32(bytes, layout::API),
            dev_id: read_u32(bytes, layout::DEV_ID),
            unit_id: read_u32(bytes, layout::UNIT_ID),
            version: UnitVersion::from_packed(read_u32(bytes, layout::VERSION)),
            name: read_name(bytes, layout::NAME, UNIT_NAME_LEN + 1),
            num_presets: read_u32(bytes, layout::NUM_PRESETS),
            num_params: read_u32(bytes, layout::NUM_PARAMS),
            params,
        })
    }

    pub fn encode(&self) -> [u8; UNIT_HEADER_SIZE] {
        let mut bytes = [0u8; UNIT_HEADER_SIZE];
        put_u32(&mut bytes, layout::HEADER_SIZE, self.header_size);
        bytes[layout::TARGET..layout::TARGET + 2].copy_from_slice(&self.target.to_le_bytes());
        put_u32(&mut bytes, layout::API, self.api);
        put_u32(&mut bytes, layout::DEV_ID, self.dev_id);
        put_u32(&mut bytes, layout::UNIT_ID, self.unit_id);
        put_u32(&mut bytes, layout::VERSION, self.version.packed());
        write_name(&mut bytes, layout::NAME, UNIT_NAME_LEN + 1, &self.name);
        put_u32(&mut bytes, layout::NUM_PRESETS, self.num_presets);
        put_u32(&mut bytes, layout::NUM_PARAMS, self.num_params);
        for (i, param) in self.params.iter().enumerate() {
            let start = layout::PARAMS + i * PARAM_RECORD_SIZE;
            param.encode(&mut bytes[start..start + PARAM_RECORD_SIZE]);
        }
        bytes
    }

    /// Checks the invariants the host relies on: a header at least as large as
    /// the layout, at most 24 parameters, and `min <= default <= max` for every
    /// named parameter.
    pub fn validate(&self) -> Result<()> {
        if (self.header_size as usize) < UNIT_HEADER_SIZE {
            return Err(DescriptorError::HeaderSizeTooSmall {
                declared: self.header_size,
                required: UNIT_HEADER_SIZE,
            });
        }
        if self.num_params as usize > MAX_PARAMS {
            return Err(DescriptorError::TooManyParams(self.num_params));
        }
        for (index, p) in self.params() {
            if p.min > p.max {
                return Err(DescriptorError::InvertedRange {
                    index,
                    min: p.min,
                    max: p.max,
                });
            }
            if p.default < p.min || p.default > p.max {
                return Err(DescriptorError::DefaultOutOfRange {
                    index,
                    min: p.min,
                    max: p.max,
                    default: p.default,
                });
            }
        }
        Ok(())
    }
}

fn put_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
