//! Parameter records.

use crate::layout::{self, param, read_i16, read_name, write_name, PARAM_NAME_LEN};

/// Value interpretation declared by a parameter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamType {
    #[default]
    None,
    Percent,
    Db,
    Cents,
    Semi,
    Oct,
    Hertz,
    KHertz,
    Bpm,
    Time,
    /// Enumerated values rendered by the unit's string callback.
    Strings,
    /// Values rendered by the unit's bitmap callback.
    Bitmaps,
    Fixed,
    Unknown(u8),
}

impl ParamType {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Percent,
            2 => Self::Db,
            3 => Self::Cents,
            4 => Self::Semi,
            5 => Self::Oct,
            6 => Self::Hertz,
            7 => Self::KHertz,
            8 => Self::Bpm,
            9 => Self::Time,
            10 => Self::Strings,
            11 => Self::Bitmaps,
            12 => Self::Fixed,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Percent => 1,
            Self::Db => 2,
            Self::Cents => 3,
            Self::Semi => 4,
            Self::Oct => 5,
            Self::Hertz => 6,
            Self::KHertz => 7,
            Self::Bpm => 8,
            Self::Time => 9,
            Self::Strings => 10,
            Self::Bitmaps => 11,
            Self::Fixed => 12,
            Self::Unknown(raw) => raw,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::Db => "dB",
            Self::Cents => "c",
            Self::Semi => "st",
            Self::Oct => "oct",
            Self::Hertz => "Hz",
            Self::KHertz => "kHz",
            Self::Bpm => "bpm",
            Self::Time => "ms",
            _ => "",
        }
    }
}

/// How the fractional-digit count is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FracMode {
    /// `value / 2^frac`
    #[default]
    FixedPoint,
    /// `value / 10^frac`
    Decimal,
}

/// One entry of the header's parameter table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParamDescriptor {
    pub min: i16,
    pub max: i16,
    pub center: i16,
    pub default: i16,
    pub kind: ParamType,
    pub frac: u8,
    pub frac_mode: FracMode,
    pub reserved: u8,
    pub name: String,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<String>, min: i16, max: i16, default: i16) -> Self {
        Self {
            min,
            max,
            default,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, kind: ParamType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_center(mut self, center: i16) -> Self {
        self.center = center;
        self
    }

    pub fn with_frac(mut self, frac: u8, mode: FracMode) -> Self {
        self.frac = frac & 0x0F;
        self.frac_mode = mode;
        self
    }

    /// Unused slots carry an empty name and are skipped by every iteration.
    pub fn is_blank(&self) -> bool {
        self.name.is_empty()
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min as i32..=self.max as i32).contains(&value)
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min as i32, self.max.max(self.min) as i32)
    }

    /// Renders `value` for display when the unit has no string callback for it.
    pub fn format_value(&self, value: i32) -> String {
        let (scaled, decimals) = match (self.frac, self.frac_mode) {
            (0, _) => (value as f64, 0),
            (frac, FracMode::Decimal) => (value as f64 / 10f64.powi(frac as i32), frac as usize),
            (frac, FracMode::FixedPoint) => (value as f64 / (1u32 << frac) as f64, 2),
        };
        let number = if self.min < 0 {
            format!("{scaled:+.decimals$}")
        } else {
            format!("{scaled:.decimals$}")
        };
        format!("{number}{}", self.kind.suffix())
    }

    pub(crate) fn decode(record: &[u8]) -> Self {
        let packed = record[param::FRAC];
        Self {
            min: read_i16(record, param::MIN),
            max: read_i16(record, param::MAX),
            center: read_i16(record, param::CENTER),
            default: read_i16(record, param::INIT),
            kind: ParamType::from_raw(record[param::TYPE]),
            frac: packed & 0x0F,
            frac_mode: if packed & 0x10 != 0 {
                FracMode::Decimal
            } else {
                FracMode::FixedPoint
            },
            reserved: packed >> 5,
            name: read_name(record, param::NAME, PARAM_NAME_LEN + 1),
        }
    }

    pub(crate) fn encode(&self, record: &mut [u8]) {
        record[..layout::PARAM_RECORD_SIZE].fill(0);
        record[param::MIN..param::MIN + 2].copy_from_slice(&self.min.to_le_bytes());
        record[param::MAX..param::MAX + 2].copy_from_slice(&self.max.to_le_bytes());
        record[param::CENTER..param::CENTER + 2].copy_from_slice(&self.center.to_le_bytes());
        record[param::INIT..param::INIT + 2].copy_from_slice(&self.default.to_le_bytes());
        record[param::TYPE] = self.kind.raw();
        let mode = match self.frac_mode {
            FracMode::FixedPoint => 0,
            FracMode::Decimal => 0x10,
        };
        record[param::FRAC] = (self.frac & 0x0F) | mode | ((self.reserved & 0x07) << 5);
        write_name(record, param::NAME, PARAM_NAME_LEN + 1, &self.name);
    }
}
