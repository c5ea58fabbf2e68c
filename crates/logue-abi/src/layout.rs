//! Byte-offset tables for the packed unit header.
//!
//! The header is compiled with `pack(1)` on the unit side, so every field is
//! read and written at an explicit offset instead of through a Rust struct.

/// Total size of the header record, in bytes.
pub const UNIT_HEADER_SIZE: usize = PARAMS + MAX_PARAMS * PARAM_RECORD_SIZE;

/// Parameter slots in the header table.
pub const MAX_PARAMS: usize = 24;

/// Visible characters in the unit name (plus NUL).
pub const UNIT_NAME_LEN: usize = 13;

/// Visible characters in a parameter name (plus NUL).
pub const PARAM_NAME_LEN: usize = 13;

/// Size of one parameter record.
pub const PARAM_RECORD_SIZE: usize = 24;

pub const HEADER_SIZE: usize = 0;
pub const TARGET: usize = 4;
pub const API: usize = 6;
pub const DEV_ID: usize = 10;
pub const UNIT_ID: usize = 14;
pub const VERSION: usize = 18;
pub const NAME: usize = 22;
pub const NUM_PRESETS: usize = NAME + UNIT_NAME_LEN + 1;
pub const NUM_PARAMS: usize = NUM_PRESETS + 4;
pub const PARAMS: usize = NUM_PARAMS + 4;

/// Offsets inside a single parameter record.
pub mod param {
    pub const MIN: usize = 0;
    pub const MAX: usize = 2;
    pub const CENTER: usize = 4;
    pub const INIT: usize = 6;
    pub const TYPE: usize = 8;
    /// frac (bits 0..3), frac_mode (bit 4), reserved (bits 5..7)
    pub const FRAC: usize = 9;
    pub const NAME: usize = 10;
}

pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

pub(crate) fn read_i16(bytes: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Reads a NUL-terminated string from a fixed-size field.
pub(crate) fn read_name(bytes: &[u8], offset: usize, field_len: usize) -> String {
    let field = &bytes[offset..offset + field_len];
    let end = field.iter().position(|&b| b == 0).unwrap_or(field_len);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Writes `name` truncated to `field_len - 1` bytes; the rest of the field is zeroed.
pub(crate) fn write_name(bytes: &mut [u8], offset: usize, field_len: usize, name: &str) {
    let field = &mut bytes[offset..offset + field_len];
    field.fill(0);
    let len = name.len().min(field_len - 1);
    field[..len].copy_from_slice(&name.as_bytes()[..len]);
}
