//! # logue-abi
//!
//! Binary contract between a drumlogue unit and its host.
//!
//! The unit header is a packed record compiled into every unit. It is decoded
//! here with explicit byte offsets ([`layout`]) rather than by casting memory
//! to a Rust struct, so the host never depends on compiler layout for it.
//! The runtime descriptor handed to `unit_init` is the one exception: units
//! read it directly, so [`RuntimeDesc`] mirrors it as `#[repr(C, packed)]`.
//!
//! ```
//! use logue_abi::{ModuleKind, ParamDescriptor, UnitDescriptor};
//!
//! let desc = UnitDescriptor::new("Verb", ModuleKind::ReverbFx)
//!     .with_param(0, ParamDescriptor::new("MIX", 0, 100, 50));
//! let bytes = desc.encode();
//! assert_eq!(UnitDescriptor::decode(&bytes).unwrap().name, "Verb");
//! ```

mod error;
mod header;
pub mod layout;
mod param;
mod runtime;

pub use error::{DescriptorError, Result};
pub use header::{ModuleKind, UnitDescriptor, UnitVersion};
pub use layout::{MAX_PARAMS, PARAM_NAME_LEN, UNIT_HEADER_SIZE, UNIT_NAME_LEN};
pub use param::{FracMode, ParamDescriptor, ParamType};
pub use runtime::*;
