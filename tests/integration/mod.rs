//! Integration test modules for logue-host
//!
//! - host: builder, rendering, parameters, control queue
//! - profiling: profiling workload and performance report
//! - presets: host preset store and identity checks

pub mod host;
pub mod presets;
pub mod profiling;
