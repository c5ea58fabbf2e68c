//! Sample comparison thresholds shared by the integration tests.

/// Gain and passthrough units: f32 in, f32 out, one multiply at most.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// The test synth renders its sine in f64 and narrows to f32.
pub const DSP_EPSILON: f32 = 1e-4;

/// Peak below which a buffer counts as silent (-80 dBFS).
pub const SILENCE_THRESHOLD: f32 = 1e-4;
