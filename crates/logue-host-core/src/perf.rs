//! Render timing, real-time budget classification and a lock-free load meter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use atomic_float::AtomicF32;

/// CPU-usage class against the real-time budget.
///
/// Thresholds are half-open: `< 50` Excellent, `< 80` Good, `< 100` Heavy,
/// everything else Overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Headroom {
    Excellent,
    Good,
    Heavy,
    Overload,
}

impl Headroom {
    pub fn classify(cpu_percent: f64) -> Self {
        if cpu_percent < 50.0 {
            Self::Excellent
        } else if cpu_percent < 80.0 {
            Self::Good
        } else if cpu_percent < 100.0 {
            Self::Heavy
        } else {
            Self::Overload
        }
    }
}

impl fmt::Display for Headroom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Heavy => write!(f, "heavy"),
            Self::Overload => write!(f, "overload"),
        }
    }
}

/// How much slack remains before the unit stops keeping up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadroomAssessment {
    /// More than 50% of the budget unused.
    Plenty,
    /// More than 20% unused.
    Moderate,
    Tight,
}

impl HeadroomAssessment {
    pub fn from_percent(headroom_percent: f64) -> Self {
        if headroom_percent > 50.0 {
            Self::Plenty
        } else if headroom_percent > 20.0 {
            Self::Moderate
        } else {
            Self::Tight
        }
    }
}

impl fmt::Display for HeadroomAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plenty => write!(f, "plenty of headroom"),
            Self::Moderate => write!(f, "moderate headroom"),
            Self::Tight => write!(f, "tight headroom"),
        }
    }
}

/// Accumulates render-call timings for one run.
#[derive(Debug, Clone)]
pub struct RenderProfiler {
    sample_rate: u32,
    block_size: usize,
    total: Duration,
    min: Duration,
    max: Duration,
    last: Duration,
    calls: u64,
    frames: u64,
    meter: Option<Arc<LoadMeter>>,
}

impl RenderProfiler {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            total: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
            last: Duration::ZERO,
            calls: 0,
            frames: 0,
            meter: None,
        }
    }

    /// Mirrors every recorded timing into `meter` as well.
    pub fn with_meter(mut self, meter: Arc<LoadMeter>) -> Self {
        self.meter = Some(meter);
        self
    }

    /// Times `render`, attributing `frames` of audio to it.
    #[inline]
    pub fn time<R>(&mut self, frames: usize, render: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = render();
        self.record(frames, start.elapsed());
        out
    }

    pub fn record(&mut self, frames: usize, elapsed: Duration) {
        self.total += elapsed;
        self.min = self.min.min(elapsed);
        self.max = self.max.max(elapsed);
        self.last = elapsed;
        self.calls += 1;
        self.frames += frames as u64;
        if let Some(meter) = &self.meter {
            meter.record(frames, elapsed);
        }
    }

    /// Duration of the most recent call.
    pub fn last(&self) -> Duration {
        self.last
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn reset(&mut self) {
        let meter = self.meter.take();
        *self = Self::new(self.sample_rate, self.block_size);
        self.meter = meter;
    }

    /// `None` until at least one call was recorded.
    pub fn report(&self) -> Option<ProfileReport> {
        if self.calls == 0 {
            return None;
        }
        let render_secs = self.total.as_secs_f64();
        let audio_secs = self.frames as f64 / self.sample_rate as f64;
        let average = Duration::from_nanos(
            u64::try_from(self.total.as_nanos() / u128::from(self.calls)).unwrap_or(u64::MAX),
        );
        let block_secs = self.block_size as f64 / self.sample_rate as f64;

        let cpu_percent = if audio_secs > 0.0 {
            render_secs / audio_secs * 100.0
        } else {
            0.0
        };
        let real_time_factor = if render_secs > 0.0 {
            audio_secs / render_secs
        } else {
            f64::INFINITY
        };
        let headroom_percent = (1.0 - 1.0 / real_time_factor) * 100.0;

        Some(ProfileReport {
            calls: self.calls,
            frames: self.frames,
            block_size: self.block_size,
            sample_rate: self.sample_rate,
            total_render: self.total,
            min_render: self.min,
            max_render: self.max,
            avg_render: average,
            audio_secs,
            cpu_percent,
            real_time_factor,
            headroom: Headroom::classify(cpu_percent),
            underrun: real_time_factor < 1.0,
            buffer_overhead_percent: average.as_secs_f64() / block_secs * 100.0,
            headroom_percent,
            assessment: HeadroomAssessment::from_percent(headroom_percent),
        })
    }
}

/// Derived figures for a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    pub calls: u64,
    pub frames: u64,
    pub block_size: usize,
    pub sample_rate: u32,
    pub total_render: Duration,
    pub min_render: Duration,
    pub max_render: Duration,
    pub avg_render: Duration,
    /// Audio time equivalent of the rendered frames.
    pub audio_secs: f64,
    /// Render time over audio time, in percent.
    pub cpu_percent: f64,
    /// Audio time over render time; below 1.0 the unit cannot keep up.
    pub real_time_factor: f64,
    pub headroom: Headroom,
    pub underrun: bool,
    /// Average render time over one block's duration, in percent.
    pub buffer_overhead_percent: f64,
    pub headroom_percent: f64,
    pub assessment: HeadroomAssessment,
}

impl ProfileReport {
    /// Speed-up needed to reach real time, when underrunning.
    pub fn required_speedup(&self) -> Option<f64> {
        self.underrun.then(|| 1.0 / self.real_time_factor)
    }
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let us = |d: Duration| d.as_secs_f64() * 1e6;
        writeln!(f, "Render calls:      {}", self.calls)?;
        writeln!(
            f,
            "Audio processed:   {:.3} s ({} frames @ {} Hz)",
            self.audio_secs, self.frames, self.sample_rate
        )?;
        writeln!(f, "Total render time: {:.3} ms", self.total_render.as_secs_f64() * 1e3)?;
        writeln!(
            f,
            "Per block:         avg {:.2} us, min {:.2} us, max {:.2} us",
            us(self.avg_render),
            us(self.min_render),
            us(self.max_render)
        )?;
        writeln!(f, "CPU usage:         {:.2}% ({})", self.cpu_percent, self.headroom)?;
        writeln!(f, "Real-time factor:  {:.2}x", self.real_time_factor)?;
        writeln!(
            f,
            "Buffer overhead:   {:.2}% of {} frames",
            self.buffer_overhead_percent, self.block_size
        )?;
        match self.required_speedup() {
            Some(speedup) => write!(
                f,
                "UNDERRUN: unit cannot sustain real time (needs {speedup:.2}x speed-up)"
            ),
            None => write!(
                f,
                "Headroom:          {:.1}% ({})",
                self.headroom_percent, self.assessment
            ),
        }
    }
}

/// Cycles available per sample on the hardware: a 900 MHz Cortex-A7 at 48 kHz.
pub const CYCLES_PER_SAMPLE: f64 = 900e6 / 48_000.0;

/// One `dsp::PerfMon` counter as the unit reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfCounter {
    pub index: u8,
    pub name: Option<String>,
    pub average_cycles: u32,
    pub min_cycles: u32,
    pub peak_cycles: u32,
    pub frames: u32,
}

impl PerfCounter {
    /// Average cycles as a share of [`CYCLES_PER_SAMPLE`], in percent.
    pub fn budget_percent(&self) -> f64 {
        self.average_cycles as f64 / CYCLES_PER_SAMPLE * 100.0
    }
}

/// Cycle counters measured inside the unit. Counters that never ran are
/// left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfCounters {
    pub counters: Vec<PerfCounter>,
}

impl PerfCounters {
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn total_average_cycles(&self) -> u64 {
        self.counters.iter().map(|c| u64::from(c.average_cycles)).sum()
    }

    pub fn total_budget_percent(&self) -> f64 {
        self.total_average_cycles() as f64 / CYCLES_PER_SAMPLE * 100.0
    }

    pub fn headroom(&self) -> Headroom {
        Headroom::classify(self.total_budget_percent())
    }
}

impl fmt::Display for PerfCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "PERF_MON: no performance counters registered");
        }
        writeln!(
            f,
            "PERF_MON cycle counts ({CYCLES_PER_SAMPLE:.0} cycles per sample budget)"
        )?;
        writeln!(
            f,
            "{:<16} {:>12} {:>12} {:>12} {:>10} {:>9}",
            "COUNTER", "AVG CYCLES", "MIN CYCLES", "MAX CYCLES", "FRAMES", "BUDGET"
        )?;
        for c in &self.counters {
            writeln!(
                f,
                "{:<16} {:>12} {:>12} {:>12} {:>10} {:>8.2}%",
                c.name.as_deref().unwrap_or("<unnamed>"),
                c.average_cycles,
                c.min_cycles,
                c.peak_cycles,
                c.frames,
                c.budget_percent()
            )?;
        }
        write!(
            f,
            "{:<16} {:>12} {:>12} {:>12} {:>10} {:>8.2}% ({})",
            "TOTAL",
            self.total_average_cycles(),
            "-",
            "-",
            "-",
            self.total_budget_percent(),
            self.headroom()
        )
    }
}

/// Snapshot of a [`LoadMeter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadMetrics {
    pub calls: u64,
    pub frames: u64,
    /// Render time over audio time so far, in percent.
    pub cpu_percent: f64,
    /// Load of the latest block, in percent of its duration.
    pub current: f32,
    pub peak: f32,
    /// Blocks that took longer to render than they last.
    pub overruns: u64,
    /// Duration of one full block.
    pub budget_us: f64,
}

impl LoadMetrics {
    pub fn headroom(&self) -> Headroom {
        Headroom::classify(self.cpu_percent)
    }
}

/// Running totals of a render in progress, readable from another thread.
///
/// Fed by [`RenderProfiler::record`], so its `cpu_percent` converges on the
/// final [`ProfileReport::cpu_percent`]. Lock-free; the render thread never
/// waits on a reader.
#[derive(Debug)]
pub struct LoadMeter {
    sample_rate: u32,
    block_size: usize,
    calls: AtomicU64,
    frames: AtomicU64,
    render_nanos: AtomicU64,
    overruns: AtomicU64,
    current: AtomicF32,
    peak: AtomicF32,
}

impl LoadMeter {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            calls: AtomicU64::new(0),
            frames: AtomicU64::new(0),
            render_nanos: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            current: AtomicF32::new(0.0),
            peak: AtomicF32::new(0.0),
        }
    }

    pub fn record(&self, frames: usize, elapsed: Duration) {
        if frames == 0 {
            return;
        }
        let block_secs = frames as f64 / self.sample_rate as f64;
        let load = (elapsed.as_secs_f64() / block_secs * 100.0) as f32;

        self.current.store(load, Ordering::Release);
        self.peak.fetch_max(load, Ordering::AcqRel);
        if load > 100.0 {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }

        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.render_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.frames.fetch_add(frames as u64, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Release);
    }

    pub fn metrics(&self) -> LoadMetrics {
        let calls = self.calls.load(Ordering::Acquire);
        let frames = self.frames.load(Ordering::Relaxed);
        let render_secs = self.render_nanos.load(Ordering::Relaxed) as f64 / 1e9;
        let audio_secs = frames as f64 / self.sample_rate as f64;
        LoadMetrics {
            calls,
            frames,
            cpu_percent: if audio_secs > 0.0 {
                render_secs / audio_secs * 100.0
            } else {
                0.0
            },
            current: self.current.load(Ordering::Acquire),
            peak: self.peak.load(Ordering::Acquire),
            overruns: self.overruns.load(Ordering::Relaxed),
            budget_us: self.block_size as f64 / self.sample_rate as f64 * 1e6,
        }
    }

    pub fn overruns(&self) -> u64 {
        self.overruns.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.frames.store(0, Ordering::Relaxed);
        self.render_nanos.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
        self.current.store(0.0, Ordering::Relaxed);
        self.peak.store(0.0, Ordering::Relaxed);
    }
}
