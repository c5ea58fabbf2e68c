//! Render a unit offline.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use logue_host::{AudioBuffer, HostConfig, UnitHost};
use tracing::{info, warn};

use super::{parse_param, Outcome};
use crate::wav::{read_wav, write_wav};

/// Rendered length when there is no input file to follow.
const DEFAULT_DURATION_SECS: f64 = 10.0;

#[derive(Args)]
pub struct RunArgs {
    /// Unit shared library (.drmlgunit / .so)
    #[arg(value_name = "UNIT")]
    unit: PathBuf,

    /// Input WAV file; silence when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output WAV file (32-bit float)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sample rate handed to the unit
    #[arg(long, default_value = "48000")]
    sample_rate: u32,

    /// Frames per render call
    #[arg(long, default_value = "256")]
    block_size: usize,

    /// Output channels (1 or 2)
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(1..=2))]
    channels: u8,

    /// Seconds to render (default: input length, or 10 s without input)
    #[arg(short, long)]
    duration: Option<f64>,

    /// Parameter override applied after init (e.g. "3=64"); repeatable
    #[arg(long, value_parser = parse_param)]
    param: Vec<(usize, i32)>,

    /// Drive the unit with the profiling workload and print a timing report
    #[arg(long)]
    profile: bool,

    /// Seed for the profiling workload's parameter changes
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Exercise the unit's own presets and print the audit
    #[arg(long)]
    test_presets: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<Outcome> {
    let input = match &args.input {
        Some(path) => {
            let audio = read_wav(path)?;
            println!(
                "Input:  {} ({} ch, {} Hz, {:.2} s)",
                path.display(),
                audio.channels,
                audio.sample_rate,
                audio.duration_secs()
            );
            if audio.sample_rate != args.sample_rate {
                warn!(
                    file = audio.sample_rate,
                    host = args.sample_rate,
                    "input sample rate differs from host rate; not resampling"
                );
            }
            Some(audio)
        }
        None => None,
    };

    let config = HostConfig::new(args.sample_rate, args.block_size, 2, args.channels);
    let mut host = UnitHost::builder().config(config).build_from_path(&args.unit)?;
    if let Some(info) = host.info() {
        println!("Unit:   {} ({}, {})", info.name, info.kind, info.version);
    }

    for &(index, value) in &args.param {
        host.set_param(index, value)
            .with_context(|| format!("cannot set parameter {index}"))?;
        let shown = host
            .session()
            .param_display(index)
            .unwrap_or_else(|_| value.to_string());
        println!("Param:  [{index}] = {value} ({shown})");
    }

    let seconds = args
        .duration
        .or_else(|| input.as_ref().map(AudioBuffer::duration_secs))
        .unwrap_or(DEFAULT_DURATION_SECS);

    let out = if args.profile {
        host.profile(seconds, input.as_ref(), args.seed)?
    } else {
        host.render_seconds(seconds, input.as_ref())?
    };
    info!(calls = out.render_calls, frames = out.audio.frames(), "render finished");

    println!("Audio:  {}", out.audibility);
    if out.skipped_events > 0 {
        println!(
            "Events: {} skipped (entry point missing or unknown parameter)",
            out.skipped_events
        );
    }
    if args.profile {
        if let Some(report) = &out.profile {
            println!("\n{report}");
        }
        match host.perf_counters() {
            Some(counters) => println!("\n{counters}"),
            None => println!("\nPERF_MON: not available (build the unit with PERF_MON=1)"),
        }
    }

    if let Some(path) = &args.output {
        write_wav(path, &out.audio)?;
        println!("Output: {}", path.display());
    }

    if args.test_presets {
        match host.audit_presets()? {
            Some(audit) => println!("\n{audit}"),
            None => println!("\nUnit has no presets to audit"),
        }
    }

    host.close()?;

    if out.audibility.has_nonfinite() {
        Ok(Outcome::NonFiniteOutput)
    } else {
        Ok(Outcome::Success)
    }
}
