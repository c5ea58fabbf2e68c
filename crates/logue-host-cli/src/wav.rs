//! WAV file I/O using hound.

use std::path::Path;

use anyhow::Context;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use logue_host::AudioBuffer;

/// Reads any PCM or float WAV into interleaved f32 in [-1, 1].
pub fn read_wav(path: &Path) -> anyhow::Result<AudioBuffer> {
    let mut reader =
        WavReader::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(AudioBuffer::new(
        spec.channels as usize,
        spec.sample_rate,
        samples,
    ))
}

/// Writes 32-bit float WAV so out-of-range and non-finite values survive.
pub fn write_wav(path: &Path, audio: &AudioBuffer) -> anyhow::Result<()> {
    let spec = WavSpec {
        channels: audio.channels as u16,
        sample_rate: audio.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("cannot create {}", path.display()))?;
    for &sample in &audio.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
