//! Track export to the supported container and raw formats.
//!
//! WAV output goes through hound as 16-bit PCM. The raw exports share the
//! same f32 to i16 scaling: `pcm` is little-endian signed 16-bit with no
//! header, `ulaw` is 8-bit ITU-T G.711 mu-law.

use std::io::Write;
use std::path::Path;

use crate::config::OutputFormat;
use crate::error::{Error, Result};

use super::decode::Track;

/// Writes `track` to `path` in the given format.
pub fn write_track(track: &Track, format: OutputFormat, path: &Path) -> Result<()> {
    match format {
        OutputFormat::Wav => write_wav(track, path),
        OutputFormat::Pcm => write_pcm(track, path),
        OutputFormat::Mulaw => write_mulaw(track, path),
    }
}

/// Writes a mono 16-bit PCM WAV file.
pub fn write_wav(track: &Track, path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: track.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| Error::Processing(format!("cannot create {}: {e}", path.display())))?;
    for &sample in &track.samples {
        writer
            .write_sample(sample_to_i16(sample))
            .map_err(|e| Error::Processing(format!("wav write failed: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| Error::Processing(format!("wav finalize failed: {e}")))?;
    Ok(())
}

/// Writes headerless little-endian signed 16-bit samples.
fn write_pcm(track: &Track, path: &Path) -> Result<()> {
    let mut bytes = Vec::with_capacity(track.samples.len() * 2);
    for &sample in &track.samples {
        bytes.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }
    write_bytes(path, &bytes)
}

/// Writes 8-bit G.711 mu-law samples.
fn write_mulaw(track: &Track, path: &Path) -> Result<()> {
    let bytes: Vec<u8> = track
        .samples
        .iter()
        .map(|&s| linear_to_mulaw(sample_to_i16(s)))
        .collect();
    write_bytes(path, &bytes)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .map_err(|e| Error::Processing(format!("cannot create {}: {e}", path.display())))?;
    file.write_all(bytes)
        .map_err(|e| Error::Processing(format!("write failed for {}: {e}", path.display())))?;
    Ok(())
}

/// Scales a normalized f32 sample to signed 16-bit.
fn sample_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// ITU-T G.711 mu-law companding of one 16-bit linear sample.
fn linear_to_mulaw(linear: i16) -> u8 {
    const BIAS: i32 = 0x84;
    const CLIP: i32 = 32635;

    let mut value = linear as i32;
    let sign = if value < 0 {
        value = -value;
        0x80
    } else {
        0x00
    };

    if value > CLIP {
        value = CLIP;
    }
    value += BIAS;

    let mut exponent = 7;
    for i in 0..8 {
        if value <= (0xFF << i) {
            exponent = i;
            break;
        }
    }

    let mantissa = (value >> (exponent + 3)) & 0x0F;
    !(sign | (exponent << 4) | mantissa) as u8
}

// =============================================================================
// Tests
// =============================================================================
