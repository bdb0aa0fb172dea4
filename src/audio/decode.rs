//! Compressed-audio decoding to mono f32 sample buffers.
//!
//! All downstream mixing operates on [`Track`]: interleaved channels are
//! downmixed by averaging, samples are normalized to `[-1.0, 1.0]`, and the
//! source sample rate is carried alongside so the overlay stage can map
//! between clocks.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};

/// Decoded mono audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Mono samples normalized to `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Source sample rate in Hz.
    pub sample_rate: u32,
}

impl Track {
    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decodes an audio file (MP3, WAV, AAC) into a mono [`Track`].
///
/// The container is probed with the file extension as a hint; corrupted
/// packets are skipped rather than failing the whole decode. An input that
/// yields no samples at all is an error.
pub fn decode_file(path: &Path) -> Result<Track> {
    let src = File::open(path)
        .map_err(|e| Error::Processing(format!("cannot open {}: {e}", path.display())))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            Error::Processing(format!("unrecognized audio format {}: {e}", path.display()))
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            Error::Processing(format!("no decodable audio track in {}", path.display()))
        })?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Processing(format!("unknown sample rate in {}", path.display())))?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Processing(format!("unsupported codec in {}: {e}", path.display())))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(Error::Processing(format!(
                    "packet read failed in {}: {e}",
                    path.display()
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    let capacity = decoded.capacity() as u64;
                    sample_buf = Some(SampleBuffer::new(capacity, spec));
                }
                if let Some(ref mut buf) = sample_buf {
                    buf.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buf.samples());
                }
            }
            // Damaged packets are skipped, not fatal.
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(Error::Processing(format!(
                    "decode failed in {}: {e}",
                    path.display()
                )));
            }
        }
    }

    let samples = downmix(interleaved, channels);
    if samples.is_empty() {
        return Err(Error::Processing(format!(
            "decoded zero samples from {}",
            path.display()
        )));
    }

    Ok(Track {
        samples,
        sample_rate,
    })
}

/// Averages interleaved channels down to mono.
fn downmix(interleaved: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved;
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
