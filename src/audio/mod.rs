//! Mixing engine: decode, overlay, export, and optional local persistence.
//!
//! The engine turns a downloaded voice file plus a job configuration into
//! one exported asset inside the job's working directory:
//!
//! 1. decode the voice track (any failure here is fatal for the job)
//! 2. fetch and decode the background-music bed, best effort; a missing or
//!    undecodable bed degrades to voice-only output with a warning
//! 3. overlay the attenuated bed under the voice
//! 4. export in the configured format; a failed encoder falls back to a
//!    plain WAV container so a synthesized episode is never thrown away
//!
//! Local persistence under the output directory is a separate, non-fatal
//! step driven by the pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::{AudioConfig, OutputFormat};
use crate::error::{Error, Result};
use crate::transport::Fetcher;

pub mod decode;
pub mod export;
pub mod mix;

pub use decode::Track;

/// Directory for locally persisted episodes, relative to the process cwd.
pub const OUTPUT_DIR: &str = "output";

/// Longest file name ever produced for a persisted episode.
const MAX_FILENAME_CHARS: usize = 255;

/// Mixes downloaded voice audio with optional background music.
#[derive(Clone)]
pub struct MixingEngine {
    fetcher: Fetcher,
    downloads: Arc<Semaphore>,
}

impl MixingEngine {
    /// Creates an engine sharing the pipeline's fetcher and download slots.
    pub fn new(fetcher: Fetcher, downloads: Arc<Semaphore>) -> Self {
        Self { fetcher, downloads }
    }

    /// Produces the exported episode file inside `workdir`.
    ///
    /// The voice file must decode; the music bed is best effort.
    pub async fn mix(
        &self,
        voice_path: &Path,
        config: &AudioConfig,
        workdir: &Path,
    ) -> Result<PathBuf> {
        let voice = decode::decode_file(voice_path)?;
        debug!(
            duration_secs = voice.duration_secs(),
            sample_rate = voice.sample_rate,
            "voice track decoded"
        );

        let mixed = match self.music_bed(config, workdir).await {
            Some(music) => {
                info!(
                    music = %config.background_music,
                    volume = config.music_volume,
                    "overlaying background music"
                );
                mix::overlay(&voice, &music, config.music_volume)
            }
            None => voice,
        };

        export_with_fallback(&mixed, config.output_format, workdir)
    }

    /// Fetches and decodes the configured music bed. Every failure path
    /// logs and returns `None`; the episode ships voice-only.
    async fn music_bed(&self, config: &AudioConfig, workdir: &Path) -> Option<Track> {
        let url = config.background_music.asset_url()?;
        let dest = workdir.join("music.mp3");

        {
            let _permit = match self.downloads.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("download slots closed, skipping background music");
                    return None;
                }
            };
            if let Err(e) = self.fetcher.fetch(url, &dest).await {
                warn!(url, error = %e, "music download failed, continuing without it");
                return None;
            }
        }

        match decode::decode_file(&dest) {
            Ok(track) => Some(track),
            Err(e) => {
                warn!(url, error = %e, "music decode failed, continuing without it");
                None
            }
        }
    }
}

/// Exports `track` as `output.<ext>` in `workdir`.
///
/// When the configured encoder fails the track is re-exported as WAV so the
/// already-synthesized audio survives; only a WAV failure is fatal.
fn export_with_fallback(track: &Track, format: OutputFormat, workdir: &Path) -> Result<PathBuf> {
    let path = workdir.join(format!("output.{}", format.extension()));
    match export::write_track(track, format, &path) {
        Ok(()) => Ok(path),
        Err(e) if format != OutputFormat::Wav => {
            warn!(%format, error = %e, "export failed, writing wav container instead");
            let fallback = workdir.join("output.wav");
            export::write_wav(track, &fallback)?;
            Ok(fallback)
        }
        Err(e) => Err(e),
    }
}

/// Copies the exported episode into `base_dir` as
/// `podcast_<YYYYmmdd_HHMMSS>.<ext>` and verifies the copy landed.
///
/// The pipeline treats a failure here as a warning, not a job failure.
pub fn persist_episode(source: &Path, format: OutputFormat, base_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(base_dir).map_err(|e| Error::Persistence {
        path: base_dir.to_path_buf(),
        reason: format!("cannot create output directory: {e}"),
    })?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let name = sanitize_filename(&format!("podcast_{stamp}.{}", format.extension()));
    let dest = base_dir.join(name);

    std::fs::copy(source, &dest).map_err(|e| Error::Persistence {
        path: dest.clone(),
        reason: format!("copy failed: {e}"),
    })?;

    if !dest.is_file() {
        return Err(Error::Persistence {
            path: dest,
            reason: "file missing after copy".to_string(),
        });
    }

    info!(path = %dest.display(), "episode saved locally");
    Ok(dest)
}

/// Restricts a file name to a safe character set and length.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_CHARS)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize, sample_rate: u32) -> Track {
        Track {
            samples: (0..len)
                .map(|i| {
                    (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin()
                        * 0.5
                })
                .collect(),
            sample_rate,
        }
    }

    #[test]
    fn test_sanitize_filename_strips_unsafe_chars() {
        assert_eq!(
            sanitize_filename("podcast_20260101/..\\evil name.wav"),
            "podcast_20260101_.._evil_name.wav"
        );
        assert_eq!(sanitize_filename("podcast_1.wav"), "podcast_1.wav");
    }

    #[test]
    fn test_sanitize_filename_caps_length() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_CHARS);
    }

    #[test]
    fn test_export_writes_configured_format() {
        let dir = tempfile::tempdir().unwrap();
        let track = tone(100, 8_000);

        let path = export_with_fallback(&track, OutputFormat::Pcm, dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "output.pcm");
        assert!(path.is_file());
    }

    #[test]
    fn test_persist_episode_names_and_copies() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let source = work.path().join("output.wav");
        std::fs::write(&source, b"RIFFdata").unwrap();

        let dest = persist_episode(&source, OutputFormat::Wav, out.path()).unwrap();
        let name = dest.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("podcast_"));
        assert!(name.ends_with(".wav"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"RIFFdata");
    }

    #[test]
    fn test_persist_missing_source_is_persistence_error() {
        let out = tempfile::tempdir().unwrap();
        let err = persist_episode(
            Path::new("/nonexistent/output.wav"),
            OutputFormat::Wav,
            out.path(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
    }
}
