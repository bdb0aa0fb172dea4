//! Job configuration types.
//!
//! A synthesis job is described by one [`AudioConfig`]: an ordered set of
//! speakers (each with a voice, an emotion, and a turn-prefix marker),
//! a background-music selection with its mix volume, the export format, and
//! whether to persist the result locally.
//!
//! Configurations are validated atomically when built and are immutable for
//! the rest of the pipeline, with one documented exception: the synthesis
//! retry protocol swaps each speaker's `voice` and `fallback_voice` in place
//! between attempts (see [`crate::synthesis`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod voices;

pub use voices::{AcousticParams, BackgroundMusic, OutputFormat, Voice, VoiceEmotion};

/// Maximum number of speakers in one job.
pub const MAX_SPEAKERS: usize = 5;

/// Maximum length of a speaker's turn-prefix marker, in characters.
pub const MAX_TURN_PREFIX_CHARS: usize = 64;

// =============================================================================
// SpeakerConfig
// =============================================================================

/// Configuration for a single conversational role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerConfig {
    /// Primary voice for this speaker.
    pub voice: Voice,
    /// Emotion driving the acoustic tuning parameters.
    pub emotion: VoiceEmotion,
    /// Literal string marking this speaker's lines in the transcript,
    /// e.g. `"Speaker 1: "`.
    pub turn_prefix: String,
    /// Voice used after repeated synthesis failure. Derived from the
    /// voice-pairing table unless set explicitly.
    pub fallback_voice: Voice,
}

impl SpeakerConfig {
    /// Creates a speaker with the given voice, a neutral emotion, an empty
    /// turn prefix, and the paired fallback voice.
    pub fn new(voice: Voice) -> Self {
        Self {
            voice,
            emotion: VoiceEmotion::default(),
            turn_prefix: String::new(),
            fallback_voice: voice.fallback(),
        }
    }

    /// Sets the emotion.
    pub fn with_emotion(mut self, emotion: VoiceEmotion) -> Self {
        self.emotion = emotion;
        self
    }

    /// Sets the turn-prefix marker.
    pub fn with_turn_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.turn_prefix = prefix.into();
        self
    }

    /// Overrides the derived fallback voice.
    pub fn with_fallback_voice(mut self, fallback: Voice) -> Self {
        self.fallback_voice = fallback;
        self
    }

    /// Returns the acoustic tuning parameters for this speaker's emotion.
    #[inline]
    pub fn acoustic_params(&self) -> AcousticParams {
        self.emotion.acoustic_params()
    }

    /// Swaps the primary and fallback voices in place.
    ///
    /// Called by the synthesis retry protocol between attempts; two swaps
    /// restore the original assignment.
    pub(crate) fn swap_voices(&mut self) {
        std::mem::swap(&mut self.voice, &mut self.fallback_voice);
    }
}

// =============================================================================
// AudioConfig
// =============================================================================

/// Complete, validated job descriptor for one audio synthesis run.
///
/// Construct through [`AudioConfig::builder`]; `build()` enforces every
/// invariant once, and downstream stages trust them without re-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    speakers: BTreeMap<String, SpeakerConfig>,
    /// Background music selection.
    pub background_music: BackgroundMusic,
    /// Music gain fraction in `[0.0, 1.0]`; 0.0 maps to −20 dB, 1.0 to 0 dB.
    pub music_volume: f32,
    /// Persist the exported asset under the local output directory.
    pub save_locally: bool,
    /// Export format for the finished asset.
    pub output_format: OutputFormat,
}

impl AudioConfig {
    /// Starts building a configuration.
    pub fn builder() -> AudioConfigBuilder {
        AudioConfigBuilder::default()
    }

    /// Returns the speakers, ordered by role key.
    #[inline]
    pub fn speakers(&self) -> &BTreeMap<String, SpeakerConfig> {
        &self.speakers
    }

    /// Swaps every speaker's primary and fallback voice in place.
    ///
    /// The only sanctioned mutation after construction; used by the
    /// synthesis retry rotation.
    pub(crate) fn swap_all_voices(&mut self) {
        for speaker in self.speakers.values_mut() {
            speaker.swap_voices();
        }
    }
}

/// Builder for [`AudioConfig`]; `build()` validates atomically.
#[derive(Debug, Clone, Default)]
pub struct AudioConfigBuilder {
    speakers: Vec<(String, SpeakerConfig)>,
    background_music: BackgroundMusic,
    music_volume: f32,
    save_locally: bool,
    output_format: OutputFormat,
}

impl AudioConfigBuilder {
    /// Adds a speaker under the given role id (e.g. `"speaker1"`).
    pub fn speaker(mut self, id: impl Into<String>, config: SpeakerConfig) -> Self {
        self.speakers.push((id.into(), config));
        self
    }

    /// Selects the background music track.
    pub fn background_music(mut self, music: BackgroundMusic) -> Self {
        self.background_music = music;
        self
    }

    /// Sets the music gain fraction (validated to `[0.0, 1.0]` at build).
    pub fn music_volume(mut self, volume: f32) -> Self {
        self.music_volume = volume;
        self
    }

    /// Requests local persistence of the exported asset.
    pub fn save_locally(mut self, save: bool) -> Self {
        self.save_locally = save;
        self
    }

    /// Sets the export format.
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Invariants enforced
    ///
    /// - 1 to [`MAX_SPEAKERS`] speakers, non-empty unique role ids
    /// - no two speakers share a primary voice
    /// - all voices (primary and fallback) resolve to the same language
    /// - turn prefixes at most [`MAX_TURN_PREFIX_CHARS`] characters
    /// - `music_volume` within the closed interval `[0.0, 1.0]`
    pub fn build(self) -> Result<AudioConfig> {
        if self.speakers.is_empty() {
            return Err(Error::Validation(
                "at least one speaker must be configured".to_string(),
            ));
        }
        if self.speakers.len() > MAX_SPEAKERS {
            return Err(Error::Validation(format!(
                "at most {} speakers are supported (got {})",
                MAX_SPEAKERS,
                self.speakers.len()
            )));
        }

        let mut speakers = BTreeMap::new();
        for (id, speaker) in self.speakers {
            if id.trim().is_empty() {
                return Err(Error::Validation(
                    "speaker id must be a non-empty string".to_string(),
                ));
            }
            if speaker.turn_prefix.chars().count() > MAX_TURN_PREFIX_CHARS {
                return Err(Error::Validation(format!(
                    "turn prefix for '{}' exceeds {} characters",
                    id, MAX_TURN_PREFIX_CHARS
                )));
            }
            if speakers.insert(id.clone(), speaker).is_some() {
                return Err(Error::Validation(format!("duplicate speaker id '{}'", id)));
            }
        }

        // Primary voices must be unique across the job.
        let mut seen = Vec::with_capacity(speakers.len());
        for (id, speaker) in &speakers {
            if seen.contains(&speaker.voice) {
                return Err(Error::Validation(format!(
                    "voice '{}' is assigned to more than one speaker (duplicate on '{}')",
                    speaker.voice, id
                )));
            }
            seen.push(speaker.voice);
        }

        // All voices in one job must speak the same language.
        let language = speakers
            .values()
            .next()
            .map(|s| s.voice.language())
            .unwrap_or_default();
        for (id, speaker) in &speakers {
            if speaker.voice.language() != language || speaker.fallback_voice.language() != language
            {
                return Err(Error::Validation(format!(
                    "speaker '{}' uses a voice with language '{}' but the job language is '{}'",
                    id,
                    speaker.voice.language(),
                    language
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.music_volume) || !self.music_volume.is_finite() {
            return Err(Error::Validation(format!(
                "music volume must be between 0.0 and 1.0 (got {})",
                self.music_volume
            )));
        }

        Ok(AudioConfig {
            speakers,
            background_music: self.background_music,
            music_volume: self.music_volume,
            save_locally: self.save_locally,
            output_format: self.output_format,
        })
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// Environment variable holding the synthesis provider key.
pub const SYNTHESIS_KEY_VAR: &str = "FAL_KEY";

/// Environment variable holding the language-model provider key.
pub const LLM_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// API secrets required before any pipeline stage runs.
///
/// Loaded from the process environment (a `.env` file is honored when
/// present). Absence of either key is a configuration failure reported
/// before any network access is attempted.
#[derive(Clone)]
pub struct Secrets {
    /// Synthesis provider API key.
    pub synthesis_key: String,
    /// Language-model provider API key (consumed by the transcript
    /// collaborator, checked here so misconfiguration fails early).
    pub llm_key: String,
}

impl Secrets {
    /// Loads and checks both required secrets from the environment.
    pub fn from_env() -> Result<Self> {
        // Best effort; a missing .env file is fine if the variables are set.
        let _ = dotenvy::dotenv();

        let synthesis_key = Self::require(SYNTHESIS_KEY_VAR)?;
        let llm_key = Self::require(LLM_KEY_VAR)?;
        Ok(Self {
            synthesis_key,
            llm_key,
        })
    }

    fn require(var: &str) -> Result<String> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(Error::Configuration(format!(
                "required environment variable {} is not set",
                var
            ))),
        }
    }
}

impl std::fmt::Debug for Secrets {
    /// Keys never appear in logs or debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("synthesis_key", &"<redacted>")
            .field("llm_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn two_speaker_builder() -> AudioConfigBuilder {
        AudioConfig::builder()
            .speaker(
                "speaker1",
                SpeakerConfig::new(Voice::Jennifer).with_turn_prefix("Speaker 1: "),
            )
            .speaker(
                "speaker2",
                SpeakerConfig::new(Voice::Dexter).with_turn_prefix("Speaker 2: "),
            )
    }

    #[test]
    fn test_valid_two_speaker_config() {
        let config = two_speaker_builder().build().unwrap();
        assert_eq!(config.speakers().len(), 2);
        assert_eq!(
            config.speakers()["speaker1"].fallback_voice,
            Voice::Rachel
        );
    }

    #[test]
    fn test_no_speakers_rejected() {
        let err = AudioConfig::builder().build().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_speaker_count_bounds() {
        // Five unique role ids with four available voices cannot all have
        // unique primaries, so the count check fires first on six entries.
        let mut builder = AudioConfig::builder();
        for (i, voice) in Voice::all().iter().enumerate() {
            builder = builder.speaker(format!("speaker{}", i + 1), SpeakerConfig::new(*voice));
        }
        assert!(builder.clone().build().is_ok());

        let mut six = builder;
        for i in 4..6 {
            six = six.speaker(
                format!("speaker{}", i + 1),
                SpeakerConfig::new(Voice::Jennifer),
            );
        }
        let err = six.build().unwrap_err();
        assert!(err.to_string().contains("at most"));
    }

    #[test]
    fn test_duplicate_voice_rejected() {
        let err = AudioConfig::builder()
            .speaker("speaker1", SpeakerConfig::new(Voice::Jennifer))
            .speaker("speaker2", SpeakerConfig::new(Voice::Jennifer))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than one speaker"));
    }

    #[test]
    fn test_duplicate_speaker_id_rejected() {
        let err = AudioConfig::builder()
            .speaker("speaker1", SpeakerConfig::new(Voice::Jennifer))
            .speaker("speaker1", SpeakerConfig::new(Voice::Dexter))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate speaker id"));
    }

    #[test]
    fn test_empty_speaker_id_rejected() {
        let err = AudioConfig::builder()
            .speaker("  ", SpeakerConfig::new(Voice::Jennifer))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_music_volume_boundaries() {
        assert!(two_speaker_builder().music_volume(0.0).build().is_ok());
        assert!(two_speaker_builder().music_volume(1.0).build().is_ok());
        assert!(two_speaker_builder().music_volume(-0.01).build().is_err());
        assert!(two_speaker_builder().music_volume(1.01).build().is_err());
        assert!(two_speaker_builder().music_volume(f32::NAN).build().is_err());
    }

    #[test]
    fn test_turn_prefix_length_bound() {
        let long_prefix = "x".repeat(MAX_TURN_PREFIX_CHARS + 1);
        let err = AudioConfig::builder()
            .speaker(
                "speaker1",
                SpeakerConfig::new(Voice::Jennifer).with_turn_prefix(long_prefix),
            )
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("turn prefix"));

        let at_limit = "x".repeat(MAX_TURN_PREFIX_CHARS);
        assert!(
            AudioConfig::builder()
                .speaker(
                    "speaker1",
                    SpeakerConfig::new(Voice::Jennifer).with_turn_prefix(at_limit),
                )
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_swap_all_voices_round_trips() {
        let mut config = two_speaker_builder().build().unwrap();
        let original = config.clone();

        config.swap_all_voices();
        assert_eq!(config.speakers()["speaker1"].voice, Voice::Rachel);
        assert_eq!(config.speakers()["speaker1"].fallback_voice, Voice::Jennifer);

        config.swap_all_voices();
        assert_eq!(config, original);
    }

    #[test]
    fn test_speakers_ordered_by_role_key() {
        let config = AudioConfig::builder()
            .speaker("speaker2", SpeakerConfig::new(Voice::Dexter))
            .speaker("speaker1", SpeakerConfig::new(Voice::Jennifer))
            .build()
            .unwrap();
        let ids: Vec<_> = config.speakers().keys().cloned().collect();
        assert_eq!(ids, vec!["speaker1", "speaker2"]);
    }

    #[test]
    fn test_secrets_debug_redacts_keys() {
        let secrets = Secrets {
            synthesis_key: "super-secret".to_string(),
            llm_key: "also-secret".to_string(),
        };
        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
