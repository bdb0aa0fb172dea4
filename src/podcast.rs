//! Episode model tying a transcript to its generated audio.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::AudioConfig;
use crate::error::{Error, Result};
use crate::pipeline::GeneratedAudio;

/// A podcast episode: topic, dialogue transcript, and (once generated)
/// the audio artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Podcast {
    /// Episode topic or title.
    pub topic: String,
    /// Full dialogue transcript, one speaker turn per line.
    pub transcript: String,
    /// Generated audio, present after a successful pipeline run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<GeneratedAudioRecord>,
}

/// Serializable record of a generation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAudioRecord {
    pub provider_url: String,
    pub local_path: Option<PathBuf>,
}

impl From<GeneratedAudio> for GeneratedAudioRecord {
    fn from(audio: GeneratedAudio) -> Self {
        Self {
            provider_url: audio.provider_url,
            local_path: audio.local_path,
        }
    }
}

impl Podcast {
    /// Creates an episode with no audio yet.
    pub fn new(topic: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            transcript: transcript.into(),
            audio: None,
        }
    }

    /// Records a generation result on the episode.
    pub fn with_audio(mut self, audio: GeneratedAudio) -> Self {
        self.audio = Some(audio.into());
        self
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Writes the transcript to a text file.
    pub fn save_transcript(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.transcript).map_err(|e| Error::Persistence {
            path: path.to_path_buf(),
            reason: format!("transcript write failed: {e}"),
        })
    }
}

/// Checks that every non-blank transcript line opens with one of the
/// configured speakers' turn prefixes.
///
/// Speakers with an empty prefix are skipped; if no speaker carries a
/// prefix there is nothing to check and the transcript passes.
pub fn transcript_matches_speakers(transcript: &str, config: &AudioConfig) -> bool {
    let prefixes: Vec<&str> = config
        .speakers()
        .values()
        .map(|s| s.turn_prefix.as_str())
        .filter(|p| !p.is_empty())
        .collect();
    if prefixes.is_empty() {
        return true;
    }

    transcript
        .lines()
        .filter(|line| !line.trim().is_empty())
        .all(|line| prefixes.iter().any(|prefix| line.starts_with(prefix)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpeakerConfig, Voice};

    fn dialogue_config() -> AudioConfig {
        AudioConfig::builder()
            .speaker(
                "speaker1",
                SpeakerConfig::new(Voice::Jennifer).with_turn_prefix("Speaker 1: "),
            )
            .speaker(
                "speaker2",
                SpeakerConfig::new(Voice::Dexter).with_turn_prefix("Speaker 2: "),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_well_formed_transcript_matches() {
        let transcript = "Speaker 1: Welcome back.\n\nSpeaker 2: Glad to be here.\n";
        assert!(transcript_matches_speakers(transcript, &dialogue_config()));
    }

    #[test]
    fn test_unprefixed_line_fails_match() {
        let transcript = "Speaker 1: Welcome back.\nNarrator: And then...\n";
        assert!(!transcript_matches_speakers(transcript, &dialogue_config()));
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let transcript = "Speaker 1: Hi.\n\n   \nSpeaker 2: Hello.";
        assert!(transcript_matches_speakers(transcript, &dialogue_config()));
    }

    #[test]
    fn test_no_prefixes_configured_always_matches() {
        let config = AudioConfig::builder()
            .speaker("speaker1", SpeakerConfig::new(Voice::Jennifer))
            .build()
            .unwrap();
        assert!(transcript_matches_speakers("anything goes", &config));
    }

    #[test]
    fn test_save_transcript_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.txt");

        let podcast = Podcast::new("Rust async", "Speaker 1: Hello.");
        podcast.save_transcript(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Speaker 1: Hello.");
    }

    #[test]
    fn test_audio_attachment() {
        let podcast = Podcast::new("Topic", "Speaker 1: Hi.");
        assert!(!podcast.has_audio());

        let podcast = podcast.with_audio(GeneratedAudio {
            provider_url: "https://cdn.fal.ai/out.mp3".to_string(),
            local_path: None,
        });
        assert!(podcast.has_audio());
    }
}
