//! Static voice, emotion, and music registries.
//!
//! Everything here is closed, process-wide lookup data: the set of known
//! provider voices and their fallback pairing, the emotion → acoustic tuning
//! table, the background-music catalogue with its fixed asset URLs, and the
//! supported export formats. Validation happens once at configuration
//! construction; downstream code trusts these types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Voices
// =============================================================================

/// A voice from the provider's known-voice set.
///
/// The identifier strings are the exact values the synthesis provider
/// expects in the `voices[].voice` request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Voice {
    /// Jennifer (English (US)/American)
    Jennifer,
    /// Rachel (English (US)/American)
    Rachel,
    /// Dexter (English (US)/American)
    Dexter,
    /// Patrick (English (US)/American)
    Patrick,
}

impl Voice {
    /// Returns the provider identifier string for this voice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Jennifer => "Jennifer (English (US)/American)",
            Self::Rachel => "Rachel (English (US)/American)",
            Self::Dexter => "Dexter (English (US)/American)",
            Self::Patrick => "Patrick (English (US)/American)",
        }
    }

    /// Returns the language this voice speaks.
    ///
    /// All speakers in one job must resolve to the same language.
    #[inline]
    pub const fn language(&self) -> &'static str {
        match self {
            Self::Jennifer | Self::Rachel | Self::Dexter | Self::Patrick => "en-US",
        }
    }

    /// Returns the paired fallback voice used after repeated synthesis
    /// failure (Jennifer↔Rachel, Dexter↔Patrick).
    #[inline]
    pub const fn fallback(&self) -> Self {
        match self {
            Self::Jennifer => Self::Rachel,
            Self::Rachel => Self::Jennifer,
            Self::Dexter => Self::Patrick,
            Self::Patrick => Self::Dexter,
        }
    }

    /// Returns all known voices.
    pub const fn all() -> &'static [Self] {
        &[Self::Jennifer, Self::Rachel, Self::Dexter, Self::Patrick]
    }

    /// Creates a voice from a provider identifier or bare first name.
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str().to_lowercase() == lowered || lowered == v.first_name())
    }

    fn first_name(&self) -> &'static str {
        match self {
            Self::Jennifer => "jennifer",
            Self::Rachel => "rachel",
            Self::Dexter => "dexter",
            Self::Patrick => "patrick",
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Emotions
// =============================================================================

/// Acoustic tuning parameters sent to the provider per speaker.
///
/// - **Stability** (0.0-1.0): lower values = more expressive delivery
/// - **Similarity boost** (0.0-1.0): higher values = closer to the base voice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcousticParams {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for AcousticParams {
    /// The neutral emotion's values, used when no mapping applies.
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.5,
        }
    }
}

/// Voice emotion selection for one speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoiceEmotion {
    #[default]
    Neutral,
    Happy,
    Excited,
    Serious,
    Professional,
    Friendly,
    Calm,
}

impl VoiceEmotion {
    /// Maps this emotion to its acoustic tuning parameters.
    pub const fn acoustic_params(&self) -> AcousticParams {
        let (stability, similarity_boost) = match self {
            Self::Neutral => (0.5, 0.5),
            Self::Happy => (0.7, 0.6),
            Self::Excited => (0.8, 0.7),
            Self::Serious => (0.3, 0.4),
            Self::Professional => (0.4, 0.5),
            Self::Friendly => (0.6, 0.6),
            Self::Calm => (0.3, 0.3),
        };
        AcousticParams {
            stability,
            similarity_boost,
        }
    }

    /// Returns the lowercase name used in user-facing options.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Excited => "excited",
            Self::Serious => "serious",
            Self::Professional => "professional",
            Self::Friendly => "friendly",
            Self::Calm => "calm",
        }
    }

    /// Creates an emotion from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Some(Self::Neutral),
            "happy" => Some(Self::Happy),
            "excited" => Some(Self::Excited),
            "serious" => Some(Self::Serious),
            "professional" => Some(Self::Professional),
            "friendly" => Some(Self::Friendly),
            "calm" => Some(Self::Calm),
            _ => None,
        }
    }
}

impl std::fmt::Display for VoiceEmotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Background music
// =============================================================================

/// Background music selection.
///
/// Each named track maps to a fixed, pre-registered CDN asset fetched over
/// plain HTTPS with no authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMusic {
    #[default]
    None,
    SoftPiano,
    Ambient,
    Jazz,
    Electronic,
    Nature,
    Cinematic,
}

impl BackgroundMusic {
    /// Returns the asset URL for this track, or `None` for no music.
    pub const fn asset_url(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::SoftPiano => {
                Some("https://cdn.pixabay.com/download/audio/2022/02/22/audio_d1718ab41b.mp3")
            }
            Self::Ambient => {
                Some("https://cdn.pixabay.com/download/audio/2022/03/15/audio_c8c8395646.mp3")
            }
            Self::Jazz => {
                Some("https://cdn.pixabay.com/download/audio/2022/05/27/audio_1808fbf07a.mp3")
            }
            Self::Electronic => {
                Some("https://cdn.pixabay.com/download/audio/2022/03/10/audio_c8695a1ecd.mp3")
            }
            Self::Nature => {
                Some("https://cdn.pixabay.com/download/audio/2021/11/25/audio_00fa5593f3.mp3")
            }
            Self::Cinematic => {
                Some("https://cdn.pixabay.com/download/audio/2022/05/17/audio_69a61cd6d9.mp3")
            }
        }
    }

    /// Returns the snake_case name used in user-facing options.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SoftPiano => "soft_piano",
            Self::Ambient => "ambient",
            Self::Jazz => "jazz",
            Self::Electronic => "electronic",
            Self::Nature => "nature",
            Self::Cinematic => "cinematic",
        }
    }

    /// Creates a music selection from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(Self::None),
            "soft_piano" | "piano" => Some(Self::SoftPiano),
            "ambient" => Some(Self::Ambient),
            "jazz" => Some(Self::Jazz),
            "electronic" => Some(Self::Electronic),
            "nature" => Some(Self::Nature),
            "cinematic" => Some(Self::Cinematic),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackgroundMusic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Output format
// =============================================================================

/// Supported export formats for the finished asset.
///
/// `Wav` is the first and most compatible format; the mixing engine falls
/// back to it if the selected encoder fails at the last mile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// WAV container, 16-bit PCM (default)
    #[default]
    Wav,
    /// Raw signed 16-bit little-endian PCM, headerless
    Pcm,
    /// G.711 mu-law, 8 bits per sample
    Mulaw,
}

impl OutputFormat {
    /// Returns the lowercase format name.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Pcm => "pcm",
            Self::Mulaw => "mulaw",
        }
    }

    /// Returns the file extension (without dot) for this format.
    #[inline]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Pcm => "pcm",
            Self::Mulaw => "ulaw",
        }
    }

    /// Returns all supported formats, most compatible first.
    pub const fn all() -> &'static [Self] {
        &[Self::Wav, Self::Pcm, Self::Mulaw]
    }

    /// Creates a format from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "wav" | "wave" => Some(Self::Wav),
            "pcm" | "raw" => Some(Self::Pcm),
            "mulaw" | "ulaw" | "mu-law" => Some(Self::Mulaw),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Tests
// =============================================================================
