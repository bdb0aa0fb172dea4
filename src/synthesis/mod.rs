//! Text-to-speech synthesis via the hosted PlayHT dialogue API.
//!
//! One request per job carries the full transcript plus, per speaker, the
//! chosen voice identifier, its turn-prefix marker, and the two acoustic
//! tuning values derived from the speaker's emotion. The client owns the
//! retry-with-fallback-voice protocol described in [`client::SynthesisClient`].
//!
//! # Authentication
//!
//! Requests carry `Authorization: Key <FAL_KEY>` (fal.ai queue-less
//! invocation of the `fal-ai/playht/tts/ldm` model).

pub mod client;

pub use client::SynthesisClient;

use serde::Deserialize;

// =============================================================================
// API Constants
// =============================================================================

/// Hosted PlayHT large-dialogue-model endpoint.
pub const SYNTHESIS_URL: &str = "https://fal.run/fal-ai/playht/tts/ldm";

/// Maximum transcript length accepted by the client, in characters.
pub const MAX_TRANSCRIPT_CHARS: usize = 10_000;

/// Total synthesis attempts (primary, fallback, primary again).
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed delay separating synthesis attempts.
pub const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(2);

/// Request timeout for one synthesis call.
pub const SYNTHESIS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Substrings rejected by the transcript precheck. Transcripts are plain
/// dialogue; any of these indicates markup or script injection.
pub(crate) const INJECTION_PATTERNS: &[&str] = &["<script", "</", "javascript:", "<?"];

// =============================================================================
// Response types
// =============================================================================

/// Provider response envelope. Only the audio reference is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisResponse {
    pub audio: Option<SynthesizedAudio>,
}

/// The synthesized audio reference inside a provider response.
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesizedAudio {
    pub url: Option<String>,
}

impl SynthesisResponse {
    /// Extracts the retrievable audio URL, if the provider returned one.
    pub fn audio_url(&self) -> Option<&str> {
        self.audio
            .as_ref()
            .and_then(|audio| audio.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}
