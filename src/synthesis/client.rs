//! Synthesis client with bounded retry and voice-fallback rotation.
//!
//! The retry protocol models "try the alternate voice, then try the
//! original again" rather than monotonic degradation:
//!
//! - attempt 1 uses each speaker's primary voice
//! - before attempt 2 every speaker's `voice`/`fallback_voice` pair is
//!   swapped in place (fallback voices active)
//! - before attempt 3 the pair is swapped again (primaries restored)
//!
//! A fixed delay separates attempts. All preconditions (transcript length,
//! emptiness, injection patterns) are enforced before any network call.

use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{
    INJECTION_PATTERNS, MAX_ATTEMPTS, MAX_TRANSCRIPT_CHARS, RETRY_DELAY, SYNTHESIS_TIMEOUT,
    SYNTHESIS_URL, SynthesisResponse,
};
use crate::config::AudioConfig;
use crate::error::{Error, Result};

/// Client for the external text-to-speech provider.
#[derive(Clone)]
pub struct SynthesisClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl SynthesisClient {
    /// Creates a client against the production endpoint.
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: SYNTHESIS_URL.to_string(),
        }
    }

    /// Overrides the provider endpoint (mock servers in tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Synthesizes the transcript into provider-hosted audio.
    ///
    /// Returns the provider's retrievable audio URL. The configuration's
    /// speaker voices may be left swapped when an attempt with fallback
    /// voices succeeds; that is the documented retry side effect.
    pub async fn synthesize(
        &self,
        transcript: &str,
        config: &mut AudioConfig,
    ) -> Result<String> {
        validate_transcript(transcript)?;

        let mut last_failure = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(RETRY_DELAY).await;
                // Attempt 2 runs on fallback voices, attempt 3 back on primaries.
                config.swap_all_voices();
            }

            info!(attempt, "requesting speech synthesis");
            match self.request_once(transcript, config).await {
                Ok(url) => {
                    info!(attempt, "synthesis succeeded");
                    return Ok(url);
                }
                Err(reason) => {
                    warn!(attempt, %reason, "synthesis attempt failed");
                    last_failure = reason;
                }
            }
        }

        Err(Error::Synthesis(format!(
            "provider failed after {} attempts: {}",
            MAX_ATTEMPTS, last_failure
        )))
    }

    /// One provider invocation. Failures come back as strings so the retry
    /// loop can treat every class (network, status, unusable body) alike.
    async fn request_once(
        &self,
        transcript: &str,
        config: &AudioConfig,
    ) -> std::result::Result<String, String> {
        let body = build_request_body(transcript, config);
        debug!(speakers = config.speakers().len(), "built synthesis request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Key {}", self.api_key))
            .timeout(SYNTHESIS_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("provider returned http status {status}"));
        }

        let parsed: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| format!("unreadable provider response: {e}"))?;

        parsed
            .audio_url()
            .map(str::to_owned)
            .ok_or_else(|| "provider response contained no audio url".to_string())
    }
}

/// Builds the one-request-per-job body: the transcript plus per-speaker
/// voice, turn prefix, and emotion-derived acoustic tuning values.
pub(crate) fn build_request_body(transcript: &str, config: &AudioConfig) -> serde_json::Value {
    let voices: Vec<serde_json::Value> = config
        .speakers()
        .values()
        .map(|speaker| {
            let params = speaker.acoustic_params();
            json!({
                "voice": speaker.voice.as_str(),
                "turn_prefix": speaker.turn_prefix,
                "stability": params.stability,
                "similarity_boost": params.similarity_boost,
            })
        })
        .collect();

    json!({
        "input": transcript,
        "voices": voices,
    })
}

/// Transcript preconditions, checked before any network call.
pub(crate) fn validate_transcript(transcript: &str) -> Result<()> {
    if transcript.trim().is_empty() {
        return Err(Error::Validation("transcript cannot be empty".to_string()));
    }

    // Char count, not byte length, for proper Unicode handling.
    let char_count = transcript.chars().count();
    if char_count > MAX_TRANSCRIPT_CHARS {
        return Err(Error::Validation(format!(
            "transcript exceeds maximum length of {} characters (got {})",
            MAX_TRANSCRIPT_CHARS, char_count
        )));
    }

    let lowered = transcript.to_lowercase();
    for pattern in INJECTION_PATTERNS {
        if lowered.contains(pattern) {
            return Err(Error::Validation(format!(
                "transcript contains disallowed pattern '{}'",
                pattern
            )));
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
