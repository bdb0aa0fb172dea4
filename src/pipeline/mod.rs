//! End-to-end orchestration of one audio generation job.
//!
//! [`PipelineContext`] owns the shared runtime state: a pooled HTTP client
//! reused by synthesis and every download, and a semaphore bounding the
//! number of concurrent downloads across the process. One context serves
//! many jobs; the free function [`generate_audio`] spins up a short-lived
//! context for one-shot use.
//!
//! # Job lifecycle
//!
//! 1. load and check secrets (fail before any network traffic)
//! 2. synthesize the transcript into a provider-hosted audio URL
//! 3. download the voice audio into a job-scoped temporary directory
//! 4. mix in background music and export in the configured format
//! 5. optionally persist the episode under the local output directory
//!
//! Stages short-circuit: the first fatal error aborts the job and the
//! temporary directory is removed on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::audio::{self, MixingEngine, OUTPUT_DIR};
use crate::config::{AudioConfig, Secrets};
use crate::error::{Error, Result};
use crate::synthesis::SynthesisClient;
use crate::transport::Fetcher;

/// Download slots shared by all jobs on one context.
pub const MAX_CONCURRENT_DOWNLOADS: usize = 3;

/// A finished episode: where the provider hosts it and, when local
/// persistence was requested and succeeded, where it lives on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAudio {
    /// Provider-hosted URL for the raw synthesized audio.
    pub provider_url: String,
    /// Locally persisted episode file, if saved.
    pub local_path: Option<PathBuf>,
}

/// Shared runtime state for audio generation jobs.
#[derive(Clone)]
pub struct PipelineContext {
    client: reqwest::Client,
    downloads: Arc<Semaphore>,
    output_dir: PathBuf,
    synthesis_endpoint: Option<String>,
    secrets: Option<Secrets>,
}

impl PipelineContext {
    /// Creates a context with a fresh pooled client.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("http client construction failed: {e}")))?;
        Ok(Self {
            client,
            downloads: Arc::new(Semaphore::new(MAX_CONCURRENT_DOWNLOADS)),
            output_dir: PathBuf::from(OUTPUT_DIR),
            synthesis_endpoint: None,
            secrets: None,
        })
    }

    /// Overrides the synthesis endpoint (mock servers in tests).
    pub fn with_synthesis_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.synthesis_endpoint = Some(endpoint.into());
        self
    }

    /// Overrides the local persistence directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Injects secrets directly instead of reading the environment.
    pub fn with_secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Runs one complete generation job.
    ///
    /// The configuration is mutable because the synthesis retry protocol
    /// may swap speaker voices in place between attempts.
    pub async fn generate_audio(
        &self,
        transcript: &str,
        config: &mut AudioConfig,
    ) -> Result<GeneratedAudio> {
        let secrets = match &self.secrets {
            Some(secrets) => secrets.clone(),
            None => Secrets::from_env()?,
        };

        let mut synthesis = SynthesisClient::new(self.client.clone(), secrets.synthesis_key);
        if let Some(endpoint) = &self.synthesis_endpoint {
            synthesis = synthesis.with_endpoint(endpoint.clone());
        }

        info!(
            speakers = config.speakers().len(),
            chars = transcript.chars().count(),
            "starting audio generation job"
        );
        let provider_url = synthesis.synthesize(transcript, config).await?;

        // Job-scoped scratch space, removed on drop whatever happens below.
        let workdir = tempfile::tempdir()
            .map_err(|e| Error::Processing(format!("cannot create working directory: {e}")))?;

        let fetcher = Fetcher::new(self.client.clone());
        let voice_path = workdir.path().join("voice.mp3");
        {
            let _permit = self.downloads.acquire().await.map_err(|_| {
                Error::Processing("download slots closed while fetching voice audio".to_string())
            })?;
            fetcher.fetch(&provider_url, &voice_path).await?;
        }

        let engine = MixingEngine::new(fetcher, Arc::clone(&self.downloads));
        let exported = engine.mix(&voice_path, config, workdir.path()).await?;

        let local_path = if config.save_locally {
            match audio::persist_episode(&exported, config.output_format, &self.output_dir) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "local save failed, episode remains at the provider");
                    None
                }
            }
        } else {
            None
        };

        info!(%provider_url, saved = local_path.is_some(), "job complete");
        Ok(GeneratedAudio {
            provider_url,
            local_path,
        })
    }
}

/// One-shot convenience wrapper: builds a context, runs a single job, and
/// tears the context down.
pub async fn generate_audio(
    transcript: &str,
    config: &mut AudioConfig,
) -> Result<GeneratedAudio> {
    PipelineContext::new()?.generate_audio(transcript, config).await
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpeakerConfig, Voice};

    fn job_config() -> AudioConfig {
        AudioConfig::builder()
            .speaker(
                "speaker1",
                SpeakerConfig::new(Voice::Jennifer).with_turn_prefix("Speaker 1: "),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_secrets_fail_before_any_network_call() {
        // With no injected secrets and the key variable absent, the job must
        // fail with a configuration error without touching the unroutable
        // endpoint.
        let key_var = crate::config::SYNTHESIS_KEY_VAR;
        let saved = std::env::var(key_var).ok();
        // SAFETY: this is the only test in the binary touching this variable.
        unsafe { std::env::remove_var(key_var) };

        let context = PipelineContext::new()
            .unwrap()
            .with_synthesis_endpoint("http://127.0.0.1:9/synth");
        let mut config = job_config();
        let err = context
            .generate_audio("Speaker 1: Hi.", &mut config)
            .await
            .unwrap_err();

        if let Some(value) = saved {
            // SAFETY: restoring the value read above.
            unsafe { std::env::set_var(key_var, value) };
        }
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_invalid_transcript_fails_validation() {
        let context = PipelineContext::new()
            .unwrap()
            .with_synthesis_endpoint("http://127.0.0.1:9/synth")
            .with_secrets(Secrets {
                synthesis_key: "test-key".to_string(),
                llm_key: "test-key".to_string(),
            });

        let mut config = job_config();
        let err = context.generate_audio("", &mut config).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_context_is_cheaply_cloneable() {
        let context = PipelineContext::new().unwrap();
        let clone = context.clone();
        // Clones share download slots.
        assert_eq!(
            Arc::strong_count(&context.downloads),
            Arc::strong_count(&clone.downloads)
        );
    }
}
