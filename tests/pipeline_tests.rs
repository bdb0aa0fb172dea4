//! End-to-end pipeline tests with a mocked synthesis provider.
//!
//! Run: cargo test --test pipeline_tests

use std::io::Cursor;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::Semaphore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use podforge::audio::{decode, MixingEngine};
use podforge::config::{
    AudioConfig, BackgroundMusic, OutputFormat, Secrets, SpeakerConfig, Voice,
};
use podforge::pipeline::PipelineContext;
use podforge::transport::Fetcher;

/// One second of 440 Hz mono tone as 16-bit WAV bytes.
fn wav_fixture(sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..sample_rate {
            let s = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin()
                * 0.5;
            writer.write_sample((s * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn job_config() -> AudioConfig {
    AudioConfig::builder()
        .speaker(
            "speaker1",
            SpeakerConfig::new(Voice::Jennifer).with_turn_prefix("Speaker 1: "),
        )
        .build()
        .unwrap()
}

fn test_secrets() -> Secrets {
    Secrets {
        synthesis_key: "test-key".to_string(),
        llm_key: "test-key".to_string(),
    }
}

/// Mounts a provider that synthesizes immediately and hosts the voice file.
async fn mount_provider(server: &MockServer, voice_bytes: Vec<u8>) {
    Mock::given(method("POST"))
        .and(path("/synth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audio": { "url": format!("{}/voice.mp3", server.uri()) }
        })))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/voice.mp3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/voice.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(voice_bytes))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_generate_audio_end_to_end_with_local_save() {
    let server = MockServer::start().await;
    mount_provider(&server, wav_fixture(22_050)).await;

    let output_dir = tempfile::tempdir().unwrap();
    let context = PipelineContext::new()
        .unwrap()
        .with_synthesis_endpoint(format!("{}/synth", server.uri()))
        .with_secrets(test_secrets())
        .with_output_dir(output_dir.path());

    let mut config = AudioConfig::builder()
        .speaker(
            "speaker1",
            SpeakerConfig::new(Voice::Jennifer).with_turn_prefix("Speaker 1: "),
        )
        .save_locally(true)
        .output_format(OutputFormat::Wav)
        .build()
        .unwrap();

    let generated = context
        .generate_audio("Speaker 1: Hello listeners.", &mut config)
        .await
        .unwrap();

    assert_eq!(
        generated.provider_url,
        format!("{}/voice.mp3", server.uri())
    );

    let local = generated.local_path.expect("local save was requested");
    let name = local.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("podcast_"));
    assert!(name.ends_with(".wav"));

    // The persisted episode decodes back to the fixture's duration.
    let track = decode::decode_file(&local).unwrap();
    assert!((track.duration_secs() - 1.0).abs() < 0.05);
}

#[tokio::test]
async fn test_generate_audio_without_local_save() {
    let server = MockServer::start().await;
    mount_provider(&server, wav_fixture(22_050)).await;

    let context = PipelineContext::new()
        .unwrap()
        .with_synthesis_endpoint(format!("{}/synth", server.uri()))
        .with_secrets(test_secrets());

    let mut config = job_config();
    let generated = context
        .generate_audio("Speaker 1: Hello.", &mut config)
        .await
        .unwrap();

    assert!(generated.local_path.is_none());
}

#[tokio::test]
async fn test_voice_download_failure_aborts_the_job() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/synth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audio": { "url": format!("{}/voice.mp3", server.uri()) }
        })))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/voice.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let context = PipelineContext::new()
        .unwrap()
        .with_synthesis_endpoint(format!("{}/synth", server.uri()))
        .with_secrets(test_secrets());

    let mut config = job_config();
    let err = context
        .generate_audio("Speaker 1: Hello.", &mut config)
        .await
        .unwrap_err();
    assert!(matches!(err, podforge::Error::Transport { .. }));
}

#[tokio::test]
async fn test_undecodable_voice_audio_aborts_the_job() {
    let server = MockServer::start().await;
    mount_provider(&server, b"definitely not audio".to_vec()).await;

    let context = PipelineContext::new()
        .unwrap()
        .with_synthesis_endpoint(format!("{}/synth", server.uri()))
        .with_secrets(test_secrets());

    let mut config = job_config();
    let err = context
        .generate_audio("Speaker 1: Hello.", &mut config)
        .await
        .unwrap_err();
    assert!(matches!(err, podforge::Error::Processing(_)));
}

#[tokio::test]
async fn test_music_problems_never_fail_the_job() {
    // Whether the music bed downloads or not, the job must finish and the
    // output must keep the voice track's duration.
    let workdir = tempfile::tempdir().unwrap();
    let voice_path = workdir.path().join("voice.wav");
    std::fs::write(&voice_path, wav_fixture(22_050)).unwrap();

    let config = AudioConfig::builder()
        .speaker("speaker1", SpeakerConfig::new(Voice::Jennifer))
        .background_music(BackgroundMusic::SoftPiano)
        .music_volume(0.3)
        .build()
        .unwrap();

    let engine = MixingEngine::new(
        Fetcher::new(reqwest::Client::new()),
        Arc::new(Semaphore::new(3)),
    );
    let exported = engine
        .mix(&voice_path, &config, workdir.path())
        .await
        .unwrap();

    let track = decode::decode_file(&exported).unwrap();
    assert!((track.duration_secs() - 1.0).abs() < 0.05);
}

#[tokio::test]
async fn test_all_export_formats_produce_output() {
    for format in OutputFormat::all() {
        let workdir = tempfile::tempdir().unwrap();
        let voice_path = workdir.path().join("voice.wav");
        std::fs::write(&voice_path, wav_fixture(8_000)).unwrap();

        let config = AudioConfig::builder()
            .speaker("speaker1", SpeakerConfig::new(Voice::Jennifer))
            .output_format(*format)
            .build()
            .unwrap();

        let engine = MixingEngine::new(
            Fetcher::new(reqwest::Client::new()),
            Arc::new(Semaphore::new(3)),
        );
        let exported = engine
            .mix(&voice_path, &config, workdir.path())
            .await
            .unwrap();

        assert_eq!(
            exported.extension().unwrap().to_str().unwrap(),
            format.extension()
        );
        let len = std::fs::metadata(&exported).unwrap().len();
        assert!(len > 0, "{format:?} produced an empty file");
    }
}
