pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod podcast;
pub mod synthesis;
pub mod transport;

// Re-export commonly used items for convenience
pub use config::{AudioConfig, BackgroundMusic, OutputFormat, Voice, VoiceEmotion};
pub use error::{Error, Result};
pub use pipeline::{GeneratedAudio, PipelineContext, generate_audio};
pub use podcast::Podcast;
pub use synthesis::SynthesisClient;
pub use transport::Fetcher;
