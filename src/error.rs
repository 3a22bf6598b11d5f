//! Error types for the voice assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Locale profile error (unknown code, incomplete keyword table)
    #[error("locale error: {0}")]
    Locale(String),

    /// Session lifecycle error
    #[error("session error: {0}")]
    Session(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Speech-to-text API rejected the request
    #[error("STT API error {status}: {body}")]
    SttStatus {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Browser navigation error
    #[error("navigation error: {0}")]
    Navigation(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
