//! Configuration management for the voice assistant
//!
//! Values come from environment variables first, then an optional TOML file,
//! then built-in defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::provider::DEFAULT_MAX_RESULTS;
use crate::session::{DEFAULT_URL, RestartParameter, SessionSettings};
use crate::{Error, Result};

/// Longest accepted trailing silence
const MAX_SILENCE_MS: u64 = 60_000;

/// Longest accepted wait for speech to begin
const MAX_SPEECH_TIMEOUT_SECS: u64 = 300;

/// Voice assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Language to boot into
    pub language: RestartParameter,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Browser configuration
    pub browser: BrowserConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// File the values were read from, if any
    pub source: Option<PathBuf>,
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttProvider {
    Whisper,
    Deepgram,
}

/// Voice processing configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    /// Enable microphone and speaker; off means console text mode
    pub enabled: bool,

    /// STT backend
    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// Synthesis pitch multiplier (0.1 to 4.0)
    ///
    /// Accepted for every backend, but OpenAI TTS has no pitch control.
    pub pitch: f32,

    /// Synthesis rate multiplier (0.25 to 4.0)
    pub rate: f32,

    /// Candidate transcripts requested per utterance
    pub max_results: u8,

    /// Give up when no speech starts within this many seconds
    pub speech_timeout_secs: u64,

    /// Trailing silence that ends an utterance
    pub silence_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_provider: SttProvider::Whisper,
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            pitch: 1.0,
            rate: 1.0,
            max_results: DEFAULT_MAX_RESULTS,
            speech_timeout_secs: 5,
            silence_ms: 700,
        }
    }
}

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserConfig {
    /// Target for "open browser"
    pub default_url: String,

    /// Command used to open URLs; located automatically when unset
    pub opener: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_URL.to_string(),
            opener: None,
        }
    }
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for Whisper and TTS)
    pub openai: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("ApiKeys")
            .field("openai", &redact(&self.openai))
            .field("deepgram", &redact(&self.deepgram))
            .finish()
    }
}

/// On-disk representation; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    language: Option<String>,
    voice: FileVoice,
    browser: FileBrowser,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileVoice {
    enabled: Option<bool>,
    stt_provider: Option<SttProvider>,
    stt_model: Option<String>,
    tts_model: Option<String>,
    tts_voice: Option<String>,
    pitch: Option<f32>,
    rate: Option<f32>,
    max_results: Option<u8>,
    speech_timeout_secs: Option<u64>,
    silence_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileBrowser {
    default_url: Option<String>,
    opener: Option<String>,
}

/// Default config file location (`~/.config/assistant/config.toml` on Linux)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "omni", "assistant")
        .map(|d| d.config_dir().join("config.toml"))
}

impl Config {
    /// Load configuration
    ///
    /// `language` overrides the configured language (the restart parameter);
    /// `path` overrides the config file location.
    ///
    /// # Errors
    ///
    /// Returns error if the config file cannot be parsed or holds invalid values
    pub fn load(language: Option<&str>, path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("ASSISTANT_CONFIG").ok().map(PathBuf::from))
            .or_else(default_config_path);

        let (file, source) = match path {
            Some(p) if p.exists() => (Self::read_file(&p)?, Some(p)),
            Some(p) => {
                tracing::debug!(path = %p.display(), "no config file, using defaults");
                (FileConfig::default(), None)
            }
            None => (FileConfig::default(), None),
        };

        let mut config = Self::from_file(file, source)?;

        if let Ok(lang) = std::env::var("ASSISTANT_LANGUAGE") {
            config.language = RestartParameter::new(lang);
        }
        if let Some(lang) = language {
            config.language = RestartParameter::new(lang);
        }

        if let Ok(model) = std::env::var("ASSISTANT_STT_MODEL") {
            config.voice.stt_model = model;
        }
        if let Ok(model) = std::env::var("ASSISTANT_TTS_MODEL") {
            config.voice.tts_model = model;
        }

        config.api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok(),
            deepgram: std::env::var("DEEPGRAM_API_KEY").ok(),
        };

        Ok(config)
    }

    /// Parse a TOML config file
    fn read_file(path: &Path) -> Result<FileConfig> {
        let content = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(file)
    }

    /// Apply file values over defaults and validate
    fn from_file(file: FileConfig, source: Option<PathBuf>) -> Result<Self> {
        let defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            enabled: file.voice.enabled.unwrap_or(defaults.enabled),
            stt_provider: file.voice.stt_provider.unwrap_or(defaults.stt_provider),
            stt_model: file.voice.stt_model.unwrap_or(defaults.stt_model),
            tts_model: file.voice.tts_model.unwrap_or(defaults.tts_model),
            tts_voice: file.voice.tts_voice.unwrap_or(defaults.tts_voice),
            pitch: file.voice.pitch.unwrap_or(defaults.pitch),
            rate: file.voice.rate.unwrap_or(defaults.rate),
            max_results: file.voice.max_results.unwrap_or(defaults.max_results),
            speech_timeout_secs: file
                .voice
                .speech_timeout_secs
                .unwrap_or(defaults.speech_timeout_secs),
            silence_ms: file.voice.silence_ms.unwrap_or(defaults.silence_ms),
        };

        if !(0.25..=4.0).contains(&voice.rate) {
            return Err(Error::Config(format!(
                "voice.rate must be between 0.25 and 4.0, got {}",
                voice.rate
            )));
        }
        if !(0.1..=4.0).contains(&voice.pitch) {
            return Err(Error::Config(format!(
                "voice.pitch must be between 0.1 and 4.0, got {}",
                voice.pitch
            )));
        }
        if voice.max_results == 0 {
            return Err(Error::Config("voice.max_results must be at least 1".to_string()));
        }
        if !(1..=MAX_SILENCE_MS).contains(&voice.silence_ms) {
            return Err(Error::Config(format!(
                "voice.silence_ms must be between 1 and {MAX_SILENCE_MS}, got {}",
                voice.silence_ms
            )));
        }
        if !(1..=MAX_SPEECH_TIMEOUT_SECS).contains(&voice.speech_timeout_secs) {
            return Err(Error::Config(format!(
                "voice.speech_timeout_secs must be between 1 and {MAX_SPEECH_TIMEOUT_SECS}, got {}",
                voice.speech_timeout_secs
            )));
        }

        let browser_defaults = BrowserConfig::default();
        let browser = BrowserConfig {
            default_url: file.browser.default_url.unwrap_or(browser_defaults.default_url),
            opener: file.browser.opener,
        };

        Ok(Self {
            language: RestartParameter::new(file.language.unwrap_or_else(|| "en".to_string())),
            voice,
            browser,
            api_keys: ApiKeys::default(),
            source,
        })
    }

    /// Settings shared by every session
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_results: self.voice.max_results,
            pitch: self.voice.pitch,
            rate: self.voice.rate,
            default_url: self.browser.default_url.clone(),
        }
    }
}
