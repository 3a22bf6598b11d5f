//! Voice Assistant - bilingual voice command assistant
//!
//! This library provides the pieces of a push-to-talk assistant:
//! - Locale profiles (keywords, utterances, date and time formats)
//! - Command classification of recognized phrases
//! - Recognition sessions driven by provider events
//! - Spoken feedback and command execution
//! - Microphone, cloud STT/TTS, and browser adapters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Daemon                          │
//! │   keyboard  │  provider events  │  Ctrl-C           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Session Manager                      │
//! │   one live Session, rebuilt on language switch       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Session                           │
//! │   Controller  │  Classifier  │  Synthesizer         │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Providers                          │
//! │   Capture  │  Speech output  │  Browser  │  Notices │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod browser;
pub mod command;
pub mod config;
pub mod daemon;
pub mod error;
pub mod locale;
pub mod provider;
pub mod session;
pub mod voice;

pub use browser::SystemBrowser;
pub use command::{Command, classify};
pub use config::Config;
pub use daemon::{Daemon, DefaultFactory};
pub use error::{Error, Result};
pub use locale::{LocaleId, LocaleProfile};
pub use provider::{
    EventSink, InitStatus, Navigator, Notifier, RecognitionError, RecognitionEvent,
    RecognitionRequest, SessionCue, SessionEvent, SpeechCapture, SpeechOutput,
};
pub use session::{
    Directive, Providers, RestartParameter, Session, SessionFactory, SessionManager,
    SessionSettings, SessionState,
};
