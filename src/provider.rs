//! Contracts for the external capabilities a session drives
//!
//! Speech capture, speech output, navigation and notification are owned by
//! the session as trait objects. Capture callbacks are delivered as
//! [`RecognitionEvent`] values through an [`EventSink`] rather than invoked
//! on the session directly.

use std::fmt;

use tokio::sync::mpsc;

use crate::locale::{LocaleId, LocaleProfile};
use crate::Result;

/// Maximum number of candidate transcripts requested from the recognizer
pub const DEFAULT_MAX_RESULTS: u8 = 3;

/// Recognition error codes reported by a capture provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecognitionError {
    Audio,
    Client,
    InsufficientPermissions,
    Network,
    NetworkTimeout,
    NoMatch,
    RecognizerBusy,
    Server,
    SpeechTimeout,
    Unknown,
}

impl RecognitionError {
    pub const ALL: [Self; 10] = [
        Self::Audio,
        Self::Client,
        Self::InsufficientPermissions,
        Self::Network,
        Self::NetworkTimeout,
        Self::NoMatch,
        Self::RecognizerBusy,
        Self::Server,
        Self::SpeechTimeout,
        Self::Unknown,
    ];
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Audio => "audio",
            Self::Client => "client",
            Self::InsufficientPermissions => "insufficient-permission",
            Self::Network => "network",
            Self::NetworkTimeout => "network-timeout",
            Self::NoMatch => "no-match",
            Self::RecognizerBusy => "recognizer-busy",
            Self::Server => "server",
            Self::SpeechTimeout => "speech-timeout",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Callbacks from a capture provider, in delivery order
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// Audio stream opened, ready for speech
    Ready,
    BeginningOfSpeech,
    RmsChanged(f32),
    BufferReceived(Vec<u8>),
    PartialResult(String),
    EndOfSpeech,
    /// Final candidates, highest confidence first
    Results(Vec<String>),
    Error(RecognitionError),
    /// Provider-specific event with no defined meaning
    Event(i32),
}

/// Language model hint for the recognizer
///
/// Commands are short queries, so only the web-search model is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageModel {
    WebSearch,
}

/// Parameters sent to the capture provider to start listening
///
/// Built once from a locale profile; a language switch builds a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub calling_package: String,
    pub language: &'static str,
    pub language_model: LanguageModel,
    pub max_results: u8,
}

impl RecognitionRequest {
    /// Build a request descriptor bound to `profile`
    #[must_use]
    pub fn for_profile(profile: &LocaleProfile, max_results: u8) -> Self {
        Self {
            calling_package: env!("CARGO_PKG_NAME").to_string(),
            language: profile.recognition_language_code(),
            language_model: LanguageModel::WebSearch,
            max_results: max_results.max(1),
        }
    }
}

/// Events tagged with the session generation that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub generation: u64,
    pub event: RecognitionEvent,
}

/// Sending half handed to a capture provider
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    #[must_use]
    pub const fn new(generation: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    /// Deliver an event; returns false once the receiver is gone
    pub fn send(&self, event: RecognitionEvent) -> bool {
        self.tx
            .send(SessionEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Speech capture capability
pub trait SpeechCapture: Send {
    /// Begin capturing with `request`; results arrive as events
    ///
    /// # Errors
    ///
    /// Returns error if the provider refuses the request outright
    fn start_capture(&mut self, request: &RecognitionRequest) -> Result<()>;

    /// Ask the provider to stop; completion is reported by a later event
    fn stop_capture(&mut self);

    /// Release the provider; no events are delivered afterwards
    fn destroy(&mut self);
}

/// Outcome of speech output initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    Success,
    UnsupportedLanguage,
    Failure,
}

/// Speech output capability
pub trait SpeechOutput: Send {
    fn initialize(&mut self, locale: LocaleId) -> InitStatus;

    /// Speak `text`; with `flush` any queued or playing utterance is discarded
    fn speak(&mut self, text: &str, flush: bool);

    fn set_pitch(&mut self, pitch: f32);

    fn set_rate(&mut self, rate: f32);

    fn stop(&mut self);

    fn shutdown(&mut self);
}

/// Navigation capability
pub trait Navigator: Send {
    /// Open `url`; returns false when nothing could handle it
    fn open_url(&mut self, url: &str) -> bool;
}

/// Lifecycle cues for whatever renders session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCue {
    Listening,
    SpeechDetected,
    Processing,
    Idle,
}

/// Notification capability
pub trait Notifier: Send {
    /// One-off message shown outside of speech
    fn notice(&mut self, text: &str);

    fn cue(&mut self, cue: SessionCue);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_binds_profile_language() {
        let request = RecognitionRequest::for_profile(LocaleId::Es.profile(), 3);
        assert_eq!(request.language, "es");
        assert_eq!(request.language_model, LanguageModel::WebSearch);
        assert_eq!(request.max_results, 3);
    }

    #[test]
    fn request_needs_at_least_one_result() {
        let request = RecognitionRequest::for_profile(LocaleId::EnUs.profile(), 0);
        assert_eq!(request.max_results, 1);
    }

    #[test]
    fn sink_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(7, tx);
        assert!(sink.send(RecognitionEvent::Ready));
        let received = rx.try_recv().unwrap();
        assert_eq!(received.generation, 7);
        assert_eq!(received.event, RecognitionEvent::Ready);

        drop(rx);
        assert!(!sink.send(RecognitionEvent::EndOfSpeech));
    }

    #[test]
    fn error_codes_display() {
        assert_eq!(RecognitionError::NetworkTimeout.to_string(), "network-timeout");
        assert_eq!(
            RecognitionError::InsufficientPermissions.to_string(),
            "insufficient-permission"
        );
    }
}
