//! Terminal providers for running without audio hardware
//!
//! Typed lines stand in for recognized speech and utterances are printed.

use std::sync::{Arc, Mutex, PoisonError};

use crate::Result;
use crate::locale::LocaleId;
use crate::provider::{
    EventSink, InitStatus, Navigator, Notifier, RecognitionError, RecognitionEvent,
    RecognitionRequest, SessionCue, SpeechCapture, SpeechOutput,
};

/// Line typed by the user, waiting for the next capture
#[derive(Debug, Clone, Default)]
pub struct TranscriptInbox {
    pending: Arc<Mutex<Option<String>>>,
}

impl TranscriptInbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line, replacing any line not yet consumed
    pub fn put(&self, line: impl Into<String>) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(line.into());
    }

    pub fn take(&self) -> Option<String> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Capture provider that recognizes whatever line is waiting in the inbox
pub struct ConsoleRecognizer {
    sink: EventSink,
    inbox: TranscriptInbox,
}

impl ConsoleRecognizer {
    #[must_use]
    pub const fn new(sink: EventSink, inbox: TranscriptInbox) -> Self {
        Self { sink, inbox }
    }
}

impl SpeechCapture for ConsoleRecognizer {
    fn start_capture(&mut self, _request: &RecognitionRequest) -> Result<()> {
        self.sink.send(RecognitionEvent::Ready);

        let Some(line) = self.inbox.take() else {
            self.sink
                .send(RecognitionEvent::Error(RecognitionError::SpeechTimeout));
            return Ok(());
        };

        self.sink.send(RecognitionEvent::BeginningOfSpeech);
        self.sink.send(RecognitionEvent::EndOfSpeech);

        let line = line.trim();
        let candidates = if line.is_empty() {
            Vec::new()
        } else {
            vec![line.to_string()]
        };
        self.sink.send(RecognitionEvent::Results(candidates));
        Ok(())
    }

    fn stop_capture(&mut self) {}

    fn destroy(&mut self) {
        self.inbox.take();
    }
}

/// Output provider that prints utterances
#[derive(Debug, Default)]
pub struct ConsoleSpeaker {
    enabled: bool,
}

impl ConsoleSpeaker {
    #[must_use]
    pub const fn new() -> Self {
        Self { enabled: false }
    }
}

impl SpeechOutput for ConsoleSpeaker {
    fn initialize(&mut self, _locale: LocaleId) -> InitStatus {
        self.enabled = true;
        InitStatus::Success
    }

    fn speak(&mut self, text: &str, _flush: bool) {
        if self.enabled {
            println!("assistant> {text}");
        }
    }

    fn set_pitch(&mut self, _pitch: f32) {}

    fn set_rate(&mut self, _rate: f32) {}

    fn stop(&mut self) {}

    fn shutdown(&mut self) {
        self.enabled = false;
    }
}

/// Notifier that prints notices and cue changes
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    show_cues: bool,
}

impl ConsoleNotifier {
    #[must_use]
    pub const fn new(show_cues: bool) -> Self {
        Self { show_cues }
    }
}

impl Notifier for ConsoleNotifier {
    fn notice(&mut self, text: &str) {
        eprintln!("[notice] {text}");
    }

    fn cue(&mut self, cue: SessionCue) {
        if !self.show_cues {
            return;
        }
        let label = match cue {
            SessionCue::Listening => "listening...",
            SessionCue::SpeechDetected => "hearing you",
            SessionCue::Processing => "thinking...",
            SessionCue::Idle => "idle (press Enter to talk, q to quit)",
        };
        eprintln!("[{label}]");
    }
}

/// Navigator that only reports the URL it would open
#[derive(Debug, Default)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn open_url(&mut self, url: &str) -> bool {
        println!("(open) {url}");
        true
    }
}
