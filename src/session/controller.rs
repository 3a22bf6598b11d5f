//! Recognition session controller
//!
//! Owns the capture lifecycle state machine. The controller is the only
//! writer of [`SessionState`]; every transition is triggered by a user
//! request (`start`) or a provider event.

use std::fmt;

use crate::command::{Command, classify};
use crate::locale::LocaleProfile;
use crate::provider::{
    RecognitionError, RecognitionEvent, RecognitionRequest, SessionCue, SpeechCapture,
};

/// Capture lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    /// Between end of speech and the final result
    Processing,
    Error {
        code: RecognitionError,
        recoverable: bool,
    },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
            Self::Processing => write!(f, "processing"),
            Self::Error { code, .. } => write!(f, "error ({code})"),
        }
    }
}

/// What the session should do after the controller handled an event
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Nothing beyond logging
    None,
    /// Forward a lifecycle cue to the notifier
    Cue(SessionCue),
    /// A final result was classified
    Command(Command),
    /// A final result carried no candidates
    NoMatch,
    /// Recognition failed; the controller is back in `Idle`
    Failed(RecognitionError),
}

/// Why `start` was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejected {
    /// A capture request is already outstanding
    Busy(SessionState),
    /// The provider refused the request; reported as a client error
    Provider,
}

/// State machine driving one capture provider
pub struct RecognitionController {
    state: SessionState,
    profile: &'static LocaleProfile,
    request: RecognitionRequest,
    capture: Box<dyn SpeechCapture>,
}

impl RecognitionController {
    /// Create a controller in `Idle` with a request descriptor built from `profile`
    #[must_use]
    pub fn new(
        profile: &'static LocaleProfile,
        capture: Box<dyn SpeechCapture>,
        max_results: u8,
    ) -> Self {
        let request = RecognitionRequest::for_profile(profile, max_results);
        Self {
            state: SessionState::Idle,
            profile,
            request,
            capture,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn request(&self) -> &RecognitionRequest {
        &self.request
    }

    /// Whether a capture request is outstanding
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Listening | SessionState::Processing)
    }

    /// Begin listening. The caller has already confirmed microphone access.
    ///
    /// # Errors
    ///
    /// Returns [`StartRejected::Busy`] without side effects unless `Idle`, and
    /// [`StartRejected::Provider`] if the provider refused the request, in
    /// which case the controller has already returned to `Idle`.
    pub fn start(&mut self) -> Result<(), StartRejected> {
        if self.state != SessionState::Idle {
            tracing::debug!(state = %self.state, "start rejected");
            return Err(StartRejected::Busy(self.state));
        }

        self.transition(SessionState::Listening);
        if let Err(e) = self.capture.start_capture(&self.request) {
            tracing::warn!(error = %e, "capture provider refused start");
            self.fail(RecognitionError::Client);
            return Err(StartRejected::Provider);
        }

        Ok(())
    }

    /// Ask the provider to stop. The state changes only when the provider
    /// reports back.
    pub fn stop(&mut self) {
        if self.is_active() {
            tracing::debug!(state = %self.state, "requesting capture stop");
            self.capture.stop_capture();
        } else {
            tracing::debug!(state = %self.state, "stop ignored, not capturing");
        }
    }

    /// Apply a provider event
    pub fn handle(&mut self, event: RecognitionEvent) -> Reaction {
        match (self.state, event) {
            (SessionState::Listening, RecognitionEvent::Ready) => {
                tracing::debug!("ready for speech");
                Reaction::Cue(SessionCue::Listening)
            }
            (SessionState::Listening, RecognitionEvent::BeginningOfSpeech) => {
                tracing::debug!("beginning of speech");
                Reaction::Cue(SessionCue::SpeechDetected)
            }
            (_, RecognitionEvent::RmsChanged(level)) => {
                tracing::trace!(level, "rms changed");
                Reaction::None
            }
            (_, RecognitionEvent::BufferReceived(bytes)) => {
                tracing::trace!(bytes = bytes.len(), "buffer received");
                Reaction::None
            }
            (_, RecognitionEvent::PartialResult(text)) => {
                tracing::debug!(text = %text, "partial result");
                Reaction::None
            }
            (_, RecognitionEvent::Event(kind)) => {
                tracing::debug!(kind, "provider event");
                Reaction::None
            }
            (SessionState::Listening, RecognitionEvent::EndOfSpeech) => {
                self.transition(SessionState::Processing);
                Reaction::Cue(SessionCue::Processing)
            }
            (
                SessionState::Listening | SessionState::Processing,
                RecognitionEvent::Results(candidates),
            ) => self.finish(&candidates),
            (
                SessionState::Listening | SessionState::Processing,
                RecognitionEvent::Error(code),
            ) => {
                self.fail(code);
                Reaction::Failed(code)
            }
            (state, event) => {
                tracing::debug!(%state, ?event, "event ignored in current state");
                Reaction::None
            }
        }
    }

    fn finish(&mut self, candidates: &[String]) -> Reaction {
        if self.state == SessionState::Listening {
            tracing::debug!("results without end of speech");
        }
        self.transition(SessionState::Idle);

        let Some(best) = candidates.first() else {
            tracing::info!("recognition returned no candidates");
            return Reaction::NoMatch;
        };

        let text = best.to_lowercase();
        let command = classify(&text, self.profile);
        tracing::info!(text = %text, %command, alternatives = candidates.len(), "recognized command");
        Reaction::Command(command)
    }

    fn fail(&mut self, code: RecognitionError) {
        self.transition(SessionState::Error {
            code,
            recoverable: true,
        });
        tracing::warn!(%code, "recognition error");
        self.transition(SessionState::Idle);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = %self.state, to = %next, "session transition");
        self.state = next;
    }
}

impl Drop for RecognitionController {
    fn drop(&mut self) {
        self.capture.destroy();
        tracing::debug!(locale = %self.profile.id(), "capture provider released");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::locale::LocaleId;
    use crate::{Error, Result};

    #[derive(Default)]
    struct Calls {
        starts: Vec<RecognitionRequest>,
        stops: usize,
        destroyed: bool,
    }

    struct FakeCapture {
        calls: Arc<Mutex<Calls>>,
        refuse: bool,
    }

    impl SpeechCapture for FakeCapture {
        fn start_capture(&mut self, request: &RecognitionRequest) -> Result<()> {
            if self.refuse {
                return Err(Error::Audio("busy".to_string()));
            }
            self.calls.lock().unwrap().starts.push(request.clone());
            Ok(())
        }

        fn stop_capture(&mut self) {
            self.calls.lock().unwrap().stops += 1;
        }

        fn destroy(&mut self) {
            self.calls.lock().unwrap().destroyed = true;
        }
    }

    fn controller(refuse: bool) -> (RecognitionController, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let capture = FakeCapture {
            calls: Arc::clone(&calls),
            refuse,
        };
        let profile = LocaleId::EnUs.profile();
        (
            RecognitionController::new(profile, Box::new(capture), 3),
            calls,
        )
    }

    #[test]
    fn full_cycle() {
        let (mut c, calls) = controller(false);
        assert_eq!(c.state(), SessionState::Idle);

        c.start().unwrap();
        assert_eq!(c.state(), SessionState::Listening);
        assert_eq!(calls.lock().unwrap().starts[0].language, "en");

        assert_eq!(
            c.handle(RecognitionEvent::Ready),
            Reaction::Cue(SessionCue::Listening)
        );
        assert_eq!(c.state(), SessionState::Listening);

        c.handle(RecognitionEvent::PartialResult("what".to_string()));
        assert_eq!(c.state(), SessionState::Listening);

        c.handle(RecognitionEvent::EndOfSpeech);
        assert_eq!(c.state(), SessionState::Processing);

        let reaction = c.handle(RecognitionEvent::Results(vec![
            "What Time Is It".to_string(),
            "what tim is it".to_string(),
        ]));
        assert_eq!(reaction, Reaction::Command(Command::TellTime));
        assert_eq!(c.state(), SessionState::Idle);
    }

    #[test]
    fn start_rejected_while_active() {
        let (mut c, calls) = controller(false);
        c.start().unwrap();
        assert_eq!(
            c.start(),
            Err(StartRejected::Busy(SessionState::Listening))
        );
        c.handle(RecognitionEvent::EndOfSpeech);
        assert_eq!(
            c.start(),
            Err(StartRejected::Busy(SessionState::Processing))
        );
        assert_eq!(calls.lock().unwrap().starts.len(), 1);
    }

    #[test]
    fn stop_does_not_transition() {
        let (mut c, calls) = controller(false);
        c.stop();
        assert_eq!(calls.lock().unwrap().stops, 0);

        c.start().unwrap();
        c.stop();
        assert_eq!(c.state(), SessionState::Listening);
        assert_eq!(calls.lock().unwrap().stops, 1);
    }

    #[test]
    fn empty_results_return_to_idle() {
        let (mut c, _) = controller(false);
        c.start().unwrap();
        c.handle(RecognitionEvent::EndOfSpeech);
        assert_eq!(c.handle(RecognitionEvent::Results(vec![])), Reaction::NoMatch);
        assert_eq!(c.state(), SessionState::Idle);
    }

    #[test]
    fn errors_always_recover() {
        for code in RecognitionError::ALL {
            let (mut c, _) = controller(false);
            c.start().unwrap();
            assert_eq!(c.handle(RecognitionEvent::Error(code)), Reaction::Failed(code));
            assert_eq!(c.state(), SessionState::Idle);

            c.start().unwrap();
            c.handle(RecognitionEvent::EndOfSpeech);
            assert_eq!(c.handle(RecognitionEvent::Error(code)), Reaction::Failed(code));
            assert_eq!(c.state(), SessionState::Idle);
        }
    }

    #[test]
    fn stale_events_ignored_when_idle() {
        let (mut c, _) = controller(false);
        assert_eq!(c.handle(RecognitionEvent::EndOfSpeech), Reaction::None);
        assert_eq!(
            c.handle(RecognitionEvent::Results(vec!["open browser".to_string()])),
            Reaction::None
        );
        assert_eq!(
            c.handle(RecognitionEvent::Error(RecognitionError::Server)),
            Reaction::None
        );
        assert_eq!(c.state(), SessionState::Idle);
    }

    #[test]
    fn results_while_listening_finish_capture() {
        let (mut c, _) = controller(false);
        c.start().unwrap();
        let reaction = c.handle(RecognitionEvent::Results(vec!["open browser".to_string()]));
        assert_eq!(reaction, Reaction::Command(Command::OpenBrowser));
        assert_eq!(c.state(), SessionState::Idle);
    }

    #[test]
    fn provider_refusal_is_client_error() {
        let (mut c, _) = controller(true);
        assert_eq!(c.start(), Err(StartRejected::Provider));
        assert_eq!(c.state(), SessionState::Idle);
    }

    #[test]
    fn drop_destroys_capture() {
        let (c, calls) = controller(false);
        drop(c);
        assert!(calls.lock().unwrap().destroyed);
    }
}
