//! Voice command session
//!
//! A session pairs one locale profile with a recognition controller, a
//! feedback synthesizer and the collaborators they drive. Sessions are never
//! reconfigured; the [`SessionManager`] replaces them wholesale.

mod controller;
mod manager;
mod synthesizer;

pub use controller::{Reaction, RecognitionController, SessionState, StartRejected};
pub use manager::{RestartParameter, SessionFactory, SessionManager};
pub use synthesizer::FeedbackSynthesizer;

use crate::locale::{LocaleId, LocaleProfile};
use crate::provider::{
    DEFAULT_MAX_RESULTS, Navigator, Notifier, RecognitionError, RecognitionEvent,
    RecognitionRequest, SessionCue, SpeechCapture, SpeechOutput,
};

/// Browser target when none is spoken
pub const DEFAULT_URL: &str = "google.com";

/// Settings applied to every session the manager creates
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub max_results: u8,
    pub pitch: f32,
    pub rate: f32,
    pub default_url: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            pitch: 1.0,
            rate: 1.0,
            default_url: DEFAULT_URL.to_string(),
        }
    }
}

/// Collaborators owned by a single session
pub struct Providers {
    pub capture: Box<dyn SpeechCapture>,
    pub output: Box<dyn SpeechOutput>,
    pub navigator: Box<dyn Navigator>,
    pub notifier: Box<dyn Notifier>,
}

/// Work the session cannot do itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    SwitchLanguage(LocaleId),
}

/// A live recognition and feedback session
pub struct Session {
    generation: u64,
    profile: &'static LocaleProfile,
    controller: RecognitionController,
    synthesizer: FeedbackSynthesizer,
    navigator: Box<dyn Navigator>,
    notifier: Box<dyn Notifier>,
    settings: SessionSettings,
}

impl Session {
    /// Build a session for `locale` and initialize its speech output
    #[must_use]
    pub fn open(
        generation: u64,
        locale: LocaleId,
        providers: Providers,
        settings: SessionSettings,
    ) -> Self {
        let profile = locale.profile();
        let Providers {
            capture,
            output,
            navigator,
            mut notifier,
        } = providers;

        let controller = RecognitionController::new(profile, capture, settings.max_results);
        let mut synthesizer = FeedbackSynthesizer::new(profile, output);
        synthesizer.initialize(&settings, notifier.as_mut());

        tracing::info!(generation, %locale, "session opened");

        Self {
            generation,
            profile,
            controller,
            synthesizer,
            navigator,
            notifier,
            settings,
        }
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn locale(&self) -> LocaleId {
        self.profile.id()
    }

    #[must_use]
    pub const fn profile(&self) -> &'static LocaleProfile {
        self.profile
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.controller.state()
    }

    #[must_use]
    pub const fn request(&self) -> &RecognitionRequest {
        self.controller.request()
    }

    #[must_use]
    pub const fn speech_enabled(&self) -> bool {
        self.synthesizer.is_enabled()
    }

    /// Start listening; ignored while a capture is outstanding
    pub fn start(&mut self) {
        match self.controller.start() {
            Ok(()) => {}
            Err(StartRejected::Busy(state)) => {
                tracing::debug!(%state, "already capturing");
            }
            Err(StartRejected::Provider) => {
                self.notifier.cue(SessionCue::Idle);
                self.synthesizer.recognition_failed(RecognitionError::Client);
            }
        }
    }

    /// Request the provider stop capturing
    pub fn stop(&mut self) {
        self.controller.stop();
    }

    /// Start when idle, otherwise stop
    pub fn toggle(&mut self) {
        if self.controller.is_active() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Tell the user microphone access was refused
    pub fn permission_denied(&mut self) {
        self.synthesizer.permission_denied();
    }

    /// Apply a provider event and run the resulting feedback
    pub fn handle_event(&mut self, event: RecognitionEvent) -> Option<Directive> {
        match self.controller.handle(event) {
            Reaction::None => None,
            Reaction::Cue(cue) => {
                self.notifier.cue(cue);
                None
            }
            Reaction::Command(command) => {
                self.notifier.cue(SessionCue::Idle);
                let now = chrono::Local::now();
                self.synthesizer
                    .respond(&command, self.navigator.as_mut(), &self.settings, &now)
                    .map(Directive::SwitchLanguage)
            }
            Reaction::NoMatch => {
                self.notifier.cue(SessionCue::Idle);
                self.synthesizer.no_match();
                None
            }
            Reaction::Failed(code) => {
                self.notifier.cue(SessionCue::Idle);
                self.synthesizer.recognition_failed(code);
                None
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::info!(generation = self.generation, locale = %self.profile.id(), "session closed");
    }
}
