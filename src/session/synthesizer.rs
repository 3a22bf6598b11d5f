//! Spoken feedback
//!
//! Every utterance replaces whatever is playing. If speech output cannot be
//! initialized for the locale the synthesizer stays silent for the rest of
//! the session.

use std::fmt;

use chrono::{DateTime, TimeZone};

use crate::command::Command;
use crate::locale::{LocaleId, LocaleProfile};
use crate::provider::{InitStatus, Navigator, Notifier, RecognitionError, SpeechOutput};

use super::SessionSettings;

/// Speech feedback bound to one locale profile
pub struct FeedbackSynthesizer {
    profile: &'static LocaleProfile,
    output: Option<Box<dyn SpeechOutput>>,
}

impl FeedbackSynthesizer {
    /// Wrap an uninitialized speech output
    #[must_use]
    pub fn new(profile: &'static LocaleProfile, output: Box<dyn SpeechOutput>) -> Self {
        Self {
            profile,
            output: Some(output),
        }
    }

    /// Initialize speech output for the profile's locale
    ///
    /// On success the configured pitch and rate are applied and the welcome
    /// utterance is spoken. An unsupported language is reported once through
    /// `notifier`; any failure disables speech for this synthesizer.
    pub fn initialize(&mut self, settings: &SessionSettings, notifier: &mut dyn Notifier) -> InitStatus {
        let Some(output) = self.output.as_mut() else {
            return InitStatus::Failure;
        };

        let locale = self.profile.id();
        let status = output.initialize(locale);
        match status {
            InitStatus::Success => {
                output.set_pitch(settings.pitch);
                output.set_rate(settings.rate);
                tracing::debug!(%locale, "speech output ready");
                self.speak(self.profile.utterances().welcome);
            }
            InitStatus::UnsupportedLanguage => {
                tracing::warn!(%locale, "speech output does not support locale, speech disabled");
                notifier.notice(self.profile.utterances().language_unsupported);
                self.disable();
            }
            InitStatus::Failure => {
                tracing::warn!(%locale, "speech output failed to initialize, speech disabled");
                self.disable();
            }
        }

        status
    }

    /// Whether utterances reach the speech output
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.output.is_some()
    }

    /// Speak `text`, discarding anything queued or playing
    pub fn speak(&mut self, text: &str) {
        match self.output.as_mut() {
            Some(output) => {
                tracing::debug!(text, "speaking");
                output.speak(text, true);
            }
            None => tracing::debug!(text, "speech disabled, utterance dropped"),
        }
    }

    /// Execute `command` and speak its feedback
    ///
    /// Returns the target locale when the command asks for a language switch;
    /// the caller owns the restart and nothing is spoken here.
    pub fn respond<Tz>(
        &mut self,
        command: &Command,
        navigator: &mut dyn Navigator,
        settings: &SessionSettings,
        now: &DateTime<Tz>,
    ) -> Option<LocaleId>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match command {
            Command::OpenBrowser => {
                // Confirmation is spoken before the outcome is known.
                self.speak(self.profile.utterances().opening_browser);
                if !navigator.open_url(&settings.default_url) {
                    tracing::warn!(url = %settings.default_url, "failed to open browser");
                }
                None
            }
            Command::OpenUrl { url } => {
                if navigator.open_url(url) {
                    self.speak(self.profile.utterances().opening_browser);
                } else {
                    tracing::warn!(url = %url, "failed to open url");
                }
                None
            }
            Command::TellTime => {
                let text = self.profile.time_utterance(now);
                self.speak(&text);
                None
            }
            Command::TellDate => {
                let text = self.profile.date_utterance(now);
                self.speak(&text);
                None
            }
            Command::SwitchLanguage { target } => Some(*target),
            Command::Unrecognized => {
                self.no_match();
                None
            }
        }
    }

    /// Fallback for unmatched or empty recognition
    pub fn no_match(&mut self) {
        self.speak(self.profile.utterances().no_match);
    }

    /// Fallback for a recognition error, worded by error category
    pub fn recognition_failed(&mut self, code: RecognitionError) {
        self.speak(self.profile.error_category(code));
    }

    pub fn permission_denied(&mut self) {
        self.speak(self.profile.utterances().permission_denied);
    }

    fn disable(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.shutdown();
        }
    }
}

impl Drop for FeedbackSynthesizer {
    fn drop(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.stop();
            output.shutdown();
            tracing::debug!(locale = %self.profile.id(), "speech output released");
        }
    }
}
