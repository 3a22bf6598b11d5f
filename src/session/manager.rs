//! Session lifecycle management
//!
//! Language switching is a full restart: the current session is dropped,
//! releasing its providers, before a new one is built for the target locale.
//! Only the target language code crosses the restart boundary.

use std::fmt;

use tokio::sync::mpsc;

use crate::locale::LocaleId;
use crate::provider::{EventSink, RecognitionEvent, SessionEvent};
use crate::{Error, Result};

use super::{Directive, Providers, Session, SessionSettings};

/// Builds the collaborators for a fresh session
pub trait SessionFactory: Send {
    /// Create providers bound to `locale`; capture events must go to `sink`
    ///
    /// # Errors
    ///
    /// Returns error if a provider cannot be created
    fn providers(&mut self, locale: LocaleId, sink: EventSink) -> Result<Providers>;
}

/// Language code handed across a restart (`"en"` or `"es"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartParameter {
    language: String,
}

impl RestartParameter {
    #[must_use]
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Locale to boot into; unknown codes fall back to English
    #[must_use]
    pub fn locale(&self) -> LocaleId {
        LocaleId::from_restart_parameter(Some(&self.language))
    }
}

impl From<LocaleId> for RestartParameter {
    fn from(locale: LocaleId) -> Self {
        Self::new(locale.code())
    }
}

impl fmt::Display for RestartParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)
    }
}

/// Owns the single live session and replaces it on language switch
pub struct SessionManager<F> {
    factory: F,
    settings: SessionSettings,
    tx: mpsc::UnboundedSender<SessionEvent>,
    session: Option<Session>,
    generation: u64,
}

impl<F: SessionFactory> SessionManager<F> {
    /// Create a manager with no live session
    ///
    /// Capture providers send their events through `tx`.
    pub fn new(
        factory: F,
        settings: SessionSettings,
        tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            factory,
            settings,
            tx,
            session: None,
            generation: 0,
        }
    }

    /// Discard any live session and open one from `parameter`
    ///
    /// # Errors
    ///
    /// Returns error if the factory cannot build providers; no session is
    /// live afterwards.
    pub fn restart(&mut self, parameter: &RestartParameter) -> Result<&mut Session> {
        if let Some(previous) = self.session.take() {
            tracing::debug!(
                generation = previous.generation(),
                restart = %parameter,
                "discarding session for restart"
            );
            drop(previous);
        }

        let locale = parameter.locale();
        self.generation += 1;
        let sink = EventSink::new(self.generation, self.tx.clone());
        let providers = self.factory.providers(locale, sink)?;
        let session = Session::open(self.generation, locale, providers, self.settings.clone());

        Ok(self.session.insert(session))
    }

    /// Replace the live session with one for `target`
    ///
    /// # Errors
    ///
    /// Returns error if the new session cannot be created
    pub fn switch_language(&mut self, target: LocaleId) -> Result<()> {
        tracing::info!(%target, "switching language");
        self.restart(&RestartParameter::from(target))?;
        Ok(())
    }

    /// Route a provider event to the live session
    ///
    /// Events from a discarded session are dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the event triggers a language switch that fails
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!(generation = event.generation, "no live session, event dropped");
            return Ok(());
        };

        if event.generation != session.generation() {
            tracing::debug!(
                generation = event.generation,
                live = session.generation(),
                "stale event dropped"
            );
            return Ok(());
        }

        self.handle(event.event)
    }

    fn handle(&mut self, event: RecognitionEvent) -> Result<()> {
        let directive = self.session_mut()?.handle_event(event);
        match directive {
            Some(Directive::SwitchLanguage(target)) => self.switch_language(target),
            None => Ok(()),
        }
    }

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The live session
    ///
    /// # Errors
    ///
    /// Returns error if no session is live
    pub fn session_mut(&mut self) -> Result<&mut Session> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::Session("no live session".to_string()))
    }

    /// Release the live session and its providers
    pub fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            drop(session);
        }
    }
}
