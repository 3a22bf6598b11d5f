//! Daemon - the interactive assistant loop
//!
//! Owns the session manager and feeds it provider events, keyboard input, and
//! the shutdown signal.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::browser::SystemBrowser;
use crate::locale::LocaleId;
use crate::provider::{EventSink, Navigator, SessionEvent};
use crate::session::{Providers, SessionFactory, SessionManager, SessionState};
use crate::voice::{
    CloudSpeaker, ConsoleNavigator, ConsoleNotifier, ConsoleRecognizer, ConsoleSpeaker,
    EndpointSettings, MicRecognizer, Microphone, SpeechToText, TextToSpeech, TranscriptInbox,
};
use crate::{Config, Result};

/// What the loop should do after a line of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Continue,
    Quit,
}

/// How keyboard lines reach the session
#[derive(Debug, Clone)]
pub enum InputMode {
    /// Enter toggles listening
    Voice,
    /// Each line is handed to the console recognizer as a transcript
    Text(TranscriptInbox),
}

impl InputMode {
    /// Typed commands wait until the previous one has been answered
    fn accepts_input<F: SessionFactory>(&self, manager: &SessionManager<F>) -> bool {
        match self {
            Self::Voice => true,
            Self::Text(_) => manager
                .session()
                .is_some_and(|session| session.state() == SessionState::Idle),
        }
    }
}

/// The assistant daemon
pub struct Daemon {
    config: Config,
    text_mode: bool,
}

impl Daemon {
    /// Create a daemon; `text_mode` replaces microphone and speakers with the terminal
    #[must_use]
    pub fn new(config: Config, text_mode: bool) -> Self {
        let text_mode = text_mode || !config.voice.enabled;
        Self { config, text_mode }
    }

    /// Run until `q`, end of input, or Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if the first session cannot be created
    #[allow(clippy::future_not_send)]
    pub async fn run(self) -> Result<()> {
        let (tx, mut events) = mpsc::unbounded_channel();

        let (factory, mode) = if self.text_mode {
            let inbox = TranscriptInbox::new();
            (
                DefaultFactory::console(&self.config, inbox.clone()),
                InputMode::Text(inbox),
            )
        } else {
            (
                DefaultFactory::voice(&self.config, Handle::current())?,
                InputMode::Voice,
            )
        };

        let mut manager = SessionManager::new(factory, self.config.session_settings(), tx);
        let session = manager.restart(&self.config.language)?;

        if !self.text_mode {
            if let Err(e) = Microphone::open() {
                tracing::warn!(error = %e, "microphone unavailable");
                session.permission_denied();
            }
        }

        tracing::info!(
            locale = %session.locale(),
            text_mode = self.text_mode,
            "assistant ready"
        );
        if self.text_mode {
            println!("Type a command (q to quit).");
        } else {
            println!("Press Enter to talk, Enter again to stop, q to quit.");
        }

        let outcome = drive(
            &mut manager,
            &mut events,
            BufReader::new(tokio::io::stdin()),
            &mode,
            async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            },
        )
        .await;

        manager.shutdown();
        outcome
    }
}

/// Feed provider events and input lines to `manager` until quit, end of
/// input, or `shutdown` resolves
///
/// Pending provider events are always handled before the next line is read.
///
/// # Errors
///
/// Returns error if a line arrives while no session is live
#[allow(clippy::future_not_send)]
pub async fn drive<F, R, S>(
    manager: &mut SessionManager<F>,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    input: R,
    mode: &InputMode,
    shutdown: S,
) -> Result<()>
where
    F: SessionFactory,
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        let accepting = mode.accepts_input(manager);

        tokio::select! {
            biased;

            Some(event) = events.recv() => {
                if let Err(e) = manager.dispatch(event) {
                    tracing::error!(error = %e, "session restart failed");
                    break;
                }
            }
            () = &mut shutdown => {
                tracing::info!("shutdown requested");
                break;
            }
            line = lines.next_line(), if accepting => match line {
                Ok(Some(line)) => {
                    if handle_line(manager, mode, line.trim())? == Input::Quit {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!("input closed");
                    drain(manager, events);
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to read input");
                    break;
                }
            },
        }
    }

    Ok(())
}

/// Handle events already queued when input ends
fn drain<F: SessionFactory>(
    manager: &mut SessionManager<F>,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
) {
    while let Ok(event) = events.try_recv() {
        if let Err(e) = manager.dispatch(event) {
            tracing::error!(error = %e, "session restart failed");
            return;
        }
    }
}

fn handle_line<F: SessionFactory>(
    manager: &mut SessionManager<F>,
    mode: &InputMode,
    line: &str,
) -> Result<Input> {
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Ok(Input::Quit);
    }

    let session = manager.session_mut()?;
    match mode {
        InputMode::Text(_) if line.is_empty() => {}
        InputMode::Text(inbox) => {
            inbox.put(line);
            session.start();
        }
        InputMode::Voice => session.toggle(),
    }

    Ok(Input::Continue)
}

/// Which capture and output providers a session gets
enum Backend {
    Voice {
        transcriber: Arc<SpeechToText>,
        tts: Option<Arc<TextToSpeech>>,
        runtime: Handle,
        endpoint: EndpointSettings,
    },
    Console {
        inbox: TranscriptInbox,
    },
}

/// Builds providers from configuration
pub struct DefaultFactory {
    backend: Backend,
    opener: Option<String>,
}

impl DefaultFactory {
    /// Microphone, cloud STT and TTS, and the system browser
    ///
    /// # Errors
    ///
    /// Returns error if the STT backend has no API key
    pub fn voice(config: &Config, runtime: Handle) -> Result<Self> {
        let stt_key = match config.voice.stt_provider {
            crate::config::SttProvider::Whisper => config.api_keys.openai.clone(),
            crate::config::SttProvider::Deepgram => config.api_keys.deepgram.clone(),
        };
        let transcriber = SpeechToText::new(
            config.voice.stt_provider,
            stt_key,
            config.voice.stt_model.clone(),
        )?;

        let tts = match TextToSpeech::new_openai(
            config.api_keys.openai.clone(),
            config.voice.tts_voice.clone(),
            config.voice.tts_model.clone(),
        ) {
            Ok(tts) => Some(Arc::new(tts)),
            Err(e) => {
                tracing::warn!(error = %e, "speech output unavailable");
                None
            }
        };

        Ok(Self {
            backend: Backend::Voice {
                transcriber: Arc::new(transcriber),
                tts,
                runtime,
                endpoint: EndpointSettings {
                    silence_ms: config.voice.silence_ms,
                    speech_timeout_secs: config.voice.speech_timeout_secs,
                },
            },
            opener: config.browser.opener.clone(),
        })
    }

    /// Typed input and printed output
    #[must_use]
    pub fn console(config: &Config, inbox: TranscriptInbox) -> Self {
        Self {
            backend: Backend::Console { inbox },
            opener: config.browser.opener.clone(),
        }
    }

    fn navigator(&self) -> Box<dyn Navigator> {
        match SystemBrowser::new(self.opener.as_deref()) {
            Ok(browser) => Box::new(browser),
            Err(e) => {
                tracing::warn!(error = %e, "printing urls instead of opening them");
                Box::new(ConsoleNavigator)
            }
        }
    }
}

impl SessionFactory for DefaultFactory {
    fn providers(&mut self, locale: LocaleId, sink: EventSink) -> Result<Providers> {
        tracing::debug!(%locale, generation = sink.generation(), "building providers");
        let navigator = self.navigator();

        let providers = match &self.backend {
            Backend::Voice {
                transcriber,
                tts,
                runtime,
                endpoint,
            } => Providers {
                capture: Box::new(MicRecognizer::new(
                    sink,
                    Arc::clone(transcriber),
                    runtime.clone(),
                    *endpoint,
                )),
                output: Box::new(CloudSpeaker::new(tts.clone(), runtime.clone())),
                navigator,
                notifier: Box::new(ConsoleNotifier::new(true)),
            },
            Backend::Console { inbox } => Providers {
                capture: Box::new(ConsoleRecognizer::new(sink, inbox.clone())),
                output: Box::new(ConsoleSpeaker::new()),
                navigator,
                notifier: Box::new(ConsoleNotifier::new(false)),
            },
        };

        Ok(providers)
    }
}
