//! Shared test utilities
//!
//! Recording fakes for every provider trait, and a factory that hands them
//! out while counting how many capture providers are still alive.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use voice_assistant::{
    EventSink, InitStatus, LocaleId, Navigator, Notifier, Providers, RecognitionEvent,
    RecognitionRequest, Result, SessionCue, SessionEvent, SessionFactory, SessionManager,
    SessionSettings, SpeechCapture, SpeechOutput,
};

/// Everything the fakes observed, across sessions
#[derive(Debug, Default)]
pub struct Log {
    /// `(locale, text)` for every utterance spoken
    pub spoken: Vec<(LocaleId, String)>,
    pub opened: Vec<String>,
    pub notices: Vec<String>,
    pub cues: Vec<SessionCue>,
    pub starts: Vec<RecognitionRequest>,
    pub stops: usize,
    pub output_shutdowns: usize,
}

/// Shared handle to the recording log
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Log>>,
    live_captures: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn log(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap()
    }

    /// Texts spoken so far, oldest first
    pub fn spoken(&self) -> Vec<String> {
        self.log().spoken.iter().map(|(_, text)| text.clone()).collect()
    }

    pub fn last_spoken(&self) -> Option<(LocaleId, String)> {
        self.log().spoken.last().cloned()
    }

    pub fn live_captures(&self) -> usize {
        self.live_captures.load(Ordering::SeqCst)
    }
}

pub struct FakeCapture {
    recorder: Recorder,
    refuse: bool,
    destroyed: bool,
}

impl SpeechCapture for FakeCapture {
    fn start_capture(&mut self, request: &RecognitionRequest) -> Result<()> {
        if self.refuse {
            return Err(voice_assistant::Error::Audio("device busy".to_string()));
        }
        self.recorder.log().starts.push(request.clone());
        Ok(())
    }

    fn stop_capture(&mut self) {
        self.recorder.log().stops += 1;
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.recorder.live_captures.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub struct FakeOutput {
    recorder: Recorder,
    locale: LocaleId,
    status: InitStatus,
}

impl SpeechOutput for FakeOutput {
    fn initialize(&mut self, locale: LocaleId) -> InitStatus {
        self.locale = locale;
        self.status
    }

    fn speak(&mut self, text: &str, _flush: bool) {
        self.recorder
            .log()
            .spoken
            .push((self.locale, text.to_string()));
    }

    fn set_pitch(&mut self, _pitch: f32) {}

    fn set_rate(&mut self, _rate: f32) {}

    fn stop(&mut self) {}

    fn shutdown(&mut self) {
        self.recorder.log().output_shutdowns += 1;
    }
}

pub struct FakeNavigator {
    recorder: Recorder,
    succeed: bool,
}

impl Navigator for FakeNavigator {
    fn open_url(&mut self, url: &str) -> bool {
        self.recorder.log().opened.push(url.to_string());
        self.succeed
    }
}

pub struct FakeNotifier {
    recorder: Recorder,
}

impl Notifier for FakeNotifier {
    fn notice(&mut self, text: &str) {
        self.recorder.log().notices.push(text.to_string());
    }

    fn cue(&mut self, cue: SessionCue) {
        self.recorder.log().cues.push(cue);
    }
}

/// Factory handing out recording fakes
#[derive(Clone)]
pub struct FakeFactory {
    pub recorder: Recorder,
    pub init_status: InitStatus,
    pub navigation_succeeds: bool,
    pub refuse_start: bool,
    pub built: Vec<LocaleId>,
}

impl FakeFactory {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            init_status: InitStatus::Success,
            navigation_succeeds: true,
            refuse_start: false,
            built: Vec::new(),
        }
    }
}

impl SessionFactory for FakeFactory {
    fn providers(&mut self, locale: LocaleId, _sink: EventSink) -> Result<Providers> {
        self.built.push(locale);
        self.recorder.live_captures.fetch_add(1, Ordering::SeqCst);

        Ok(Providers {
            capture: Box::new(FakeCapture {
                recorder: self.recorder.clone(),
                refuse: self.refuse_start,
                destroyed: false,
            }),
            output: Box::new(FakeOutput {
                recorder: self.recorder.clone(),
                locale,
                status: self.init_status,
            }),
            navigator: Box::new(FakeNavigator {
                recorder: self.recorder.clone(),
                succeed: self.navigation_succeeds,
            }),
            notifier: Box::new(FakeNotifier {
                recorder: self.recorder.clone(),
            }),
        })
    }
}

/// Manager wired to a fresh recorder
pub fn manager(
    factory: FakeFactory,
) -> (
    SessionManager<FakeFactory>,
    mpsc::UnboundedReceiver<SessionEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        SessionManager::new(factory, SessionSettings::default(), tx),
        rx,
    )
}

/// Event tagged for the session opened as `generation`
pub fn event(generation: u64, event: RecognitionEvent) -> SessionEvent {
    SessionEvent { generation, event }
}

/// Provider events for a capture that heard `phrase`
pub fn utterance(phrase: &str) -> Vec<RecognitionEvent> {
    vec![
        RecognitionEvent::Ready,
        RecognitionEvent::BeginningOfSpeech,
        RecognitionEvent::RmsChanged(0.2),
        RecognitionEvent::EndOfSpeech,
        RecognitionEvent::Results(vec![phrase.to_string()]),
    ]
}
