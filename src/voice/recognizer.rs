//! Microphone-backed speech capture provider
//!
//! Each capture runs on its own thread because the input stream cannot leave
//! the thread that opened it. The thread reports progress as recognition
//! events and finishes with either `Results` or `Error`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::provider::{
    EventSink, RecognitionError, RecognitionEvent, RecognitionRequest, SpeechCapture,
};
use crate::{Error, Result};

use super::capture::{Microphone, SAMPLE_RATE, rms, samples_to_wav};
use super::endpoint::{Endpoint, EndpointDetector};
use super::stt::SpeechToText;

/// How often the capture thread drains the microphone
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Endpointing limits for a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSettings {
    pub silence_ms: u64,
    pub speech_timeout_secs: u64,
}

/// Flags shared with a running capture thread
#[derive(Default)]
struct Flags {
    stop: AtomicBool,
    cancel: AtomicBool,
}

struct Job {
    flags: Arc<Flags>,
    thread: JoinHandle<()>,
}

/// Speech capture through the default microphone and a cloud transcriber
pub struct MicRecognizer {
    sink: EventSink,
    transcriber: Arc<SpeechToText>,
    runtime: Handle,
    endpoint: EndpointSettings,
    job: Option<Job>,
}

impl MicRecognizer {
    #[must_use]
    pub fn new(
        sink: EventSink,
        transcriber: Arc<SpeechToText>,
        runtime: Handle,
        endpoint: EndpointSettings,
    ) -> Self {
        Self {
            sink,
            transcriber,
            runtime,
            endpoint,
            job: None,
        }
    }
}

impl SpeechCapture for MicRecognizer {
    fn start_capture(&mut self, request: &RecognitionRequest) -> Result<()> {
        if self.job.as_ref().is_some_and(|job| !job.thread.is_finished()) {
            return Err(Error::Audio("previous capture still running".to_string()));
        }

        let flags = Arc::new(Flags::default());
        let worker = CaptureWorker {
            sink: self.sink.clone(),
            transcriber: Arc::clone(&self.transcriber),
            runtime: self.runtime.clone(),
            endpoint: self.endpoint,
            request: request.clone(),
            flags: Arc::clone(&flags),
        };

        let thread = std::thread::Builder::new()
            .name("speech-capture".to_string())
            .spawn(move || worker.run())?;

        tracing::debug!(language = request.language, "capture started");
        self.job = Some(Job { flags, thread });
        Ok(())
    }

    fn stop_capture(&mut self) {
        if let Some(job) = &self.job {
            job.flags.stop.store(true, Ordering::Release);
        }
    }

    fn destroy(&mut self) {
        if let Some(job) = self.job.take() {
            job.flags.cancel.store(true, Ordering::Release);
            job.flags.stop.store(true, Ordering::Release);
        }
        tracing::debug!(generation = self.sink.generation(), "recognizer destroyed");
    }
}

struct CaptureWorker {
    sink: EventSink,
    transcriber: Arc<SpeechToText>,
    runtime: Handle,
    endpoint: EndpointSettings,
    request: RecognitionRequest,
    flags: Arc<Flags>,
}

impl CaptureWorker {
    fn run(self) {
        if let Some(code) = self.capture_and_transcribe().err() {
            self.emit(RecognitionEvent::Error(code));
        }
    }

    fn capture_and_transcribe(&self) -> std::result::Result<(), RecognitionError> {
        let mut mic = Microphone::open().map_err(|e| recognition_error(&e))?;
        mic.start().map_err(|e| recognition_error(&e))?;
        self.emit(RecognitionEvent::Ready);

        let mut detector =
            EndpointDetector::new(self.endpoint.silence_ms, self.endpoint.speech_timeout_secs);

        loop {
            std::thread::sleep(POLL_INTERVAL);
            if self.cancelled() {
                return Ok(());
            }

            let block = mic.take_buffer();
            self.emit(RecognitionEvent::RmsChanged(rms(&block)));

            match detector.process(&block) {
                Some(Endpoint::SpeechStarted) => self.emit(RecognitionEvent::BeginningOfSpeech),
                Some(Endpoint::SpeechEnded) => break,
                Some(Endpoint::NoSpeech) => return Err(RecognitionError::SpeechTimeout),
                None => {}
            }

            if self.flags.stop.load(Ordering::Acquire) {
                if detector.has_speech() {
                    break;
                }
                return Err(RecognitionError::NoMatch);
            }
        }

        mic.stop();
        self.emit(RecognitionEvent::EndOfSpeech);

        let utterance = detector.take_utterance();
        let wav = samples_to_wav(&utterance, SAMPLE_RATE).map_err(|e| recognition_error(&e))?;

        let candidates = self
            .runtime
            .block_on(self.transcriber.transcribe(
                &wav,
                self.request.language,
                self.request.max_results,
            ))
            .map_err(|e| recognition_error(&e))?;

        self.emit(RecognitionEvent::Results(candidates));
        Ok(())
    }

    fn cancelled(&self) -> bool {
        self.flags.cancel.load(Ordering::Acquire)
    }

    fn emit(&self, event: RecognitionEvent) {
        if !self.cancelled() && !self.sink.send(event) {
            tracing::debug!("event receiver closed");
        }
    }
}

/// Map a provider failure to the recognition error code reported to the session
#[must_use]
pub fn recognition_error(error: &Error) -> RecognitionError {
    match error {
        Error::Audio(_) | Error::Io(_) => RecognitionError::Audio,
        Error::Config(_) | Error::Serialization(_) => RecognitionError::Client,
        Error::SttStatus { status, .. } => match status {
            401 | 403 => RecognitionError::InsufficientPermissions,
            408 => RecognitionError::NetworkTimeout,
            429 => RecognitionError::RecognizerBusy,
            400..=499 => RecognitionError::Client,
            500..=599 => RecognitionError::Server,
            _ => RecognitionError::Unknown,
        },
        Error::Http(e) if e.is_timeout() => RecognitionError::NetworkTimeout,
        Error::Http(e) if e.is_connect() || e.is_request() => RecognitionError::Network,
        Error::Http(e) if e.is_decode() => RecognitionError::Server,
        _ => RecognitionError::Unknown,
    }
}
