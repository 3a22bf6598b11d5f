//! Energy-based speech endpointing
//!
//! Decides when an utterance starts and ends from raw microphone blocks, so
//! the recognizer can report beginning and end of speech.

use super::capture::{SAMPLE_RATE, rms};

/// Minimum audio energy threshold to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum duration of speech to keep an utterance (0.3 seconds)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Waiting for speech to begin
    Waiting,
    /// Speech in progress, accumulating
    Speaking,
    /// Utterance finished or abandoned
    Done,
}

/// Transition reported by [`EndpointDetector::process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    SpeechStarted,
    SpeechEnded,
    /// No speech began before the timeout
    NoSpeech,
}

/// Tracks one utterance
pub struct EndpointDetector {
    state: EndpointState,
    utterance: Vec<f32>,
    silence: usize,
    waited: usize,
    silence_limit: usize,
    timeout_limit: usize,
}

impl EndpointDetector {
    /// Create a detector ending speech after `silence_ms` of quiet and giving
    /// up after `timeout_secs` without speech
    #[must_use]
    pub fn new(silence_ms: u64, timeout_secs: u64) -> Self {
        let per_ms = u64::from(SAMPLE_RATE) / 1000;
        Self {
            state: EndpointState::Waiting,
            utterance: Vec::new(),
            silence: 0,
            waited: 0,
            silence_limit: usize::try_from(silence_ms.saturating_mul(per_ms))
                .unwrap_or(usize::MAX),
            timeout_limit: usize::try_from(timeout_secs.saturating_mul(u64::from(SAMPLE_RATE)))
                .unwrap_or(usize::MAX),
        }
    }

    /// Feed a block of samples
    pub fn process(&mut self, samples: &[f32]) -> Option<Endpoint> {
        let energy = rms(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            EndpointState::Waiting => {
                if is_speech {
                    self.state = EndpointState::Speaking;
                    self.utterance.extend_from_slice(samples);
                    self.silence = 0;
                    tracing::trace!(energy, "speech started");
                    return Some(Endpoint::SpeechStarted);
                }

                self.waited += samples.len();
                if self.waited > self.timeout_limit {
                    self.state = EndpointState::Done;
                    tracing::debug!("no speech before timeout");
                    return Some(Endpoint::NoSpeech);
                }
            }
            EndpointState::Speaking => {
                self.utterance.extend_from_slice(samples);
                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.silence > self.silence_limit {
                    self.state = EndpointState::Done;
                    tracing::debug!(samples = self.utterance.len(), "speech ended");
                    return Some(Endpoint::SpeechEnded);
                }
            }
            EndpointState::Done => {}
        }

        None
    }

    /// Whether enough speech was captured to be worth transcribing
    #[must_use]
    pub fn has_speech(&self) -> bool {
        self.utterance.len() > MIN_SPEECH_SAMPLES
    }

    /// Take the captured utterance
    pub fn take_utterance(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.utterance)
    }

    #[must_use]
    pub const fn state(&self) -> EndpointState {
        self.state
    }
}
