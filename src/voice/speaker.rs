//! Cloud speech output provider
//!
//! Utterances are synthesized through the TTS API and played on a blocking
//! thread. Flushing bumps a generation counter; playback of an older
//! generation notices and stops.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::Mutex;

use crate::locale::LocaleId;
use crate::provider::{InitStatus, SpeechOutput};

use super::playback::AudioPlayback;
use super::tts::TextToSpeech;

/// Languages the TTS backend can voice
const SUPPORTED_LANGUAGES: &[&str] = &["en", "es"];

/// Speech output through `OpenAI` TTS and the default speakers
pub struct CloudSpeaker {
    tts: Option<Arc<TextToSpeech>>,
    runtime: Handle,
    generation: Arc<AtomicU64>,
    playing: Arc<Mutex<()>>,
    rate: f32,
    pitch: f32,
}

impl CloudSpeaker {
    /// Create a speaker; `tts` is `None` when no API key is configured
    #[must_use]
    pub fn new(tts: Option<Arc<TextToSpeech>>, runtime: Handle) -> Self {
        Self {
            tts,
            runtime,
            generation: Arc::new(AtomicU64::new(0)),
            playing: Arc::new(Mutex::new(())),
            rate: 1.0,
            pitch: 1.0,
        }
    }

    fn interrupt(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl SpeechOutput for CloudSpeaker {
    fn initialize(&mut self, locale: LocaleId) -> InitStatus {
        if self.tts.is_none() {
            tracing::warn!("no TTS client configured");
            return InitStatus::Failure;
        }

        if !SUPPORTED_LANGUAGES.contains(&locale.code()) {
            return InitStatus::UnsupportedLanguage;
        }

        if let Err(e) = AudioPlayback::new() {
            tracing::warn!(error = %e, "no usable output device");
            return InitStatus::Failure;
        }

        InitStatus::Success
    }

    fn speak(&mut self, text: &str, flush: bool) {
        let Some(tts) = self.tts.clone() else {
            return;
        };

        let generation = if flush {
            self.interrupt()
        } else {
            self.generation.load(Ordering::Acquire)
        };

        let current = Arc::clone(&self.generation);
        let playing = Arc::clone(&self.playing);
        let text = text.to_string();
        let rate = self.rate;

        self.runtime.spawn(async move {
            let audio = match tts.synthesize(&text, rate).await {
                Ok(audio) => audio,
                Err(e) => {
                    tracing::warn!(error = %e, "speech synthesis failed");
                    return;
                }
            };

            let _turn = playing.lock().await;
            if current.load(Ordering::Acquire) != generation {
                tracing::debug!(text = %text, "utterance superseded before playback");
                return;
            }

            let result = tokio::task::spawn_blocking(move || {
                let playback = AudioPlayback::new()?;
                playback.play_mp3(&audio, || current.load(Ordering::Acquire) != generation)
            })
            .await;

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "playback failed"),
                Err(e) => tracing::warn!(error = %e, "playback task failed"),
            }
        });
    }

    fn set_pitch(&mut self, pitch: f32) {
        // The TTS API has no pitch control; only the speed is sent.
        self.pitch = pitch;
        tracing::debug!(pitch, "pitch recorded");
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate.clamp(0.25, 4.0);
        tracing::debug!(rate = self.rate, "rate set");
    }

    fn stop(&mut self) {
        self.interrupt();
    }

    fn shutdown(&mut self) {
        self.interrupt();
        self.tts = None;
        tracing::debug!(pitch = self.pitch, "speaker shut down");
    }
}
