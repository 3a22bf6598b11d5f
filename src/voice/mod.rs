//! Voice processing module
//!
//! Microphone capture with endpointing, cloud STT and TTS, and speaker
//! playback, wrapped as session providers. Console providers stand in when
//! running without audio.

mod capture;
mod console;
mod endpoint;
mod playback;
mod recognizer;
mod speaker;
mod stt;
mod tts;

pub use capture::{Microphone, SAMPLE_RATE, rms, samples_to_wav};
pub use console::{
    ConsoleNavigator, ConsoleNotifier, ConsoleRecognizer, ConsoleSpeaker, TranscriptInbox,
};
pub use endpoint::{Endpoint, EndpointDetector, EndpointState};
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE};
pub use recognizer::{EndpointSettings, MicRecognizer, recognition_error};
pub use speaker::CloudSpeaker;
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
