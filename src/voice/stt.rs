//! Speech-to-text (STT) processing

use crate::config::SttProvider;
use crate::{Error, Result};

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Transcribes an utterance into ranked candidate transcripts
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SttProvider,
}

impl SpeechToText {
    /// Create an STT client for `provider`
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(provider: SttProvider, api_key: Option<String>, model: String) -> Result<Self> {
        let api_key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
            Error::Config(match provider {
                SttProvider::Whisper => "OPENAI_API_KEY required for Whisper".to_string(),
                SttProvider::Deepgram => "DEEPGRAM_API_KEY required".to_string(),
            })
        })?;

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            api_key,
            model,
            provider,
        })
    }

    /// Transcribe WAV audio spoken in `language`
    ///
    /// Returns at most `max_results` non-empty candidates, best first. An
    /// empty list means nothing intelligible was said.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn transcribe(
        &self,
        audio: &[u8],
        language: &str,
        max_results: u8,
    ) -> Result<Vec<String>> {
        let mut candidates = match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio, language).await?,
            SttProvider::Deepgram => {
                self.transcribe_deepgram(audio, language, max_results)
                    .await?
            }
        };

        candidates.retain(|c| !c.trim().is_empty());
        candidates.truncate(usize::from(max_results));
        Ok(candidates)
    }

    /// Transcribe using `OpenAI` Whisper; Whisper yields a single candidate
    async fn transcribe_whisper(&self, audio: &[u8], language: &str) -> Result<Vec<String>> {
        tracing::debug!(audio_bytes = audio.len(), language, "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Whisper request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::SttStatus {
                status: status.as_u16(),
                body,
            });
        }

        let result: WhisperResponse = response.json().await?;
        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(vec![result.text.trim().to_string()])
    }

    /// Transcribe using Deepgram, requesting alternatives
    async fn transcribe_deepgram(
        &self,
        audio: &[u8],
        language: &str,
        max_results: u8,
    ) -> Result<Vec<String>> {
        tracing::debug!(audio_bytes = audio.len(), language, "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&language={}&alternatives={}&punctuate=true",
            self.model, language, max_results
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(Error::SttStatus {
                status: status.as_u16(),
                body,
            });
        }

        let result: DeepgramResponse = response.json().await?;
        let candidates = result
            .results
            .channels
            .into_iter()
            .next()
            .map(|c| c.alternatives.into_iter().map(|a| a.transcript).collect())
            .unwrap_or_default();

        tracing::info!(?candidates, "transcription complete");
        Ok(candidates)
    }
}
