//! The external speech engine seam: capture and recognition.
//!
//! Capture and recognition are separate steps so the turn controller can
//! observe a cancel request between them. Timeouts and recognition
//! failures are ordinary variants, not errors; a listen cycle that hears
//! nothing is a valid outcome.

use async_trait::async_trait;
use serde::Deserialize;

use crate::audio;

/// Speech below this RMS level is treated as silence no matter what the
/// ambient calibration measured.
const MIN_SPEECH_RMS: f32 = 150.0;

/// How far above the measured noise floor a capture must rise to count as
/// speech.
const NOISE_FLOOR_HEADROOM: f32 = 2.0;

/// Result of the capture step.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// Audible input worth transcribing.
    Audio(Vec<i16>),
    /// The window elapsed without speech.
    Silence,
    /// The microphone could not be read.
    Failed(String),
}

/// Result of the recognition step.
#[derive(Debug)]
pub enum ListenOutcome {
    /// A non-empty transcript.
    Transcript(String),
    /// Recognition produced nothing; treated like a silent window.
    Timeout,
    /// The recognition backend failed.
    Failure(String),
}

/// An external engine that turns a timed listen into text.
#[async_trait]
pub trait SpeechEngine: Send {
    /// Samples ambient noise ahead of a listen so the silence gate adapts
    /// to the room.
    async fn calibrate(&mut self);

    /// Captures one listen window from the microphone.
    async fn capture(&mut self) -> CaptureOutcome;

    /// Transcribes captured audio.
    async fn recognize(&mut self, samples: Vec<i16>) -> ListenOutcome;
}

/// Microphone capture plus an OpenAI-compatible transcription endpoint.
pub struct MicSpeechEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    noise_floor: f32,
}

#[derive(Deserialize)]
struct Transcription {
    text: String,
}

impl MicSpeechEngine {
    pub fn new(api_base: &str, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/v1/audio/transcriptions", api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            noise_floor: 0.0,
        }
    }

    fn speech_threshold(&self) -> f32 {
        (self.noise_floor * NOISE_FLOOR_HEADROOM).max(MIN_SPEECH_RMS)
    }
}

#[async_trait]
impl SpeechEngine for MicSpeechEngine {
    async fn calibrate(&mut self) {
        match tokio::task::spawn_blocking(|| audio::record_for(audio::CALIBRATION_WINDOW)).await {
            Ok(Ok(samples)) => {
                self.noise_floor = audio::rms(&samples);
                tracing::debug!("ambient noise floor at {:.1}", self.noise_floor);
            }
            Ok(Err(err)) => tracing::warn!("ambient calibration failed: {err}"),
            Err(err) => tracing::warn!("ambient calibration task failed: {err}"),
        }
    }

    async fn capture(&mut self) -> CaptureOutcome {
        let samples = match tokio::task::spawn_blocking(audio::record_turn).await {
            Ok(Ok(samples)) => samples,
            Ok(Err(err)) => return CaptureOutcome::Failed(err.to_string()),
            Err(err) => return CaptureOutcome::Failed(err.to_string()),
        };
        if audio::rms(&samples) < self.speech_threshold() {
            return CaptureOutcome::Silence;
        }
        CaptureOutcome::Audio(samples)
    }

    async fn recognize(&mut self, samples: Vec<i16>) -> ListenOutcome {
        let path = audio::temp_wav_path();
        let _guard = audio::TempWavGuard::new();
        if let Err(err) = audio::save_wav(&path, &samples) {
            return ListenOutcome::Failure(format!("could not stage audio: {err}"));
        }
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => return ListenOutcome::Failure(format!("could not read staged audio: {err}")),
        };

        let part = match reqwest::multipart::Part::bytes(bytes)
            .file_name("capture.wav")
            .mime_str("audio/wav")
        {
            Ok(part) => part,
            Err(err) => return ListenOutcome::Failure(err.to_string()),
        };
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return ListenOutcome::Failure(err.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return ListenOutcome::Failure(format!("transcription endpoint returned {status}: {body}"));
        }

        match response.json::<Transcription>().await {
            Ok(transcription) => {
                let text = transcription.text.trim().to_string();
                if text.is_empty() {
                    ListenOutcome::Timeout
                } else {
                    ListenOutcome::Transcript(text)
                }
            }
            Err(err) => ListenOutcome::Failure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_never_drops_below_the_fixed_minimum() {
        let engine = MicSpeechEngine::new("http://localhost", "key", "whisper-1");
        assert_eq!(engine.speech_threshold(), MIN_SPEECH_RMS);
    }

    #[test]
    fn threshold_tracks_a_loud_room() {
        let mut engine = MicSpeechEngine::new("http://localhost", "key", "whisper-1");
        engine.noise_floor = 200.0;
        assert_eq!(engine.speech_threshold(), 400.0);
    }

    #[test]
    fn endpoint_joins_cleanly_with_a_trailing_slash() {
        let engine = MicSpeechEngine::new("http://localhost:8000/", "key", "whisper-1");
        assert_eq!(
            engine.endpoint,
            "http://localhost:8000/v1/audio/transcriptions"
        );
    }
}
