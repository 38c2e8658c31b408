//! Text-to-speech client (spec §4.4 "TTS provider"; wire format spec §6).
//! Envelope shape grounded on
//! `original_source/agents/voice_synthesizer/agent.py`'s synthesis call,
//! which wraps voice parameters under an `audio` object and the text under
//! a `request` object.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use narrata_models::{ApiError, SynthesisError};
use serde::{Deserialize, Serialize};

use crate::{ProviderError, DEFAULT_TIMEOUT_SECS};

#[derive(Clone)]
pub struct TtsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    audio: AudioParams<'a>,
    request: TextParams<'a>,
}

#[derive(Debug, Serialize)]
struct AudioParams<'a> {
    voice_type: &'a str,
    encoding: &'a str,
    speed_ratio: f64,
}

#[derive(Debug, Serialize)]
struct TextParams<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SpeakResponse {
    data: Option<String>,
}

impl TtsClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_timeout(endpoint, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds"),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Synthesize `text` as `voice_type`, encoded as `encoding` (e.g.
    /// `"mp3"`), at `speed` (1.0 = natural pace).
    pub async fn speak(
        &self,
        text: &str,
        voice_type: &str,
        encoding: &str,
        speed: f64,
    ) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/v1/voice/tts", self.endpoint.trim_end_matches('/'));

        let body = SpeakRequest {
            audio: AudioParams {
                voice_type,
                encoding,
                speed_ratio: speed,
            },
            request: TextParams { text },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Network {
                endpoint: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                endpoint: url,
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: SpeakResponse = response.json().await.map_err(|e| ApiError::Network {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;

        let b64 = parsed
            .data
            .ok_or_else(|| SynthesisError("TTS provider returned no audio data".to_string()))?;

        BASE64
            .decode(b64)
            .map_err(|e| SynthesisError(format!("TTS provider returned invalid base64: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn speak_decodes_base64_audio_payload() {
        let server = MockServer::start().await;
        let b64 = BASE64.encode(b"fake-mp3-bytes");

        Mock::given(method("POST"))
            .and(path("/v1/voice/tts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": b64})))
            .mount(&server)
            .await;

        let client = TtsClient::new(server.uri(), "key");
        let bytes = client.speak("hello", "narrator", "mp3", 1.0).await.unwrap();
        assert_eq!(bytes, b"fake-mp3-bytes");
    }

    #[tokio::test]
    async fn speak_rejects_missing_data_as_synthesis_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/voice/tts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
            .mount(&server)
            .await;

        let client = TtsClient::new(server.uri(), "key");
        let err = client.speak("hello", "narrator", "mp3", 1.0).await.unwrap_err();
        assert!(matches!(err, ProviderError::Synthesis(_)));
    }
}
