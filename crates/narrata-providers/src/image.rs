//! Image generation client (spec §4.4 "Image provider"; wire format spec
//! §6). Request/response envelope shape grounded on
//! `original_source/agents/image_generator/agent.py::_generate_image_qiniu`
//! (text-to-image and image-to-image both post to the same endpoint, the
//! latter adding a base64 `image` field).

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use narrata_models::{ApiError, GenerationError};
use serde::{Deserialize, Serialize};

use crate::{ProviderError, DEFAULT_TIMEOUT_SECS};

#[derive(Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    data: Vec<GenerateResponseItem>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponseItem {
    b64_json: Option<String>,
}

impl ImageClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::with_timeout(
            endpoint,
            api_key,
            model,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds"),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Generate an image for `prompt` at `size` (e.g. `"1024x1024"`),
    /// optionally conditioned on a `reference` image (image-to-image).
    pub async fn generate(
        &self,
        prompt: &str,
        size: &str,
        reference: Option<&[u8]>,
    ) -> Result<Vec<u8>, ProviderError> {
        let url = format!(
            "{}/v1/images/generations",
            self.endpoint.trim_end_matches('/')
        );

        let body = GenerateRequest {
            model: &self.model,
            prompt,
            size,
            image: reference.map(|bytes| BASE64.encode(bytes)),
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

        let parsed: GenerateResponse = response.json().await.map_err(|e| ApiError::Network {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;

        let b64 = parsed
            .data
            .into_iter()
            .next()
            .and_then(|item| item.b64_json)
            .ok_or_else(|| GenerationError("image provider returned no image data".to_string()))?;

        BASE64
            .decode(b64)
            .map_err(|e| GenerationError(format!("image provider returned invalid base64: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_decodes_base64_image_payload() {
        let server = MockServer::start().await;
        let b64 = BASE64.encode(b"fake-png-bytes");

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"b64_json": b64}]
            })))
            .mount(&server)
            .await;

        let client = ImageClient::new(server.uri(), "key", "model");
        let bytes = client.generate("a cat", "1024x1024", None).await.unwrap();
        assert_eq!(bytes, b"fake-png-bytes");
    }

    #[tokio::test]
    async fn generate_rejects_empty_data_as_generation_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let client = ImageClient::new(server.uri(), "key", "model");
        let err = client.generate("a cat", "1024x1024", None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Generation(_)));
    }
}
