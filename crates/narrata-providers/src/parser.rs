//! Parser LLM client (spec §4.4 "Parser LLM"). Wire shape grounded on
//! `original_source/agents/base/llm_utils.py::_call_llm_json`'s use of a
//! LangChain `ChatOpenAI` client — an OpenAI-compatible chat-completions
//! call whose message content is the scene-schema JSON to parse.

use std::time::Duration;

use narrata_models::{ApiError, NovelParseResult, ParseError};
use serde::{Deserialize, Serialize};

use crate::{ProviderError, DEFAULT_TIMEOUT_SECS};

#[derive(Clone)]
pub struct ParserClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl ParserClient {
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

    /// Extract one chunk's scenes/characters/plot points (spec §4.5
    /// "per-chunk extraction"). `prompt` is the fully rendered prompt
    /// template; this client is agnostic to prompt construction, which the
    /// Parser Stage owns.
    pub async fn extract(&self, prompt: &str) -> Result<NovelParseResult, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.endpoint.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a professional assistant that replies with a single JSON object and no other text.",
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
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

        let parsed: ChatResponse = response.json().await.map_err(|e| ApiError::Network {
            endpoint: url.clone(),
            message: e.to_string(),
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ParseError::new(&self.endpoint, "response had no choices"))?;

        let parsed: NovelParseResult = serde_json::from_str(&content).map_err(|e| {
            ParseError::new(&self.endpoint, format!("invalid scene JSON: {e}"))
        })?;

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn extract_parses_chat_content_as_scene_json() {
        let server = MockServer::start().await;
        let scene_json = serde_json::json!({
            "characters": [],
            "chapters": [],
            "plot_points": [],
        })
        .to_string();

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": scene_json}}]
            })))
            .mount(&server)
            .await;

        let client = ParserClient::new(server.uri(), "test-key", "gpt-test");
        let result = client.extract("parse this chunk").await.unwrap();
        assert!(result.chapters.is_empty());
    }

    #[tokio::test]
    async fn extract_surfaces_status_errors_as_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ParserClient::new(server.uri(), "test-key", "gpt-test");
        let err = client.extract("parse this chunk").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api(ApiError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn extract_surfaces_invalid_json_as_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "not json"}}]
            })))
            .mount(&server)
            .await;

        let client = ParserClient::new(server.uri(), "test-key", "gpt-test");
        let err = client.extract("parse this chunk").await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }
}
