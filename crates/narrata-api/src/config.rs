//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
    pub max_body_size: usize,
    /// Root directory under which every task gets its own workspace.
    pub storage_root: PathBuf,
    pub parser_endpoint: String,
    pub parser_api_key: String,
    pub parser_model: String,
    pub image_endpoint: String,
    pub image_api_key: String,
    pub image_model: String,
    pub tts_endpoint: String,
    pub tts_api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            storage_root: PathBuf::from("./data"),
            parser_endpoint: String::new(),
            parser_api_key: String::new(),
            parser_model: "gpt-4o-mini".to_string(),
            image_endpoint: String::new(),
            image_api_key: String::new(),
            image_model: "default".to_string(),
            tts_endpoint: String::new(),
            tts_api_key: String::new(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            storage_root: std::env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            parser_endpoint: std::env::var("PARSER_ENDPOINT").unwrap_or_default(),
            parser_api_key: std::env::var("PARSER_API_KEY").unwrap_or_default(),
            parser_model: std::env::var("PARSER_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            image_endpoint: std::env::var("IMAGE_ENDPOINT").unwrap_or_default(),
            image_api_key: std::env::var("IMAGE_API_KEY").unwrap_or_default(),
            image_model: std::env::var("IMAGE_MODEL").unwrap_or_else(|_| "default".to_string()),
            tts_endpoint: std::env::var("TTS_ENDPOINT").unwrap_or_default(),
            tts_api_key: std::env::var("TTS_API_KEY").unwrap_or_default(),
        }
    }
}
