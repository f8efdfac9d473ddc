//! Gemini `generateContent` client used to write test cases.
//!
//! The API key comes from [`GeneratorConfig::api_key`], which config
//! loading already resolved against `GEMINI_API_KEY` / `GOOGLE_API_KEY`.
//!
//! Thinking models return parts tagged `thought: true`. Those are dropped
//! and only the final answer text is returned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::{GatewayError, Result};

use super::TestCaseGenerator;

/// Gemini v1beta REST API base.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── Generator ────────────────────────────────────────────────────────────────

/// Test-case generator backed by the Gemini REST API.
pub struct GeminiGenerator {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_output_tokens: u32,
    client: Client,
}

impl std::fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiGenerator {
    /// Build a generator that authenticates with an API key and default
    /// sampling settings.
    pub fn new_with_key(api_key: &str, model: &str) -> Result<Self> {
        let config = GeneratorConfig {
            api_key: Some(api_key.to_string()),
            model: model.to_string(),
            ..GeneratorConfig::default()
        };
        Self::from_config(&config)
    }

    /// Build from configuration. A missing or empty key is a config error.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::Config(
                    "No Gemini API key: set generator.api_key or GEMINI_API_KEY".into(),
                )
            })?
            .to_string();

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            GatewayError::Config(format!("Failed to build generator HTTP client: {e}"))
        })?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_API_BASE.to_string()),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client,
        })
    }

    /// Use a different API base (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request body for a single-turn prompt.
    fn build_request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens
            }
        })
    }

    /// Extract final answer text from a Gemini API response.
    ///
    /// Falls back to thought text when the response carries nothing else.
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let final_parts: Vec<&str> = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();

        if !final_parts.is_empty() {
            return Some(final_parts.join(""));
        }

        let thought_parts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        if !thought_parts.is_empty() {
            Some(thought_parts.join(""))
        } else {
            None
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.query(&[("key", self.api_key.as_str())])
    }
}

#[async_trait]
impl TestCaseGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "Gemini generate request");

        let request = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json")
            .json(&self.build_request_body(prompt));

        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| GatewayError::Generation(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let json: Value = response.json().await.map_err(|e| {
                GatewayError::Generation(format!("Failed to parse Gemini response: {}", e))
            })?;
            return Self::extract_text(&json).ok_or_else(|| {
                let reason = json["candidates"][0]["finishReason"]
                    .as_str()
                    .or_else(|| json["promptFeedback"]["blockReason"].as_str())
                    .unwrap_or("no candidates");
                GatewayError::Generation(format!("Gemini returned no text ({reason})"))
            });
        }

        let error_text = response.text().await.unwrap_or_default();
        let body_msg = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(error_text);

        Err(GatewayError::Generation(format!(
            "Gemini API error {}: {}",
            status.as_u16(),
            body_msg
        )))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
