//! Gateway configuration.
//!
//! Resolution order (later wins): built-in defaults → JSON config file →
//! environment variables → CLI flags (applied by the binary).
//!
//! The config file lives at `~/.casegen/config.json` unless `CASEGEN_CONFIG`
//! or `--config` points elsewhere. A missing file is not an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CachePolicy;
use crate::error::{GatewayError, Result};
use crate::tracker::jira::DEFAULT_SEARCH_PATH;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub tracker: TrackerConfig,
    pub generator: GeneratorConfig,
    pub cache: CacheConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0).
    pub bind: String,
    /// Listen port (default: 8000).
    pub port: u16,
    /// Maximum accepted request body in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Issue tracker client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// JQL search resource under `rest/api/2/` (default: `search`).
    pub search_path: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: None,
            search_path: DEFAULT_SEARCH_PATH.to_string(),
        }
    }
}

/// Generative-language client settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Gemini API key. Falls back to `GEMINI_API_KEY` / `GOOGLE_API_KEY`.
    pub api_key: Option<String>,
    pub model: String,
    /// Override for the Gemini REST base URL.
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            temperature: 0.2,
            max_output_tokens: 8192,
            request_timeout_secs: None,
        }
    }
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Retention policies for the two caches. Both default to unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub sessions: CachePolicy,
    pub responses: CachePolicy,
}

impl Config {
    /// `~/.casegen`
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".casegen")
    }

    /// `~/.casegen/config.json`
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load defaults + file (if present) + environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("CASEGEN_CONFIG").map(PathBuf::from))
            .unwrap_or_else(Self::path);
        let mut config = Self::load_from_path(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).map_err(|e| {
                GatewayError::Config(format!("Failed to parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(GatewayError::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Apply `CASEGEN_*` / Gemini key overrides from `lookup`.
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("CASEGEN_BIND").filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("CASEGEN_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = lookup("CASEGEN_JIRA_SEARCH_PATH").filter(|v| !v.is_empty()) {
            self.tracker.search_path = path;
        }
        if let Some(model) = lookup("CASEGEN_MODEL").filter(|v| !v.is_empty()) {
            self.generator.model = model;
        }
        if self.generator.api_key.as_deref().unwrap_or("").is_empty() {
            if let Some(key) = lookup("GEMINI_API_KEY")
                .filter(|v| !v.is_empty())
                .or_else(|| lookup("GOOGLE_API_KEY").filter(|v| !v.is_empty()))
            {
                self.generator.api_key = Some(key);
            }
        }
        if let Some(max) = lookup("CASEGEN_SESSION_CACHE_MAX").and_then(|v| v.parse().ok()) {
            self.cache.sessions.max_entries = Some(max);
        }
        if let Some(max) = lookup("CASEGEN_RESPONSE_CACHE_MAX").and_then(|v| v.parse().ok()) {
            self.cache.responses.max_entries = Some(max);
        }
        if let Some(ttl) = lookup("CASEGEN_RESPONSE_CACHE_TTL_SECS").and_then(|v| v.parse().ok())
        {
            self.cache.responses.ttl_secs = Some(ttl);
        }
    }

    /// Reject configurations the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(GatewayError::Config("server.port must be non-zero".into()));
        }
        if self.server.body_limit_bytes == 0 {
            return Err(GatewayError::Config(
                "server.body_limit_bytes must be non-zero".into(),
            ));
        }
        if self.tracker.search_path.trim_matches('/').trim().is_empty() {
            return Err(GatewayError::Config("tracker.search_path must be set".into()));
        }
        if self.generator.model.trim().is_empty() {
            return Err(GatewayError::Config("generator.model must be set".into()));
        }
        for (name, policy) in [
            ("cache.sessions", &self.cache.sessions),
            ("cache.responses", &self.cache.responses),
        ] {
            if policy.max_entries == Some(0) {
                return Err(GatewayError::Config(format!(
                    "{name}.max_entries must be at least 1"
                )));
            }
        }
        Ok(())
    }
}
