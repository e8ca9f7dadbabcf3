use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::{RagConfig, RetryPolicy, DEFAULT_BASE_URL};

/// Used when neither `api_key` nor `api_key_env` yields a key.
pub const FALLBACK_API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub api_key: Option<String>,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub rag: RagSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_wait_secs")]
    pub wait_secs: f64,

    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_embedding_model() -> String {
    "embedding-001".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout() -> Option<u64> {
    Some(60)
}
fn default_max_attempts() -> u32 {
    5
}
fn default_wait_secs() -> f64 {
    3.0
}
fn default_pacing_ms() -> u64 {
    300
}
fn default_top_k() -> usize {
    2
}
fn default_max_context_chars() -> usize {
    12_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            wait_secs: default_wait_secs(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        let wait = Duration::try_from_secs_f64(self.wait_secs).unwrap_or_else(|_| {
            tracing::warn!("Invalid retry.wait_secs {}, using 0", self.wait_secs);
            Duration::ZERO
        });
        RetryPolicy::new(self.max_attempts, wait).with_pacing(Duration::from_millis(self.pacing_ms))
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

impl RagSettings {
    pub fn config(&self) -> RagConfig {
        RagConfig {
            top_k: self.top_k.max(1),
            max_context_chars: self.max_context_chars,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: None,
            model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            retry: RetrySettings::default(),
            rag: RagSettings::default(),
        }
    }
}

impl Settings {
    /// Load `.env`, then the config file, writing defaults on first run.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path).context("Failed to read config file")?;
            let settings: Settings =
                toml::from_str(&content).context("Failed to parse config file")?;
            Ok(settings)
        } else {
            let settings = Settings::default();
            settings.save_to(config_path)?;
            Ok(settings)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("ai", "promptly", "promptly")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Explicit key, then `api_key_env`, then `GOOGLE_API_KEY`.
    pub fn get_api_key(&self) -> Option<String> {
        self.get_api_key_with(|name| std::env::var(name).ok())
    }

    fn get_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        [self.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .into_iter()
            .filter_map(lookup)
            .find(|k| !k.is_empty())
    }
}
