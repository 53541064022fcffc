//! Gateway configuration. Load from TOML or env; credentials only from env.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_CONFIG_PATH: &str = "AEON_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";
const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
const ENV_PERPLEXITY_API_KEY: &str = "PERPLEXITY_API_KEY";
/// Serverless hosts only allow writes under the temp dir.
const ENV_VERCEL: &str = "VERCEL";
const MEMORY_FILE_NAME: &str = "memory.json";

/// Global application configuration (gateway + providers + memory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    /// If true, the gateway serves the static UI from `frontend_dir`.
    #[serde(default)]
    pub frontend_enabled: bool,
    pub frontend_dir: String,
    pub storage: StorageConfig,
    pub completion: CompletionConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Memory file used when storage is not ephemeral.
    pub path: String,
    /// Place the memory file in the OS temp dir. Forced on when `VERCEL` is set.
    #[serde(default)]
    pub ephemeral: bool,
    pub transcript_limit: usize,
}

/// Language-model completion provider (OpenRouter, OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Identity line placed in the system instruction.
    pub persona: String,
}

/// Web-search-and-summarize provider (Perplexity, OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Chain the keyless Wikipedia / DuckDuckGo lookup after the primary provider.
    #[serde(default)]
    pub instant_answer_fallback: bool,
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `AEON__*` > `AEON_CONFIG` path
    /// (default `config/gateway.toml`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("app_name", "AEON")?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000_i64)?
            .set_default("frontend_enabled", false)?
            .set_default("frontend_dir", "static")?
            .set_default("storage.path", "data/memory.json")?
            .set_default("storage.ephemeral", false)?
            .set_default("storage.transcript_limit", crate::TRANSCRIPT_LIMIT as i64)?
            .set_default(
                "completion.api_url",
                "https://openrouter.ai/api/v1/chat/completions",
            )?
            .set_default("completion.model", "meta-llama/llama-3.3-70b-instruct:free")?
            .set_default("completion.temperature", 0.7_f64)?
            .set_default("completion.max_tokens", 2000_i64)?
            .set_default("completion.timeout_secs", 30_i64)?
            .set_default("completion.persona", "AEON ∞ — Infinity Intelligence")?
            .set_default("search.api_url", "https://api.perplexity.ai/chat/completions")?
            .set_default("search.model", "sonar")?
            .set_default("search.temperature", 0.2_f64)?
            .set_default("search.max_tokens", 1500_i64)?
            .set_default("search.timeout_secs", 20_i64)?
            .set_default("search.instant_answer_fallback", false)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("AEON").separator("__"))
            .build()?;

        let mut cfg: CoreConfig = built.try_deserialize()?;
        if std::env::var_os(ENV_VERCEL).is_some() {
            cfg.storage.ephemeral = true;
        }
        Ok(cfg)
    }

    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    /// Where the transcript lives: the temp dir when ephemeral, else the configured path.
    pub fn memory_file(&self) -> PathBuf {
        if self.ephemeral {
            std::env::temp_dir().join(MEMORY_FILE_NAME)
        } else {
            PathBuf::from(&self.path)
        }
    }
}

/// Provider credentials. Never read from config files and never logged.
#[derive(Clone, Default)]
pub struct Credentials {
    pub openrouter_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            openrouter_api_key: non_blank_env(ENV_OPENROUTER_API_KEY),
            perplexity_api_key: non_blank_env(ENV_PERPLEXITY_API_KEY),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openrouter_api_key", &self.openrouter_api_key.as_ref().map(|_| "<set>"))
            .field("perplexity_api_key", &self.perplexity_api_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
