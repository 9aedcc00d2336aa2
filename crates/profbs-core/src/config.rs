use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HISTORY_TURNS: usize = 40;

/// Flat env names accepted for compatibility with existing deployments.
/// Each maps onto a nested config key.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("TELEGRAM_TOKEN", "telegram.bot_token"),
    ("OPENAI_API_KEY", "openai.api_key"),
    ("ALLOWED_CHAT_ID", "telegram.allowed_chat_id"),
];

/// Top-level config (profbs.toml + PROFBS_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub telegram: TelegramConfig,
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// The only chat the bot answers. Everyone else gets the access-denied reply.
    pub allowed_chat_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on a single completion round trip.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Sliding window size: older turns are evicted once a chat exceeds this.
    #[serde(default = "default_history_turns")]
    pub max_turns: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_HISTORY_TURNS,
        }
    }
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_history_turns() -> usize {
    DEFAULT_HISTORY_TURNS
}

impl RelayConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Precedence, lowest first:
    ///   1. the TOML file (explicit path or ~/.profbs/profbs.toml; may be absent)
    ///   2. TELEGRAM_TOKEN / OPENAI_API_KEY / ALLOWED_CHAT_ID
    ///   3. PROFBS_* with `__` as the nesting separator
    ///      (e.g. PROFBS_OPENAI__MODEL=gpt-4o-mini)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        tracing::debug!(path = %path, "loading config");

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(legacy_env())
                .merge(Env::prefixed("PROFBS_").split("__")),
        )
    }

    /// Extract and validate from an already-assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: RelayConfig = figment
            .extract()
            .map_err(|e| RelayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(RelayError::MissingSetting {
                key: "telegram.bot_token",
            });
        }
        if self.openai.api_key.trim().is_empty() {
            return Err(RelayError::MissingSetting {
                key: "openai.api_key",
            });
        }
        if self.telegram.allowed_chat_id == 0 {
            return Err(RelayError::InvalidSetting {
                key: "telegram.allowed_chat_id",
                reason: "0 is not a valid Telegram chat id".to_string(),
            });
        }
        if self.history.max_turns < 2 {
            return Err(RelayError::InvalidSetting {
                key: "history.max_turns",
                reason: "must keep at least one user/assistant pair".to_string(),
            });
        }
        Ok(())
    }
}

fn legacy_env() -> Env {
    Env::raw()
        .only(&["TELEGRAM_TOKEN", "OPENAI_API_KEY", "ALLOWED_CHAT_ID"])
        .map(|key| {
            LEGACY_ENV
                .iter()
                .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
                .map(|(_, path)| path.to_string())
                .unwrap_or_else(|| key.as_str().to_string())
                .into()
        })
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.profbs/profbs.toml", home)
}
