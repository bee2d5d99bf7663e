use crate::actions::ActionSettings;
use crate::response::DEFAULT_INLINE_REPLY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
    /// Where this config was loaded from; not serialized.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Usernames or numeric user ids allowed to issue commands. `*` allows anyone.
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_users: default_allowed_users(),
            api_base: default_api_base(),
        }
    }
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".into()]
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name this agent answers to. Defaults to the OS hostname.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    #[serde(default = "default_inline_reply_limit")]
    pub inline_reply_limit: usize,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_status_sample_ms")]
    pub status_sample_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: None,
            uploads_dir: default_uploads_dir(),
            inline_reply_limit: default_inline_reply_limit(),
            command_timeout_secs: default_command_timeout_secs(),
            status_sample_ms: default_status_sample_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl AgentConfig {
    /// Upload directory with `~` expanded.
    pub fn uploads_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.uploads_dir).into_owned())
    }

    pub fn action_settings(&self) -> ActionSettings {
        ActionSettings {
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            status_sample: Duration::from_millis(self.status_sample_ms),
        }
    }
}

fn default_uploads_dir() -> String {
    crate::actions::upload::DEFAULT_UPLOADS_DIR.into()
}

fn default_inline_reply_limit() -> usize {
    DEFAULT_INLINE_REPLY_LIMIT
}

fn default_command_timeout_secs() -> u64 {
    60
}

fn default_status_sample_ms() -> u64 {
    1000
}

fn default_max_in_flight() -> usize {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_channel_initial_backoff_secs")]
    pub channel_initial_backoff_secs: u64,
    #[serde(default = "default_channel_max_backoff_secs")]
    pub channel_max_backoff_secs: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            channel_initial_backoff_secs: default_channel_initial_backoff_secs(),
            channel_max_backoff_secs: default_channel_max_backoff_secs(),
        }
    }
}

fn default_channel_initial_backoff_secs() -> u64 {
    2
}

fn default_channel_max_backoff_secs() -> u64 {
    60
}
