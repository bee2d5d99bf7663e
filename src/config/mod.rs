pub mod schema;

pub use schema::{AgentConfig, Config, ReliabilityConfig, TelegramConfig};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Environment variable that replaces `telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "FLEET_AGENT_BOT_TOKEN";

/// `<platform config dir>/fleet-agent/config.toml`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "fleet-agent")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Load from `path`, or from [`default_config_path`] when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    /// Environment overrides are applied and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    tracing::debug!("No config file found; using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.config_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(BOT_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.inline_reply_limit == 0 {
            return Err(ConfigError::Invalid(
                "agent.inline_reply_limit must be greater than 0".into(),
            ));
        }
        if self.agent.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "agent.command_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.agent.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_in_flight must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Token for the Telegram channel, or an error naming both ways to set it.
    pub fn require_bot_token(&self) -> Result<&str, ConfigError> {
        let token = self.telegram.bot_token.trim();
        if token.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "telegram.bot_token is not set (config file or {BOT_TOKEN_ENV})"
            )));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_reference_behaviour() {
        let config = Config::default();
        assert_eq!(config.telegram.allowed_users, vec!["*"]);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.agent.uploads_dir, "uploads");
        assert_eq!(config.agent.inline_reply_limit, 3000);
        assert_eq!(config.agent.max_in_flight, 8);
        assert_eq!(config.reliability.channel_initial_backoff_secs, 2);
        assert_eq!(config.reliability.channel_max_backoff_secs, 60);

        let settings = config.agent.action_settings();
        assert_eq!(settings.command_timeout, Duration::from_secs(60));
        assert_eq!(settings.status_sample, Duration::from_millis(1000));
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[telegram]
bot_token = "123:ABC"
allowed_users = ["alice", "987654321"]

[agent]
name = "WORKER1"
command_timeout_secs = 5
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.telegram.bot_token, "123:ABC");
        assert_eq!(config.telegram.allowed_users, vec!["alice", "987654321"]);
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.agent.name.as_deref(), Some("WORKER1"));
        assert_eq!(config.agent.command_timeout_secs, 5);
        assert_eq!(config.agent.inline_reply_limit, 3000);
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[agent\nname = ").unwrap();
        assert!(matches!(
            Config::from_file(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn env_token_overrides_file() {
        let mut config = Config::default();
        config.telegram.bot_token = "from-file".into();
        config.apply_env_overrides(|key| (key == BOT_TOKEN_ENV).then(|| " from-env ".into()));
        assert_eq!(config.telegram.bot_token, "from-env");

        config.apply_env_overrides(|_| Some("   ".into()));
        assert_eq!(config.telegram.bot_token, "from-env");
    }

    #[test]
    fn zero_values_fail_validation() {
        let mut config = Config::default();
        config.agent.inline_reply_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agent.command_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agent.max_in_flight = 0;
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn missing_token_is_reported() {
        let err = Config::default().require_bot_token().unwrap_err();
        assert!(err.to_string().contains(BOT_TOKEN_ENV));
    }

    #[test]
    fn uploads_path_expands_tilde() {
        let mut agent = AgentConfig::default();
        assert_eq!(agent.uploads_path(), PathBuf::from("uploads"));
        agent.uploads_dir = "~/fleet/uploads".into();
        assert!(!agent.uploads_path().starts_with("~"));
    }
}
