use std::fmt;
use thiserror::Error;

pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in .env or environment")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

pub struct Config {
    pub telegram_token: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub port: u16,
}

// Secrets stay out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_token", &"***")
            .field("gemini_api_key", &"***")
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_model", &self.gemini_model)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            telegram_token: require("TELEGRAM_BOT_TOKEN")?,
            gemini_api_key: require("GEMINI_API_KEY")?,
            gemini_base_url: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string()),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = load(&[("TELEGRAM_BOT_TOKEN", "123:abc"), ("GEMINI_API_KEY", "g-key")]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.gemini_base_url, DEFAULT_GEMINI_BASE);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn test_missing_secrets_rejected() {
        assert_eq!(
            load(&[("GEMINI_API_KEY", "g-key")]).unwrap_err(),
            ConfigError::Missing("TELEGRAM_BOT_TOKEN")
        );
        assert_eq!(
            load(&[("TELEGRAM_BOT_TOKEN", "123:abc"), ("GEMINI_API_KEY", "  ")]).unwrap_err(),
            ConfigError::Missing("GEMINI_API_KEY")
        );
    }

    #[test]
    fn test_overrides_and_bad_port() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("GEMINI_API_KEY", "k"),
            ("PORT", "9000"),
            ("GEMINI_MODEL", "gemini-test"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.gemini_model, "gemini-test");

        let err = load(&[("TELEGRAM_BOT_TOKEN", "t"), ("GEMINI_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config = load(&[("TELEGRAM_BOT_TOKEN", "123:secret"), ("GEMINI_API_KEY", "g-secret")]).unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
    }
}
