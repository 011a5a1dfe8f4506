use std::{collections::HashMap, fs, path::Path, time::Duration};

use thiserror::Error;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("api_base_url '{value}' is not a valid url: {source}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("api_base_url '{0}' must use http or https")]
    UnsupportedScheme(String),
    #[error("api key header must not be empty")]
    EmptyApiKeyHeader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub api_key_header: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000".into(),
            api_key_header: "x-api-key".into(),
            api_key: "local-dev-key".into(),
            request_timeout_secs: 10,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Parsed base url without a trailing slash, so routes can be appended verbatim.
    pub fn base_url(&self) -> Result<String, ConfigError> {
        let raw = self.api_base_url.trim();
        let parsed = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(raw.to_string()));
        }
        Ok(parsed.as_str().trim_end_matches('/').to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;
        if self.api_key_header.trim().is_empty() {
            return Err(ConfigError::EmptyApiKeyHeader);
        }
        Ok(())
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub(crate) fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            apply_file_values(&mut settings, &file_cfg);
        } else {
            tracing::warn!(path = %path.display(), "ignoring unparsable settings file");
        }
    }

    if let Some(v) = env("DASHBOARD_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = env("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = env("DASHBOARD_API_KEY") {
        settings.api_key = v;
    }
    if let Some(v) = env("APP__API_KEY") {
        settings.api_key = v;
    }

    if let Some(v) = env("APP__API_KEY_HEADER") {
        settings.api_key_header = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

fn apply_file_values(settings: &mut ClientSettings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("api_key_header").and_then(toml::Value::as_str) {
        settings.api_key_header = v.to_string();
    }
    if let Some(v) = file_cfg.get("api_key").and_then(toml::Value::as_str) {
        settings.api_key = v.to_string();
    }
    if let Some(v) = file_cfg
        .get("request_timeout_secs")
        .and_then(toml::Value::as_integer)
    {
        if let Ok(secs) = u64::try_from(v) {
            settings.request_timeout_secs = secs;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
