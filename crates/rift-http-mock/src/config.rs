//! Router configuration.

use crate::pattern::parse_url;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_ASSERT_ALL_CALLED: &str = "RIFT_MOCK_ASSERT_ALL_CALLED";
pub const ENV_ASSERT_ALL_MOCKED: &str = "RIFT_MOCK_ASSERT_ALL_MOCKED";
pub const ENV_BASE_URL: &str = "RIFT_MOCK_BASE_URL";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouterConfig {
    /// Fail scope teardown when a registered route was never called.
    #[serde(default = "default_true", alias = "assertAllCalled")]
    pub assert_all_called: bool,

    /// Fail resolution of requests no route matches, instead of answering 200.
    #[serde(default = "default_true", alias = "assertAllMocked")]
    pub assert_all_mocked: bool,

    /// Prefix applied to every route registered afterwards.
    #[serde(default, alias = "baseUrl", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            assert_all_called: true,
            assert_all_mocked: true,
            base_url: None,
        }
    }
}

impl RouterConfig {
    /// Load from a YAML file, or JSON when the extension is `.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: RouterConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults with `RIFT_MOCK_*` environment overrides applied.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::default().with_env_overrides()
    }

    /// Apply `RIFT_MOCK_*` environment overrides on top of this config.
    pub fn with_env_overrides(self) -> Result<Self, anyhow::Error> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, anyhow::Error> {
        if let Some(value) = lookup(ENV_ASSERT_ALL_CALLED) {
            self.assert_all_called = parse_flag(ENV_ASSERT_ALL_CALLED, &value)?;
        }
        if let Some(value) = lookup(ENV_ASSERT_ALL_MOCKED) {
            self.assert_all_mocked = parse_flag(ENV_ASSERT_ALL_MOCKED, &value)?;
        }
        if let Some(value) = lookup(ENV_BASE_URL) {
            self.base_url = Some(value).filter(|v| !v.is_empty());
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(base_url) = &self.base_url {
            let url = parse_url(base_url)
                .map_err(|e| anyhow::anyhow!("Invalid base_url '{base_url}': {e}"))?;
            if url.scheme.is_none() || url.host.is_none() {
                anyhow::bail!(
                    "Invalid base_url '{}': a scheme and host are required, e.g. 'https://api.example.com/v1/'",
                    base_url
                );
            }
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, anyhow::Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{key} must be a boolean, got '{other}'"),
    }
}
