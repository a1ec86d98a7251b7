// Client configuration: CMS root, content token, optional admin token and
// optional scheduler plugin. Normally read from the environment.

use crate::error::ConfigError;
use crate::scheduler::SchedulerPlugin;

pub const DEFAULT_BASE_URL: &str = "http://localhost:1337";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_token: String,
    pub admin_token: Option<String>,
    pub scheduler_plugin: Option<SchedulerPlugin>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            api_token: api_token.into(),
            admin_token: None,
            scheduler_plugin: None,
        }
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn with_scheduler(mut self, plugin: SchedulerPlugin) -> Self {
        self.scheduler_plugin = Some(plugin);
        self
    }

    /// Read `CMS_URL`, `CMS_API_TOKEN`, `CMS_ADMIN_TOKEN` and
    /// `CMS_SCHEDULER_PLUGIN`. Only the content token is mandatory; the URL
    /// falls back to a local CMS on its default port.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get("CMS_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let api_token = get("CMS_API_TOKEN").ok_or(ConfigError::MissingApiToken)?;
        let admin_token = get("CMS_ADMIN_TOKEN");
        let scheduler_plugin = match get("CMS_SCHEDULER_PLUGIN") {
            Some(name) => Some(
                name.trim()
                    .parse::<SchedulerPlugin>()
                    .map_err(|_| ConfigError::UnknownSchedulerPlugin(name))?,
            ),
            None => None,
        };

        Ok(ClientConfig {
            base_url,
            api_token,
            admin_token,
            scheduler_plugin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_base_url_and_optional_fields() {
        let cfg = ClientConfig::from_lookup(lookup(&[("CMS_API_TOKEN", "tok")])).unwrap();
        assert_eq!(cfg, ClientConfig::new(DEFAULT_BASE_URL, "tok"));
    }

    #[test]
    fn reads_all_variables() {
        let cfg = ClientConfig::from_lookup(lookup(&[
            ("CMS_URL", "https://cms.example.com"),
            ("CMS_API_TOKEN", "tok"),
            ("CMS_ADMIN_TOKEN", "admin"),
            ("CMS_SCHEDULER_PLUGIN", "publisher"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "https://cms.example.com");
        assert_eq!(cfg.admin_token.as_deref(), Some("admin"));
        assert_eq!(cfg.scheduler_plugin, Some(SchedulerPlugin::Publisher));
    }

    #[test]
    fn missing_or_empty_api_token_is_an_error() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiToken);

        let err = ClientConfig::from_lookup(lookup(&[("CMS_API_TOKEN", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiToken);
    }

    #[test]
    fn empty_admin_token_counts_as_unset() {
        let cfg = ClientConfig::from_lookup(lookup(&[
            ("CMS_API_TOKEN", "tok"),
            ("CMS_ADMIN_TOKEN", ""),
        ]))
        .unwrap();
        assert!(cfg.admin_token.is_none());
    }

    #[test]
    fn rejects_unknown_scheduler_plugin() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("CMS_API_TOKEN", "tok"),
            ("CMS_SCHEDULER_PLUGIN", "cron"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownSchedulerPlugin("cron".into()));
    }
}
