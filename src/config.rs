//! `.sprintdesk/config.yaml` and acting-user resolution.

use crate::types::Actor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "config.yaml";

/// Environment variable naming the acting user
pub const USER_ENV: &str = "SPRINTDESK_USER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub issue_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_actor: Option<String>,
}

impl Config {
    pub fn new(issue_prefix: impl Into<String>) -> Self {
        Self {
            issue_prefix: issue_prefix.into(),
            default_actor: None,
        }
    }

    /// Load the config from a data directory
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse {} (is the required 'issue-prefix' field present?)",
                path.display()
            )
        })?;
        if config.issue_prefix.trim().is_empty() {
            anyhow::bail!("{} has an empty 'issue-prefix'", path.display());
        }
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(data_dir.join(CONFIG_FILE), yaml).context("Failed to write config.yaml")?;
        Ok(())
    }
}

/// Pick the acting user: explicit flag, then environment, then config default
pub fn resolve_actor(
    flag: Option<&str>,
    env_value: Option<&str>,
    config: &Config,
) -> Result<Actor> {
    let candidate = [flag, env_value, config.default_actor.as_deref()]
        .into_iter()
        .flatten()
        .find(|id| !id.trim().is_empty());

    match candidate {
        Some(id) => Actor::new(id),
        None => anyhow::bail!(
            "No acting user. Pass --actor, set {}, or run 'sd init --actor <email>'",
            USER_ENV
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new("desk");
        config.default_actor = Some("alice@example.com".to_string());
        config.save(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert!(raw.contains("issue-prefix: desk"));
        assert!(raw.contains("default-actor: alice@example.com"));

        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_missing_prefix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "default-actor: a@b.c\n").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("issue-prefix"));
    }

    #[test]
    fn test_actor_precedence() {
        let mut config = Config::new("sd");
        config.default_actor = Some("config@example.com".to_string());

        let actor = resolve_actor(Some("flag@example.com"), Some("env@example.com"), &config);
        assert_eq!(actor.unwrap().as_str(), "flag@example.com");

        let actor = resolve_actor(None, Some("env@example.com"), &config);
        assert_eq!(actor.unwrap().as_str(), "env@example.com");

        let actor = resolve_actor(None, None, &config);
        assert_eq!(actor.unwrap().as_str(), "config@example.com");

        // A blank env var does not hide the config default
        let actor = resolve_actor(None, Some(""), &config);
        assert_eq!(actor.unwrap().as_str(), "config@example.com");
    }

    #[test]
    fn test_no_actor_available() {
        let config = Config::new("sd");
        let err = resolve_actor(None, Some("  "), &config).unwrap_err();
        assert!(err.to_string().contains("--actor"));
    }
}
