use anyhow::{anyhow, Context};
use classdraft_editor::{SaveProfile, SchedulerConfig};
use classdraft_store::HistoryStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "classdraft.config.json";

/// Classdraft configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Scheduler timings by profile name
    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, SchedulerConfig>,

    /// How the store encodes history entries
    #[serde(default)]
    pub history_strategy: HistoryStrategyName,

    /// With the delta strategy, every Nth entry is a full snapshot
    #[serde(default = "default_keyframe_every")]
    pub keyframe_every: usize,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStrategyName {
    #[default]
    Snapshot,
    Delta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_profiles() -> BTreeMap<String, SchedulerConfig> {
    SaveProfile::all()
        .into_iter()
        .map(|profile| (profile.name().to_string(), profile.config()))
        .collect()
}

fn default_keyframe_every() -> usize {
    20
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3030
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str::<Config>(&content)
                .with_context(|| format!("invalid {}", config_path.display()))?
        } else {
            // Return default config if none exists
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, timings) in &self.profiles {
            timings
                .validate()
                .with_context(|| format!("profile '{}'", name))?;
        }
        if self.keyframe_every == 0 {
            return Err(anyhow!("keyframeEvery must be at least 1"));
        }
        Ok(())
    }

    /// Timings for a profile; built-in profiles apply when not overridden
    pub fn profile(&self, name: &str) -> anyhow::Result<SchedulerConfig> {
        if let Some(timings) = self.profiles.get(name) {
            return Ok(*timings);
        }
        let profile: SaveProfile = name.parse()?;
        Ok(profile.config())
    }

    pub fn history_strategy(&self) -> HistoryStrategy {
        match self.history_strategy {
            HistoryStrategyName::Snapshot => HistoryStrategy::Snapshot,
            HistoryStrategyName::Delta => HistoryStrategy::Delta {
                keyframe_every: self.keyframe_every,
            },
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles: default_profiles(),
            history_strategy: HistoryStrategyName::default(),
            keyframe_every: default_keyframe_every(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "profiles": {
                "response": { "debounceMs": 2000, "minIntervalMs": 8000 }
            },
            "historyStrategy": "delta",
            "keyframeEvery": 10,
            "server": { "port": 4000 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.profile("response").unwrap().debounce_ms, 2000);
        // Built-in profile still resolves
        assert_eq!(config.profile("instructions").unwrap().min_interval_ms, 15_000);
        assert_eq!(
            config.history_strategy(),
            HistoryStrategy::Delta { keyframe_every: 10 }
        );
        assert_eq!(config.server_addr(), "127.0.0.1:4000");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.history_strategy(), HistoryStrategy::Snapshot);
        assert_eq!(config.server_addr(), "127.0.0.1:3030");
        assert!(config.profile("draft").is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_rejects_invalid_profile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "profiles": { "response": { "debounceMs": 5000, "minIntervalMs": 1000 } } }"#,
        )
        .unwrap();

        let err = Config::load(dir.path().to_str().unwrap()).unwrap_err();
        assert!(format!("{:#}", err).contains("profile 'response'"));
    }
}
