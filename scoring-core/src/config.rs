//! Configuration for the scoring core

use serde::{Deserialize, Serialize};

/// Scoring core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Metrics listen address
    pub metrics_listen_addr: String,

    /// Actor configuration
    pub actor: ActorConfig,

    /// Format defaults applied when upstream omits them
    pub match_defaults: MatchDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "scoring-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            metrics_listen_addr: "0.0.0.0:9090".to_string(),
            actor: ActorConfig::default(),
            match_defaults: MatchDefaults::default(),
        }
    }
}

/// Per-match actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Mailbox capacity (bounded channel for backpressure)
    pub mailbox_capacity: usize,

    /// Realtime event channel capacity; lagging subscribers reconcile
    /// from a full snapshot
    pub event_channel_capacity: usize,

    /// Default history page size when a query leaves it at 0
    pub history_page_size: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
            event_channel_capacity: 256,
            history_page_size: 50,
        }
    }
}

/// Match format defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDefaults {
    /// Overs per innings when the format does not say otherwise
    pub overs_limit: u16,
}

impl Default for MatchDefaults {
    fn default() -> Self {
        Self { overs_limit: 20 }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(addr) = std::env::var("SCORING_METRICS_ADDR") {
            config.metrics_listen_addr = addr;
        }

        if let Ok(overs) = std::env::var("SCORING_DEFAULT_OVERS") {
            config.match_defaults.overs_limit = overs
                .parse()
                .map_err(|_| crate::Error::Config(format!("invalid overs limit: {}", overs)))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "scoring-core");
        assert_eq!(config.match_defaults.overs_limit, 20);
        assert_eq!(config.actor.mailbox_capacity, 1000);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.actor.history_page_size, config.actor.history_page_size);
    }
}
