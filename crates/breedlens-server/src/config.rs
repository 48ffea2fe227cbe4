//! Server configuration

use breedlens_inference::{DEFAULT_BASE_URL, DEFAULT_DETECTOR_MODEL, DEFAULT_PRIMARY_MODEL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which gate runs ahead of primary classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// No gate; uploads go straight to classification
    #[default]
    Off,
    /// Label watchlist over a secondary classifier
    Watchlist,
    /// Geometric face/person regions from a hosted detector
    Face,
}

impl FromStr for GateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "watchlist" => Ok(Self::Watchlist),
            "face" => Ok(Self::Face),
            other => Err(format!("unknown gate mode {other:?}, expected off|watchlist|face")),
        }
    }
}

/// CLI overrides applied on top of the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub gate: Option<GateMode>,
    pub model: Option<String>,
    pub top_n: Option<usize>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hosted inference API base URL
    #[serde(default = "default_base_url")]
    pub inference_base_url: String,

    /// Primary classification model id
    #[serde(default = "default_primary_model")]
    pub primary_model: String,

    /// Gate mode
    #[serde(default)]
    pub gate: GateMode,

    /// Secondary detector model id (watchlist and face gates)
    #[serde(default = "default_detector_model")]
    pub detector_model: String,

    /// Labels that suppress classification (watchlist gate)
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,

    /// Number of predictions displayed and exported
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Per-call inference timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How many classification records are kept in memory
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Optional secrets file holding the bearer token
    #[serde(default)]
    pub secrets_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Overrides) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config: Self = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(gate) = cli.gate {
            config.gate = gate;
        }
        if let Some(model) = &cli.model {
            config.primary_model = model.clone();
        }
        if let Some(top_n) = cli.top_n {
            config.top_n = top_n;
        }

        if config.top_n == 0 {
            anyhow::bail!("top_n must be at least 1");
        }

        Ok(config)
    }

    /// Sanitized view for the config endpoint; never includes credential
    /// material, only whether a credential was resolved.
    pub fn sanitized(&self, credential_present: bool) -> serde_json::Value {
        serde_json::json!({
            "inference_base_url": self.inference_base_url,
            "primary_model": self.primary_model,
            "gate": self.gate,
            "detector_model": self.detector_model,
            "top_n": self.top_n,
            "timeout_secs": self.timeout_secs,
            "credential_present": credential_present,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            inference_base_url: default_base_url(),
            primary_model: default_primary_model(),
            gate: GateMode::Off,
            detector_model: default_detector_model(),
            watchlist: default_watchlist(),
            top_n: default_top_n(),
            timeout_secs: default_timeout_secs(),
            history_capacity: default_history_capacity(),
            secrets_file: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_primary_model() -> String {
    DEFAULT_PRIMARY_MODEL.to_string()
}

fn default_detector_model() -> String {
    DEFAULT_DETECTOR_MODEL.to_string()
}

fn default_watchlist() -> Vec<String> {
    breedlens_inference::DEFAULT_WATCHLIST
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_top_n() -> usize {
    breedlens_pipeline::DEFAULT_TOP_N
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_history_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = ServerConfig::default();
        assert_eq!(config.primary_model, "google/vit-base-patch16-224");
        assert_eq!(config.gate, GateMode::Off);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.watchlist, vec!["person", "human"]);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: ServerConfig = serde_yaml::from_str("gate: watchlist\ntop_n: 5\n").unwrap();
        assert_eq!(config.gate, GateMode::Watchlist);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.primary_model, "google/vit-base-patch16-224");
    }

    #[test]
    fn gate_mode_parses_case_insensitively() {
        assert_eq!("WATCHLIST".parse::<GateMode>().unwrap(), GateMode::Watchlist);
        assert_eq!("face".parse::<GateMode>().unwrap(), GateMode::Face);
        assert!("faces".parse::<GateMode>().is_err());
    }

    #[test]
    fn sanitized_view_has_no_secret_fields() {
        let config = ServerConfig {
            secrets_file: Some(PathBuf::from("/etc/breedlens/token")),
            ..Default::default()
        };
        let view = config.sanitized(true);
        assert!(view.get("secrets_file").is_none());
        assert_eq!(view["credential_present"], true);
    }
}
