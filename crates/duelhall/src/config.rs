//! Server configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration:
//!
//! ```toml
//! bind = "0.0.0.0:8080"
//! game = "quiz"
//! turn_timeout_secs = 20
//!
//! [quiz]
//! castle_blocks = 6
//! match_time_limit_secs = 300
//! themes = ["science", "history"]
//! ```

use std::path::Path;
use std::time::Duration;

use duelhall_lobby::LobbyConfig;
use duelhall_registry::RegistryConfig;
use duelhall_rules::QuizConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Which rule engine the server runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    #[default]
    Grid,
    Quiz,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub game: GameKind,
    pub turn_timeout_secs: u64,
    pub max_name_len: usize,
    /// A joined connection silent for this long is closed.
    pub idle_timeout_secs: u64,
    /// Time a new connection has to send an accepted `Join`.
    pub join_timeout_secs: u64,
    /// Only read when `game = "quiz"`.
    pub quiz: QuizConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            game: GameKind::default(),
            turn_timeout_secs: 30,
            max_name_len: 15,
            idle_timeout_secs: 60,
            join_timeout_secs: 10,
            quiz: QuizConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn lobby_config(&self) -> LobbyConfig {
        LobbyConfig::with_turn_timeout(Duration::from_secs(self.turn_timeout_secs.max(1)))
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_name_len: self.max_name_len,
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            join_timeout: Duration::from_secs(self.join_timeout_secs.max(1)),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs.max(1)),
        }
    }
}

/// Per-connection deadlines enforced by the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub join_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
        }
    }
}
