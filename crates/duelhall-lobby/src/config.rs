//! Lobby settings.

use std::time::Duration;

/// Configuration for the lobby actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyConfig {
    /// How long a participant has to act before forfeiting the turn.
    pub turn_timeout: Duration,

    /// Capacity of the actor's command channel. Callers wait when it is
    /// full.
    pub command_buffer: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(30),
            command_buffer: 64,
        }
    }
}

impl LobbyConfig {
    pub fn with_turn_timeout(turn_timeout: Duration) -> Self {
        Self {
            turn_timeout,
            ..Self::default()
        }
    }
}
