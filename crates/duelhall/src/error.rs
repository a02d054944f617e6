//! Unified error type for the Duelhall server.

use duelhall_lobby::LobbyError;
use duelhall_protocol::ProtocolError;
use duelhall_transport::TransportError;

use crate::ConfigError;

/// Top-level error wrapping every crate-specific error, so `?` works
/// across layers inside the server and the binary deals with one type.
#[derive(Debug, thiserror::Error)]
pub enum DuelhallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
