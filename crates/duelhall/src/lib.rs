//! # Duelhall
//!
//! A server for turn-based two-player games. Exactly one session is live
//! at a time; everybody else waits in a FIFO queue, and the outcome of
//! each session decides who plays next.
//!
//! The game itself is a [`RuleEngine`](duelhall_lobby::RuleEngine). Two
//! ship with the crate ([`GridGame`](duelhall_rules::GridGame) and
//! [`QuizDuel`](duelhall_rules::QuizDuel)); anything else only needs an
//! `init` and an `apply_action`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use duelhall::prelude::*;
//!
//! # async fn run() -> Result<(), DuelhallError> {
//! let server = DuelhallServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build::<GridGame>(())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ConnectionConfig, GameKind, ServerConfig};
pub use error::DuelhallError;
pub use server::{DuelhallServer, DuelhallServerBuilder};

pub mod prelude {
    pub use crate::{
        ConfigError, ConnectionConfig, DuelhallError, DuelhallServer, DuelhallServerBuilder,
        GameKind, ServerConfig,
    };
    pub use duelhall_lobby::{
        LobbyConfig, LobbyError, LobbyHandle, RuleEngine, Seat, Verdict,
    };
    pub use duelhall_protocol::{
        ClientMessage, Envelope, Notification, Participant, ParticipantId, RankingEntry,
        ServerMessage, SessionId, StateSnapshot, TerminalResult, PROTOCOL_VERSION,
    };
    pub use duelhall_registry::RegistryConfig;
    pub use duelhall_rules::{
        Answer, GridBoard, GridGame, GridMove, Mark, QuizConfig, QuizDuel, QuizState,
    };
}
