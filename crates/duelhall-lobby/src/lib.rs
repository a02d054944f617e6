//! Matchmaking and session lifecycle for Duelhall.
//!
//! A single actor task (the lobby) owns every piece of mutable state:
//! the participant registry, the ranking table, the [`WaitQueue`], the
//! one live [`Session`], the turn timer and the match clock. Joins,
//! actions, disconnects and timer expiries are all read by that one task
//! and handled to completion one at a time, so no two events ever
//! observe each other half-applied.
//!
//! # Key types
//!
//! - [`RuleEngine`]: the trait each game implements
//! - [`LobbyHandle`]: cheap, cloneable front door to the actor
//! - [`spawn_lobby`]: starts the actor
//! - [`WaitQueue`]: FIFO of participants waiting for a seat
//! - [`Session`]: one match, `Forming → Active → Terminal`

mod broadcast;
mod config;
mod error;
mod manager;
mod queue;
mod rules;
mod session;

pub use broadcast::{assemble_snapshot, Broadcaster, Outbox};
pub use config::LobbyConfig;
pub use error::LobbyError;
pub use manager::{spawn_lobby, JoinReceipt, LobbyHandle};
pub use queue::WaitQueue;
pub use rules::{RuleEngine, Seat, Verdict};
pub use session::Session;
