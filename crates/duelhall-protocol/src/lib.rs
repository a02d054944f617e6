//! Shared vocabulary for Duelhall.
//!
//! Everything that crosses a crate boundary or the network lives here:
//!
//! - **Types** ([`Participant`], [`RankingEntry`], [`TerminalResult`],
//!   [`StateSnapshot`], [`Notification`], ...) describing who is
//!   connected, who is queued, and what the live session looks like.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`Envelope`]):
//!   what clients send and what the server pushes back.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, bytes out.
//!
//! ```text
//! Transport (bytes) → Protocol (messages) → Lobby (participants, sessions)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{ClientMessage, Envelope, ServerMessage, PROTOCOL_VERSION};
pub use types::{
    Attributes, Generation, Notification, Participant, ParticipantId,
    RankingEntry, SessionEnded, SessionId, SessionStarted, SessionStatus,
    SessionView, StateSnapshot, TerminalResult,
};
