//! Wire messages exchanged between a client and the server.
//!
//! Clients send bare [`ClientMessage`] frames. Every server frame is an
//! [`Envelope`] around a [`ServerMessage`], so clients can detect gaps
//! through `seq`.
//!
//! Both enums are internally tagged on `type`:
//!
//! ```json
//! { "type": "Join", "version": 1, "name": "Ana", "attributes": { "color": "red" } }
//! { "type": "Action", "action": { "cell": 4 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::{Attributes, Notification, ParticipantId};

/// Protocol revision. A `Join` announcing anything else is refused.
pub const PROTOCOL_VERSION: u32 = 1;

/// Client → server. `A` is the rule engine's action type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage<A> {
    /// Must be the first message on a connection. May be repeated after
    /// a rejected name until one is accepted.
    Join {
        version: u32,
        name: String,
        #[serde(default)]
        attributes: Attributes,
    },

    /// A move or answer for the current turn.
    Action { action: A },

    /// Keep-alive; answered with [`ServerMessage::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    /// Polite goodbye. Equivalent to closing the socket.
    Leave,
}

/// Server → client. `P` is the rule engine's payload type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage<P> {
    /// The join was accepted. `queue_position` is 1-based and absent if
    /// the join immediately started a session.
    Welcome {
        participant_id: ParticipantId,
        queue_position: Option<usize>,
    },

    /// A lobby broadcast (snapshot, session start, session end).
    Event(Notification<P>),

    /// Caller-only error. `code` follows HTTP conventions: 400 for a bad
    /// or out-of-turn action, 409 for a name conflict, 503 when the lobby
    /// is gone.
    Rejected { code: u16, message: String },

    /// Reply to a heartbeat. `server_time` is milliseconds since the
    /// connection was accepted.
    HeartbeatAck { client_time: u64, server_time: u64 },
}

/// Outer frame for everything the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Per-connection sequence number, starting at 0.
    pub seq: u64,
    /// Milliseconds since the connection was accepted.
    pub server_time: u64,
    pub message: T,
}
