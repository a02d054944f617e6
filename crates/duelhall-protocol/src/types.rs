//! Core data types shared by the lobby, the server, and clients.
//!
//! These describe the lobby as an outside observer sees it: who is
//! connected, who is waiting, who is playing, and who has won how often.
//! The lobby crate owns the live state; everything here is a plain value
//! that can be cloned into a snapshot and serialized onto the wire.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of a connected participant.
///
/// Assigned by the transport layer (one per connection), so the same
/// person reconnecting gets a fresh `ParticipantId`. Continuity across
/// reconnects is carried by [`Participant::identity_key`] instead.
///
/// Serialized as a plain number (`#[serde(transparent)]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier of one match between two participants.
///
/// Never reused: every new pairing gets the next id, even when the same
/// two participants meet again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Turn counter within a session.
///
/// Bumped every time a turn begins. Turn timers carry the generation
/// they were armed for; an expiry whose generation no longer matches the
/// session is stale and gets dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Free-form display attributes chosen at join time (e.g. `color`).
///
/// The lobby never interprets these; it stores them and hands them back
/// in snapshots. A `BTreeMap` keeps the JSON key order stable.
pub type Attributes = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Participant & ranking
// ---------------------------------------------------------------------------

/// A connected participant, as recorded by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// Name shown to other players.
    pub display_name: String,
    /// Stable key for ranking continuity (normalized chosen name).
    pub identity_key: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Cumulative wins for one identity.
///
/// Outlives the connection: a participant who disconnects and later
/// rejoins under the same name picks up their old win count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub identity_key: String,
    pub display_name: String,
    #[serde(default)]
    pub attributes: Attributes,
    pub wins: u32,
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a session.
///
/// ```text
/// Forming → Active → Terminal
/// ```
///
/// - **Forming**: the pair has been dequeued, the payload is being built.
/// - **Active**: turns are being played and the turn timer is armed.
/// - **Terminal**: the outcome is decided. Absorbing; the next match uses
///   a brand-new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Forming,
    Active,
    Terminal,
}

impl SessionStatus {
    /// `true` while the session occupies the single match slot.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Forming | Self::Active)
    }

    /// The only state reachable from this one, or `None` for `Terminal`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Forming => Some(Self::Active),
            Self::Active => Some(Self::Terminal),
            Self::Terminal => None,
        }
    }

    /// Whether `target` is reachable in one step.
    ///
    /// `Forming → Terminal` is also allowed: a participant can drop while
    /// the pair is still being set up.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
            || (self == Self::Forming && target == Self::Terminal)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forming => write!(f, "Forming"),
            Self::Active => write!(f, "Active"),
            Self::Terminal => write!(f, "Terminal"),
        }
    }
}

// ---------------------------------------------------------------------------
// TerminalResult
// ---------------------------------------------------------------------------

/// How a session ended.
///
/// Serialized internally tagged on `kind`:
/// `{ "kind": "Win", "winner": 1, "loser": 2 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TerminalResult {
    /// The rule engine declared a winner.
    Win {
        winner: ParticipantId,
        loser: ParticipantId,
    },
    /// The rule engine declared a draw. Seat order is preserved.
    Draw { participants: [ParticipantId; 2] },
    /// One participant disconnected mid-match; the other wins.
    Abandoned {
        remaining: ParticipantId,
        departed: ParticipantId,
    },
    /// The turn holder let the turn timer run out and forfeits.
    TimedOut {
        timed_out: ParticipantId,
        winner: ParticipantId,
    },
    /// Nobody is left to credit. No ranking change, nobody requeued.
    Discarded,
}

impl TerminalResult {
    /// The participant credited with the win, if any.
    pub fn winner(&self) -> Option<ParticipantId> {
        match *self {
            Self::Win { winner, .. } | Self::TimedOut { winner, .. } => Some(winner),
            Self::Abandoned { remaining, .. } => Some(remaining),
            Self::Draw { .. } | Self::Discarded => None,
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Win { .. } => "win",
            Self::Draw { .. } => "draw",
            Self::Abandoned { .. } => "abandoned",
            Self::TimedOut { .. } => "timed_out",
            Self::Discarded => "discarded",
        }
    }

    /// `true` when the match ended by timeout or disconnect rather than
    /// by a rule-engine verdict.
    pub fn is_forfeit(&self) -> bool {
        matches!(self, Self::Abandoned { .. } | Self::TimedOut { .. })
    }
}

// ---------------------------------------------------------------------------
// Snapshots and notifications
// ---------------------------------------------------------------------------

/// Public view of the live session. `P` is the rule engine's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView<P> {
    pub session_id: SessionId,
    pub generation: Generation,
    pub status: SessionStatus,
    /// Seat A first, seat B second.
    pub participants: [Participant; 2],
    pub turn_of: ParticipantId,
    pub payload: P,
}

/// Everything a client needs to redraw the lobby, assembled after every
/// mutating event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot<P> {
    /// Connected participants in join order.
    pub participants: Vec<Participant>,
    /// Waiting participants, front of the queue first.
    pub queue: Vec<Participant>,
    pub session: Option<SessionView<P>>,
    /// Wins descending, ties in first-seen order.
    pub rankings: Vec<RankingEntry>,
}

/// Emitted once when a pair leaves the queue and their match begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStarted<P> {
    pub session_id: SessionId,
    pub participants: [Participant; 2],
    pub turn_of: ParticipantId,
    pub payload: P,
}

/// Emitted once when a session reaches `Terminal`, before the snapshot
/// that shows the requeued participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEnded {
    pub session_id: SessionId,
    pub result: TerminalResult,
    /// Identity key of the credited winner, if any.
    pub winner_identity: Option<String>,
    pub winner_name: Option<String>,
}

/// Broadcast notifications pushed to every connected participant.
///
/// Internally tagged on `event` so it can nest inside
/// [`ServerMessage`](crate::ServerMessage), which is tagged on `type`.
/// Payloads sit behind `Arc` because the same notification goes to every
/// recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Notification<P> {
    Snapshot(Arc<StateSnapshot<P>>),
    SessionStarted(Arc<SessionStarted<P>>),
    SessionEnded(Arc<SessionEnded>),
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(id: u64, name: &str) -> Participant {
        Participant {
            id: ParticipantId(id),
            display_name: name.into(),
            identity_key: name.to_lowercase(),
            attributes: Attributes::from([("color".into(), "red".into())]),
        }
    }

    #[test]
    fn test_participant_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ParticipantId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ParticipantId(7).to_string(), "P-7");
        assert_eq!(SessionId(3).to_string(), "S-3");
        assert_eq!(Generation(2).to_string(), "gen-2");
    }

    #[test]
    fn test_generation_next_increments() {
        assert_eq!(Generation::default().next(), Generation(1));
        assert_eq!(Generation(41).next(), Generation(42));
    }

    #[test]
    fn test_session_status_strict_order() {
        assert_eq!(SessionStatus::Forming.next(), Some(SessionStatus::Active));
        assert_eq!(SessionStatus::Active.next(), Some(SessionStatus::Terminal));
        assert_eq!(SessionStatus::Terminal.next(), None);
    }

    #[test]
    fn test_session_status_can_transition_to() {
        assert!(SessionStatus::Forming.can_transition_to(SessionStatus::Active));
        assert!(SessionStatus::Forming.can_transition_to(SessionStatus::Terminal));
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Terminal));
        assert!(!SessionStatus::Active.can_transition_to(SessionStatus::Forming));
        assert!(!SessionStatus::Terminal.can_transition_to(SessionStatus::Active));
    }

    #[test]
    fn test_session_status_is_live() {
        assert!(SessionStatus::Forming.is_live());
        assert!(SessionStatus::Active.is_live());
        assert!(!SessionStatus::Terminal.is_live());
    }

    #[test]
    fn test_terminal_result_winner() {
        let (a, b) = (ParticipantId(1), ParticipantId(2));
        assert_eq!(TerminalResult::Win { winner: a, loser: b }.winner(), Some(a));
        assert_eq!(TerminalResult::TimedOut { timed_out: a, winner: b }.winner(), Some(b));
        assert_eq!(
            TerminalResult::Abandoned { remaining: b, departed: a }.winner(),
            Some(b)
        );
        assert_eq!(TerminalResult::Draw { participants: [a, b] }.winner(), None);
        assert_eq!(TerminalResult::Discarded.winner(), None);
    }

    #[test]
    fn test_terminal_result_is_forfeit() {
        let (a, b) = (ParticipantId(1), ParticipantId(2));
        assert!(TerminalResult::TimedOut { timed_out: a, winner: b }.is_forfeit());
        assert!(TerminalResult::Abandoned { remaining: b, departed: a }.is_forfeit());
        assert!(!TerminalResult::Win { winner: a, loser: b }.is_forfeit());
    }

    #[test]
    fn test_terminal_result_json_is_tagged_by_kind() {
        let result = TerminalResult::TimedOut {
            timed_out: ParticipantId(1),
            winner: ParticipantId(2),
        };
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["kind"], "TimedOut");
        assert_eq!(json["timed_out"], 1);
        assert_eq!(json["winner"], 2);

        let json = serde_json::to_value(TerminalResult::Discarded).unwrap();
        assert_eq!(json["kind"], "Discarded");
    }

    #[test]
    fn test_notification_json_is_tagged_by_event() {
        let ended = Notification::<()>::SessionEnded(Arc::new(SessionEnded {
            session_id: SessionId(9),
            result: TerminalResult::Draw {
                participants: [ParticipantId(1), ParticipantId(2)],
            },
            winner_identity: None,
            winner_name: None,
        }));
        let json = serde_json::to_value(&ended).unwrap();
        assert_eq!(json["event"], "SessionEnded");
        assert_eq!(json["session_id"], 9);
        assert_eq!(json["result"]["kind"], "Draw");
        assert!(json["winner_identity"].is_null());
    }

    #[test]
    fn test_snapshot_notification_survives_json() {
        let snapshot = StateSnapshot {
            participants: vec![participant(1, "Ana"), participant(2, "Bo")],
            queue: vec![],
            session: Some(SessionView {
                session_id: SessionId(1),
                generation: Generation(1),
                status: SessionStatus::Active,
                participants: [participant(1, "Ana"), participant(2, "Bo")],
                turn_of: ParticipantId(1),
                payload: vec![0u8, 1, 2],
            }),
            rankings: vec![],
        };
        let note = Notification::Snapshot(Arc::new(snapshot));

        let text = serde_json::to_string(&note).unwrap();
        let back: Notification<Vec<u8>> = serde_json::from_str(&text).unwrap();
        assert_eq!(note, back);
    }
}
