//! The `RuleEngine` trait: what a game has to provide.
//!
//! The lobby never looks inside a payload. It seats two participants,
//! asks the engine for an initial payload, and then hands every action
//! from the participant whose turn it is to [`RuleEngine::apply_action`].
//! The verdict decides whether the turn passes or the session ends.
//!
//! A game may also put a clock on the whole session through
//! [`RuleEngine::match_time_limit`]; when it runs out the lobby asks
//! [`RuleEngine::time_up`] who won.

use std::fmt;
use std::time::Duration;

use duelhall_protocol::ParticipantId;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// One of the two seats in a session. Seat A moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    A,
    B,
}

impl Seat {
    /// Index into a `[_; 2]` seat array.
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Outcome of an accepted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Play goes on; the turn passes to the other seat.
    Continue,
    Win(Seat),
    Draw,
}

/// Game rules plugged into the lobby.
///
/// All methods are associated functions: rule engines are stateless and
/// everything they need lives in the payload.
pub trait RuleEngine: Send + Sync + 'static {
    /// Per-lobby settings handed to every [`init`](Self::init).
    type Config: Send + Sync + Clone + Default + 'static;

    /// Game state for one session. Cloned on every action, and shipped to
    /// clients inside snapshots.
    type Payload: Send + Sync + Clone + fmt::Debug + Serialize + 'static;

    /// What a participant sends on their turn.
    type Action: Send + Sync + fmt::Debug + DeserializeOwned + 'static;

    /// Checks and normalizes the config. The lobby calls this once, when
    /// it is spawned, and hands the result to every [`init`](Self::init).
    fn prepare_config(config: Self::Config) -> Self::Config {
        config
    }

    /// Builds the payload for a fresh session. `seats[0]` is seat A.
    fn init(config: &Self::Config, seats: [ParticipantId; 2]) -> Self::Payload;

    /// Applies `seat`'s action.
    ///
    /// Returning `Err` rejects the action; the lobby discards whatever
    /// the engine did to `payload` before failing.
    fn apply_action(
        payload: &mut Self::Payload,
        seat: Seat,
        action: Self::Action,
    ) -> Result<Verdict, String>;

    /// Wall-clock limit for a whole session. `None`, the default, lets a
    /// session run until the rules or the turn timer end it.
    fn match_time_limit(_config: &Self::Config) -> Option<Duration> {
        None
    }

    /// Decides a session whose match time ran out. `Continue` is read as
    /// a draw.
    fn time_up(_payload: &Self::Payload) -> Verdict {
        Verdict::Draw
    }

    /// Short name for logs.
    fn name() -> &'static str {
        "game"
    }
}
