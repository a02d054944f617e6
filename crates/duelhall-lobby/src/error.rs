//! Error types for the lobby.

use duelhall_protocol::{ParticipantId, SessionId, SessionStatus};
use duelhall_registry::RegistryError;

/// Errors returned by lobby operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// The join was refused by the registry (bad or duplicate name, ...).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The participant never joined, or has already left.
    #[error("participant {0} has not joined")]
    UnknownParticipant(ParticipantId),

    #[error("no session is in progress")]
    NoActiveSession,

    #[error("participant {0} is not seated in the current session")]
    NotInSession(ParticipantId),

    #[error("session {0} is not active")]
    SessionNotActive(SessionId),

    #[error("it is not {0}'s turn")]
    NotYourTurn(ParticipantId),

    /// The rule engine refused the action.
    #[error("action rejected: {0}")]
    Rejected(String),

    /// A session was asked to start without enough waiting participants.
    #[error("need {needed} waiting participants, have {available}")]
    InsufficientParticipants { needed: usize, available: usize },

    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// The lobby actor has stopped.
    #[error("lobby is unavailable")]
    Unavailable,
}

impl LobbyError {
    /// `true` for errors caused by what the caller sent, as opposed to
    /// lobby-internal failures. These go back to the caller only.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Registry(_)
                | Self::UnknownParticipant(_)
                | Self::NoActiveSession
                | Self::NotInSession(_)
                | Self::SessionNotActive(_)
                | Self::NotYourTurn(_)
                | Self::Rejected(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_converts() {
        let err: LobbyError = RegistryError::EmptyName.into();
        assert_eq!(err, LobbyError::Registry(RegistryError::EmptyName));
        assert_eq!(err.to_string(), "name must not be empty");
    }

    #[test]
    fn test_is_user_error() {
        assert!(LobbyError::NotYourTurn(ParticipantId(1)).is_user_error());
        assert!(LobbyError::Rejected("cell taken".into()).is_user_error());
        assert!(!LobbyError::Unavailable.is_user_error());
        assert!(
            !LobbyError::InsufficientParticipants {
                needed: 2,
                available: 1
            }
            .is_user_error()
        );
    }
}
