//! Error types for the registry.

use duelhall_protocol::ParticipantId;

/// Reasons a join is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The display name was empty after trimming.
    #[error("name must not be empty")]
    EmptyName,

    #[error("name is {len} characters long, the limit is {max}")]
    NameTooLong { max: usize, len: usize },

    /// Another connected participant already holds this identity.
    #[error("name {0:?} is already in use")]
    IdentityInUse(String),

    /// An explicit identity key was empty after trimming.
    #[error("identity must not be empty")]
    EmptyIdentity,

    /// This connection has already joined.
    #[error("participant {0} is already registered")]
    AlreadyRegistered(ParticipantId),
}
