//! Who is connected, and who has won what.
//!
//! Two plain data structures, both owned by the lobby actor and never
//! shared across tasks:
//!
//! - [`ParticipantRegistry`]: connected participants, keyed by
//!   [`ParticipantId`](duelhall_protocol::ParticipantId). Validates joins.
//! - [`RankingTable`]: win counts per identity key. Outlives the
//!   connections that earned them.
//!
//! Neither type locks anything. Serialization of access is the lobby's job.

mod config;
mod error;
mod ranking;
mod registry;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use ranking::RankingTable;
pub use registry::{identity_key_for, JoinRequest, ParticipantRegistry};
