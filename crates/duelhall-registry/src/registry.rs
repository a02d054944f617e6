//! The participant registry.

use std::collections::HashMap;

use duelhall_protocol::{Attributes, Participant, ParticipantId};

use crate::{RegistryConfig, RegistryError};

/// What a connection supplies when it joins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinRequest {
    pub display_name: String,
    /// Explicit identity. Defaults to [`identity_key_for`] the display name.
    pub identity_key: Option<String>,
    pub attributes: Attributes,
}

impl JoinRequest {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_identity(mut self, identity_key: impl Into<String>) -> Self {
        self.identity_key = Some(identity_key.into());
        self
    }
}

/// Normalized identity for a display name: trimmed and lowercased, so
/// "Ana" and " ana " collide.
pub fn identity_key_for(name: &str) -> String {
    name.trim().to_lowercase()
}

struct Entry {
    /// Join order, used by [`ParticipantRegistry::list`].
    seq: u64,
    participant: Participant,
}

/// Connected participants.
///
/// An identity key maps to at most one connected participant, and a
/// participant id is registered at most once. Removal frees the identity
/// for the next join.
pub struct ParticipantRegistry {
    config: RegistryConfig,
    entries: HashMap<ParticipantId, Entry>,
    identities: HashMap<String, ParticipantId>,
    next_seq: u64,
}

impl ParticipantRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            identities: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Validates `request` and records the participant.
    ///
    /// # Errors
    /// - [`RegistryError::AlreadyRegistered`] if `id` is already present
    /// - [`RegistryError::EmptyName`] / [`RegistryError::NameTooLong`] for
    ///   a bad display name
    /// - [`RegistryError::EmptyIdentity`] if an explicit identity key is blank
    /// - [`RegistryError::IdentityInUse`] if another connected participant
    ///   holds the same identity key
    pub fn register(
        &mut self,
        id: ParticipantId,
        request: JoinRequest,
    ) -> Result<&Participant, RegistryError> {
        if self.entries.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }

        let display_name = request.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let len = display_name.chars().count();
        if len > self.config.max_name_len {
            return Err(RegistryError::NameTooLong {
                max: self.config.max_name_len,
                len,
            });
        }

        let identity_key = match request.identity_key {
            Some(key) => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(RegistryError::EmptyIdentity);
                }
                key.to_string()
            }
            None => identity_key_for(&display_name),
        };
        if self.identities.contains_key(&identity_key) {
            return Err(RegistryError::IdentityInUse(identity_key));
        }

        let participant = Participant {
            id,
            display_name,
            identity_key: identity_key.clone(),
            attributes: request.attributes,
        };
        let seq = self.next_seq;
        self.next_seq += 1;

        tracing::info!(
            participant_id = %id,
            identity = %identity_key,
            "participant registered"
        );

        self.identities.insert(identity_key, id);
        let entry = self.entries.entry(id).or_insert(Entry { seq, participant });
        Ok(&entry.participant)
    }

    /// Removes a participant, freeing its identity. No-op for unknown ids.
    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        let entry = self.entries.remove(&id)?;
        self.identities.remove(&entry.participant.identity_key);
        tracing::info!(participant_id = %id, "participant removed");
        Some(entry.participant)
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.entries.get(&id).map(|e| &e.participant)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.entries.contains_key(&id)
    }

    /// All connected participants in join order.
    pub fn list(&self) -> Vec<Participant> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.participant.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
