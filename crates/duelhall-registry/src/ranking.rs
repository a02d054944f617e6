//! Cumulative win counts.

use std::collections::HashMap;

use duelhall_protocol::{Participant, RankingEntry};

/// Win counts keyed by identity key.
///
/// Entries are created the first time an identity is seen and are never
/// removed, so a participant who reconnects under the same name keeps
/// their record. Wins only go up.
#[derive(Debug, Default)]
pub struct RankingTable {
    /// First-seen order. Standings sort stably over this.
    entries: Vec<RankingEntry>,
    index: HashMap<String, usize>,
}

impl RankingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `participant`'s identity has an entry and refreshes its
    /// display name and attributes.
    pub fn touch(&mut self, participant: &Participant) -> &RankingEntry {
        let idx = self.slot(participant);
        let entry = &mut self.entries[idx];
        entry.display_name.clone_from(&participant.display_name);
        entry.attributes.clone_from(&participant.attributes);
        entry
    }

    /// Adds one win to `participant`'s identity. Returns the new total.
    pub fn record_win(&mut self, participant: &Participant) -> u32 {
        let idx = self.slot(participant);
        let entry = &mut self.entries[idx];
        entry.wins = entry.wins.saturating_add(1);
        tracing::info!(
            identity = %entry.identity_key,
            wins = entry.wins,
            "win recorded"
        );
        entry.wins
    }

    /// Current wins for an identity, 0 if never seen.
    pub fn wins(&self, identity_key: &str) -> u32 {
        self.get(identity_key).map_or(0, |e| e.wins)
    }

    pub fn get(&self, identity_key: &str) -> Option<&RankingEntry> {
        self.index.get(identity_key).map(|&i| &self.entries[i])
    }

    /// Entries by wins, descending. Ties keep first-seen order.
    pub fn standings(&self) -> Vec<RankingEntry> {
        let mut out = self.entries.clone();
        out.sort_by(|a, b| b.wins.cmp(&a.wins));
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn slot(&mut self, participant: &Participant) -> usize {
        if let Some(&idx) = self.index.get(&participant.identity_key) {
            return idx;
        }
        let idx = self.entries.len();
        self.entries.push(RankingEntry {
            identity_key: participant.identity_key.clone(),
            display_name: participant.display_name.clone(),
            attributes: participant.attributes.clone(),
            wins: 0,
        });
        self.index.insert(participant.identity_key.clone(), idx);
        idx
    }
}
