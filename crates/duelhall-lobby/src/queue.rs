//! The wait queue.

use std::collections::VecDeque;

use duelhall_protocol::ParticipantId;

use crate::LobbyError;

/// Participants waiting for a seat, front first.
///
/// An id appears at most once. Every operation is linear in the queue
/// length at worst, which is fine for lobby-sized queues.
#[derive(Debug, Default, Clone)]
pub struct WaitQueue {
    entries: VecDeque<ParticipantId>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` unless it is already queued. Returns whether it was
    /// added.
    pub fn enqueue(&mut self, id: ParticipantId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.entries.push_back(id);
        true
    }

    /// Removes and returns the first `n` ids, or nothing at all.
    ///
    /// # Errors
    /// [`LobbyError::InsufficientParticipants`] if fewer than `n` are
    /// waiting. The queue is left untouched.
    pub fn dequeue_front(&mut self, n: usize) -> Result<Vec<ParticipantId>, LobbyError> {
        if self.entries.len() < n {
            return Err(LobbyError::InsufficientParticipants {
                needed: n,
                available: self.entries.len(),
            });
        }
        Ok(self.entries.drain(..n).collect())
    }

    /// Removes `id` if present.
    pub fn remove(&mut self, id: ParticipantId) -> bool {
        match self.entries.iter().position(|&p| p == id) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Puts `id` at the front, moving it there if already queued.
    pub fn requeue_winner(&mut self, id: ParticipantId) {
        self.remove(id);
        self.entries.push_front(id);
    }

    /// Puts `id` at the back, moving it there if already queued.
    pub fn requeue_loser(&mut self, id: ParticipantId) {
        self.remove(id);
        self.entries.push_back(id);
    }

    /// Appends `first` then `second`.
    pub fn requeue_both(&mut self, first: ParticipantId, second: ParticipantId) {
        self.requeue_loser(first);
        self.requeue_loser(second);
    }

    /// 1-based position of `id`.
    pub fn position(&self, id: ParticipantId) -> Option<usize> {
        self.entries.iter().position(|&p| p == id).map(|i| i + 1)
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.entries.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
