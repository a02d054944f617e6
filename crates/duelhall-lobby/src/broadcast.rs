//! Fan-out of lobby notifications and snapshot assembly.

use std::collections::HashMap;
use std::sync::Arc;

use duelhall_protocol::{Notification, ParticipantId, StateSnapshot};
use duelhall_registry::{ParticipantRegistry, RankingTable};
use tokio::sync::mpsc;

use crate::{Session, WaitQueue};

/// Where a participant's notifications go. Unbounded, so the lobby never
/// waits on a slow connection.
pub type Outbox<P> = mpsc::UnboundedSender<Notification<P>>;

/// Per-participant outboxes.
pub struct Broadcaster<P> {
    outboxes: HashMap<ParticipantId, Outbox<P>>,
}

impl<P> Broadcaster<P> {
    pub fn new() -> Self {
        Self {
            outboxes: HashMap::new(),
        }
    }

    pub fn attach(&mut self, id: ParticipantId, outbox: Outbox<P>) {
        self.outboxes.insert(id, outbox);
    }

    pub fn detach(&mut self, id: ParticipantId) -> bool {
        self.outboxes.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }
}

impl<P: Clone> Broadcaster<P> {
    /// Sends to everyone attached. Closed outboxes are skipped; their
    /// owners are on their way to a disconnect.
    pub fn broadcast(&self, notification: &Notification<P>) {
        for outbox in self.outboxes.values() {
            let _ = outbox.send(notification.clone());
        }
    }
}

impl<P> Default for Broadcaster<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds an immutable snapshot of the whole lobby.
///
/// Queue entries are resolved through the registry; the queue only ever
/// holds registered ids.
pub fn assemble_snapshot<P: Clone>(
    registry: &ParticipantRegistry,
    queue: &WaitQueue,
    session: Option<&Session<P>>,
    rankings: &RankingTable,
) -> Arc<StateSnapshot<P>> {
    Arc::new(StateSnapshot {
        participants: registry.list(),
        queue: queue
            .iter()
            .filter_map(|id| registry.get(id).cloned())
            .collect(),
        session: session.map(Session::view),
        rankings: rankings.standings(),
    })
}

#[cfg(test)]
mod tests {
    use duelhall_protocol::{SessionEnded, SessionId, TerminalResult};
    use duelhall_registry::JoinRequest;

    use super::*;

    fn ended() -> Notification<()> {
        Notification::SessionEnded(Arc::new(SessionEnded {
            session_id: SessionId(1),
            result: TerminalResult::Discarded,
            winner_identity: None,
            winner_name: None,
        }))
    }

    #[test]
    fn test_broadcast_reaches_every_outbox() {
        let mut b = Broadcaster::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        b.attach(ParticipantId(1), tx1);
        b.attach(ParticipantId(2), tx2);

        b.broadcast(&ended());
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_skips_closed_outbox() {
        let mut b = Broadcaster::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        b.attach(ParticipantId(1), tx1);
        b.attach(ParticipantId(2), tx2);
        drop(rx1);

        b.broadcast(&ended());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_detached_outbox_gets_nothing() {
        let mut b = Broadcaster::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        b.attach(ParticipantId(1), tx);
        assert!(b.detach(ParticipantId(1)));
        assert!(!b.detach(ParticipantId(1)));

        b.broadcast(&ended());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_snapshot_resolves_queue_through_registry() {
        let mut registry = ParticipantRegistry::default();
        registry.register(ParticipantId(1), JoinRequest::named("Ana")).unwrap();
        registry.register(ParticipantId(2), JoinRequest::named("Bo")).unwrap();
        let mut queue = WaitQueue::new();
        queue.enqueue(ParticipantId(2));
        queue.enqueue(ParticipantId(1));

        let snap = assemble_snapshot::<()>(&registry, &queue, None, &RankingTable::new());
        let queued: Vec<&str> = snap.queue.iter().map(|p| p.display_name.as_str()).collect();
        assert_eq!(queued, vec!["Bo", "Ana"]);
        assert_eq!(snap.participants.len(), 2);
        assert!(snap.session.is_none());
    }
}
