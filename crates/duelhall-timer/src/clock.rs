//! Whole-session deadlines.

use std::collections::HashMap;
use std::time::Duration;

use duelhall_protocol::SessionId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

use crate::{deadline_after, millis};

/// A session ran out of match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchExpiry {
    pub session_id: SessionId,
}

struct Deadline {
    at: Instant,
    handle: JoinHandle<()>,
}

/// One countdown per session, running across every turn.
///
/// Session ids are never reused, so an expiry needs no generation: the
/// receiver only has to check that the session is still the live one.
pub struct MatchClock {
    tx: mpsc::UnboundedSender<MatchExpiry>,
    deadlines: HashMap<SessionId, Deadline>,
}

impl MatchClock {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MatchExpiry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Self {
            tx,
            deadlines: HashMap::new(),
        };
        (clock, rx)
    }

    /// Starts the session's match clock, replacing any earlier one.
    /// Must be called from inside a Tokio runtime.
    pub fn arm(&mut self, session_id: SessionId, limit: Duration) {
        self.cancel(session_id);

        let at = deadline_after(limit);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            time::sleep_until(at).await;
            trace!(%session_id, "match clock fired");
            let _ = tx.send(MatchExpiry { session_id });
        });

        debug!(%session_id, limit_ms = millis(limit), "match clock armed");
        self.deadlines.insert(session_id, Deadline { at, handle });
    }

    /// Stops the session's clock. Returns `false` if none was running.
    pub fn cancel(&mut self, session_id: SessionId) -> bool {
        match self.deadlines.remove(&session_id) {
            Some(deadline) => {
                deadline.handle.abort();
                trace!(%session_id, "match clock cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, session_id: SessionId) -> bool {
        self.deadlines
            .get(&session_id)
            .is_some_and(|d| !d.handle.is_finished())
    }

    /// Match time left, zero once the clock has fired.
    pub fn remaining(&self, session_id: SessionId) -> Option<Duration> {
        self.deadlines
            .get(&session_id)
            .map(|d| d.at.saturating_duration_since(Instant::now()))
    }
}

impl Drop for MatchClock {
    fn drop(&mut self) {
        for (_, deadline) in self.deadlines.drain() {
            deadline.handle.abort();
        }
    }
}
