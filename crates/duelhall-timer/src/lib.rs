//! Per-turn timers for Duelhall sessions.
//!
//! A [`TurnTimer`] never touches session state. When a turn runs out it
//! sends a [`TurnExpiry`] down a channel, and whoever owns the sessions
//! (the lobby actor) reads that channel in the same `select!` loop as
//! every other command:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* join, action, ... */ }
//!         Some(expiry) = expiries.recv() => { /* check generation, forfeit */ }
//!     }
//! }
//! ```
//!
//! Each expiry carries the [`Generation`] it was armed for. Cancelling a
//! timer aborts its task, but a task that already fired may have an
//! expiry sitting in the channel; the receiver must compare generations
//! and drop anything stale.
//!
//! A [`MatchClock`] is the coarser sibling: one deadline for a whole
//! session, reported as a [`MatchExpiry`] on its own channel.

mod clock;

pub use clock::{MatchClock, MatchExpiry};

use std::collections::HashMap;
use std::time::Duration;

use duelhall_protocol::{Generation, ParticipantId, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Expiry event
// ---------------------------------------------------------------------------

/// A turn ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnExpiry {
    pub session_id: SessionId,
    /// Generation the timer was armed for.
    pub generation: Generation,
    /// Whose turn it was when the timer was armed.
    pub turn_owner: ParticipantId,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// Roughly 30 years, the same horizon Tokio uses for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + duration`, saturating instead of panicking on overflow.
fn deadline_after(duration: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(duration).unwrap_or(now + FAR_FUTURE)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

struct Armed {
    generation: Generation,
    deadline: Instant,
    handle: JoinHandle<()>,
}

/// Single-shot, cancellable turn timers, at most one per session.
pub struct TurnTimer {
    tx: mpsc::UnboundedSender<TurnExpiry>,
    armed: HashMap<SessionId, Armed>,
}

impl TurnTimer {
    /// Creates a timer and the receiver its expiries arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TurnExpiry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let timer = Self {
            tx,
            armed: HashMap::new(),
        };
        (timer, rx)
    }

    /// Starts the countdown for `turn_owner`'s turn in `session_id`.
    ///
    /// Any timer already armed for the session is cancelled first.
    /// Must be called from inside a Tokio runtime.
    pub fn arm(
        &mut self,
        session_id: SessionId,
        generation: Generation,
        turn_owner: ParticipantId,
        duration: Duration,
    ) {
        self.cancel(session_id);

        let deadline = deadline_after(duration);
        let tx = self.tx.clone();
        let expiry = TurnExpiry {
            session_id,
            generation,
            turn_owner,
        };
        let handle = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            trace!(%session_id, %generation, "turn timer fired");
            // The receiver is gone only when the lobby is shutting down.
            let _ = tx.send(expiry);
        });

        debug!(
            %session_id,
            %generation,
            %turn_owner,
            timeout_ms = millis(duration),
            "turn timer armed"
        );
        self.armed.insert(
            session_id,
            Armed {
                generation,
                deadline,
                handle,
            },
        );
    }

    /// Cancels the session's timer. Returns `false` if none was armed.
    pub fn cancel(&mut self, session_id: SessionId) -> bool {
        match self.armed.remove(&session_id) {
            Some(armed) => {
                armed.handle.abort();
                trace!(%session_id, generation = %armed.generation, "turn timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a timer for the session is still counting down.
    pub fn is_armed(&self, session_id: SessionId) -> bool {
        self.armed
            .get(&session_id)
            .is_some_and(|a| !a.handle.is_finished())
    }

    /// Generation of the session's most recently armed timer.
    pub fn armed_generation(&self, session_id: SessionId) -> Option<Generation> {
        self.armed.get(&session_id).map(|a| a.generation)
    }

    /// Time left on the session's timer, zero once it has fired.
    pub fn remaining(&self, session_id: SessionId) -> Option<Duration> {
        self.armed
            .get(&session_id)
            .map(|a| a.deadline.saturating_duration_since(Instant::now()))
    }

    /// Number of sessions with a live timer.
    pub fn armed_count(&self) -> usize {
        self.armed
            .values()
            .filter(|a| !a.handle.is_finished())
            .count()
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        for (_, armed) in self.armed.drain() {
            armed.handle.abort();
        }
    }
}
