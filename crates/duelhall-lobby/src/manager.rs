//! The lobby actor: the single writer of registry, rankings, queue and
//! session.
//!
//! Everything outside talks to it through a [`LobbyHandle`]. Turn timer
//! and match clock expiries come in on their own channels that the actor
//! reads in the same `select!`, so a timeout is just another event,
//! processed in order with joins, actions and disconnects.

use std::sync::Arc;

use duelhall_protocol::{
    Generation, Notification, Participant, ParticipantId, SessionEnded, SessionId,
    SessionStarted, SessionStatus, StateSnapshot, TerminalResult,
};
use duelhall_registry::{JoinRequest, ParticipantRegistry, RankingTable, RegistryConfig};
use duelhall_timer::{MatchClock, MatchExpiry, TurnExpiry, TurnTimer};
use tokio::sync::{mpsc, oneshot};

use crate::{
    assemble_snapshot, Broadcaster, LobbyConfig, LobbyError, Outbox, RuleEngine, Seat, Session,
    Verdict, WaitQueue,
};

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReceipt {
    pub participant: Participant,
    /// 1-based position in the wait queue. `None` when the join seated
    /// the participant straight into a new session.
    pub queue_position: Option<usize>,
}

pub(crate) enum LobbyCommand<R: RuleEngine> {
    Join {
        id: ParticipantId,
        request: JoinRequest,
        outbox: Outbox<R::Payload>,
        reply: oneshot::Sender<Result<JoinReceipt, LobbyError>>,
    },
    Action {
        id: ParticipantId,
        action: R::Action,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },
    Disconnect {
        id: ParticipantId,
        reply: oneshot::Sender<()>,
    },
    TimerExpired {
        session_id: SessionId,
        generation: Generation,
        reply: oneshot::Sender<bool>,
    },
    MatchExpired {
        session_id: SessionId,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Arc<StateSnapshot<R::Payload>>>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Front door to a running lobby. Cheap to clone.
pub struct LobbyHandle<R: RuleEngine> {
    sender: mpsc::Sender<LobbyCommand<R>>,
}

impl<R: RuleEngine> Clone for LobbyHandle<R> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<R: RuleEngine> LobbyHandle<R> {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LobbyCommand<R>,
    ) -> Result<T, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| LobbyError::Unavailable)?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }

    /// Registers a participant and queues them. Notifications for the
    /// participant are pushed to `outbox` from now until they disconnect.
    pub async fn join(
        &self,
        id: ParticipantId,
        request: JoinRequest,
        outbox: Outbox<R::Payload>,
    ) -> Result<JoinReceipt, LobbyError> {
        self.request(|reply| LobbyCommand::Join {
            id,
            request,
            outbox,
            reply,
        })
        .await?
    }

    /// Plays `action` for `id` in the current session.
    pub async fn submit_action(
        &self,
        id: ParticipantId,
        action: R::Action,
    ) -> Result<(), LobbyError> {
        self.request(|reply| LobbyCommand::Action { id, action, reply })
            .await?
    }

    /// Removes `id` everywhere. Unknown ids are ignored.
    pub async fn disconnect(&self, id: ParticipantId) -> Result<(), LobbyError> {
        self.request(|reply| LobbyCommand::Disconnect { id, reply })
            .await
    }

    /// Delivers a turn expiry by hand. Returns `false` if it was stale.
    pub async fn expire_turn(
        &self,
        session_id: SessionId,
        generation: Generation,
    ) -> Result<bool, LobbyError> {
        self.request(|reply| LobbyCommand::TimerExpired {
            session_id,
            generation,
            reply,
        })
        .await
    }

    /// Ends `session_id` as if its match clock ran out. Returns `false`
    /// if it is not the live session.
    pub async fn expire_match(&self, session_id: SessionId) -> Result<bool, LobbyError> {
        self.request(|reply| LobbyCommand::MatchExpired { session_id, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<Arc<StateSnapshot<R::Payload>>, LobbyError> {
        self.request(|reply| LobbyCommand::Snapshot { reply }).await
    }

    /// Stops the actor. Outboxes are dropped, which closes every
    /// participant's notification stream.
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.sender
            .send(LobbyCommand::Shutdown)
            .await
            .map_err(|_| LobbyError::Unavailable)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Starts a lobby actor for rule engine `R`. Must be called from inside
/// a Tokio runtime.
pub fn spawn_lobby<R: RuleEngine>(
    config: LobbyConfig,
    registry_config: RegistryConfig,
    rules_config: R::Config,
) -> LobbyHandle<R> {
    let (sender, commands) = mpsc::channel(config.command_buffer.max(1));
    let (timer, expiries) = TurnTimer::new();
    let (clock, deadlines) = MatchClock::new();

    let actor = LobbyActor::<R> {
        config,
        rules_config: R::prepare_config(rules_config),
        registry: ParticipantRegistry::new(registry_config),
        rankings: RankingTable::new(),
        queue: WaitQueue::new(),
        session: None,
        timer,
        clock,
        broadcaster: Broadcaster::new(),
        next_session_id: 1,
    };
    tokio::spawn(actor.run(commands, expiries, deadlines));

    LobbyHandle { sender }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// What an accepted action led to, decided while the session is borrowed
/// and carried out afterwards.
enum ActionOutcome {
    Continued,
    Ended(TerminalResult),
}

struct LobbyActor<R: RuleEngine> {
    config: LobbyConfig,
    rules_config: R::Config,
    registry: ParticipantRegistry,
    rankings: RankingTable,
    queue: WaitQueue,
    /// The one live session. Cleared as soon as it turns terminal.
    session: Option<Session<R::Payload>>,
    timer: TurnTimer,
    clock: MatchClock,
    broadcaster: Broadcaster<R::Payload>,
    next_session_id: u64,
}

impl<R: RuleEngine> LobbyActor<R> {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<LobbyCommand<R>>,
        mut expiries: mpsc::UnboundedReceiver<TurnExpiry>,
        mut deadlines: mpsc::UnboundedReceiver<MatchExpiry>,
    ) {
        tracing::info!(game = R::name(), "lobby started");

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Some(expiry) = expiries.recv() => {
                    self.handle_expiry(expiry.session_id, expiry.generation);
                }
                Some(expiry) = deadlines.recv() => {
                    self.handle_match_expiry(expiry.session_id);
                }
            }
        }

        tracing::info!(game = R::name(), "lobby stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: LobbyCommand<R>) -> bool {
        match cmd {
            LobbyCommand::Join {
                id,
                request,
                outbox,
                reply,
            } => {
                let result = self.handle_join(id, request, outbox);
                let _ = reply.send(result);
            }
            LobbyCommand::Action { id, action, reply } => {
                let result = self.handle_action(id, action);
                let _ = reply.send(result);
            }
            LobbyCommand::Disconnect { id, reply } => {
                self.handle_disconnect(id);
                let _ = reply.send(());
            }
            LobbyCommand::TimerExpired {
                session_id,
                generation,
                reply,
            } => {
                let applied = self.handle_expiry(session_id, generation);
                let _ = reply.send(applied);
            }
            LobbyCommand::MatchExpired { session_id, reply } => {
                let applied = self.handle_match_expiry(session_id);
                let _ = reply.send(applied);
            }
            LobbyCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            LobbyCommand::Shutdown => {
                tracing::info!("lobby shutting down");
                return false;
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        id: ParticipantId,
        request: JoinRequest,
        outbox: Outbox<R::Payload>,
    ) -> Result<JoinReceipt, LobbyError> {
        let participant = self.registry.register(id, request)?.clone();
        self.rankings.touch(&participant);
        self.broadcaster.attach(id, outbox);
        self.queue.enqueue(id);
        tracing::info!(
            participant_id = %id,
            name = %participant.display_name,
            queued = self.queue.len(),
            "participant joined"
        );

        self.try_start();
        let queue_position = self.queue.position(id);
        self.broadcast_snapshot();

        Ok(JoinReceipt {
            participant,
            queue_position,
        })
    }

    fn handle_action(&mut self, id: ParticipantId, action: R::Action) -> Result<(), LobbyError> {
        if !self.registry.contains(id) {
            return Err(LobbyError::UnknownParticipant(id));
        }
        let session = self.session.as_mut().ok_or(LobbyError::NoActiveSession)?;
        let seat = session.seat_of(id).ok_or(LobbyError::NotInSession(id))?;
        if session.status() != SessionStatus::Active {
            return Err(LobbyError::SessionNotActive(session.id));
        }
        if session.turn() != seat {
            tracing::debug!(session_id = %session.id, participant_id = %id, "action out of turn");
            return Err(LobbyError::NotYourTurn(id));
        }

        // Work on a copy so a rejection leaves nothing behind.
        let mut next = session.payload.clone();
        let verdict = match R::apply_action(&mut next, seat, action) {
            Ok(verdict) => verdict,
            Err(reason) => {
                tracing::debug!(
                    session_id = %session.id,
                    participant_id = %id,
                    %reason,
                    "action rejected"
                );
                return Err(LobbyError::Rejected(reason));
            }
        };
        session.payload = next;

        let outcome = match verdict {
            Verdict::Continue => {
                let generation = session.advance_turn()?;
                let (session_id, turn_of) = (session.id, session.turn_of());
                self.timer
                    .arm(session_id, generation, turn_of, self.config.turn_timeout);
                ActionOutcome::Continued
            }
            Verdict::Win(winner) => ActionOutcome::Ended(won_by(session, winner)),
            Verdict::Draw => ActionOutcome::Ended(drawn(session)),
        };

        if let ActionOutcome::Ended(result) = outcome {
            self.conclude(result);
        }
        self.broadcast_snapshot();
        Ok(())
    }

    fn handle_disconnect(&mut self, id: ParticipantId) {
        let removed = self.registry.remove(id);
        self.broadcaster.detach(id);
        self.queue.remove(id);

        if removed.is_none() {
            tracing::debug!(participant_id = %id, "disconnect for unknown participant");
            return;
        }

        let abandoned = self.session.as_ref().and_then(|session| {
            let seat = session.seat_of(id)?;
            let remaining = session.participant(seat.other()).id;
            Some(remaining)
        });

        if let Some(remaining) = abandoned {
            let connected = self.registry.contains(remaining);
            self.conclude(abandonment(remaining, id, connected));
        }

        self.broadcast_snapshot();
    }

    /// Applies a turn expiry unless it is stale. Returns whether it was
    /// applied.
    fn handle_expiry(&mut self, session_id: SessionId, generation: Generation) -> bool {
        let current = self.session.as_ref().filter(|s| {
            s.id == session_id
                && s.generation() == generation
                && s.status() == SessionStatus::Active
        });
        let Some(session) = current else {
            tracing::debug!(%session_id, %generation, "stale turn expiry ignored");
            return false;
        };

        let timed_out = session.turn_of();
        let winner = session.participant(session.turn().other()).id;
        tracing::info!(%session_id, %generation, participant_id = %timed_out, "turn timed out");

        self.conclude(TerminalResult::TimedOut { timed_out, winner });
        self.broadcast_snapshot();
        true
    }

    /// Ends the live session on its match clock. Returns whether
    /// `session_id` was the live, active session.
    fn handle_match_expiry(&mut self, session_id: SessionId) -> bool {
        let current = self
            .session
            .as_ref()
            .filter(|s| s.id == session_id && s.status() == SessionStatus::Active);
        let Some(session) = current else {
            tracing::debug!(%session_id, "stale match expiry ignored");
            return false;
        };

        let result = match R::time_up(&session.payload) {
            Verdict::Win(seat) => won_by(session, seat),
            Verdict::Draw | Verdict::Continue => drawn(session),
        };
        tracing::info!(%session_id, kind = result.kind(), "match time ran out");

        self.conclude(result);
        self.broadcast_snapshot();
        true
    }

    /// Starts a session if the slot is free and two participants wait.
    fn try_start(&mut self) {
        if self.session.as_ref().is_some_and(|s| s.status().is_live()) {
            return;
        }
        if self.queue.len() < 2 {
            return;
        }

        let ids = match self.queue.dequeue_front(2) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "could not start session");
                return;
            }
        };
        let (a, b) = (ids[0], ids[1]);

        let (Some(pa), Some(pb)) = (self.registry.get(a).cloned(), self.registry.get(b).cloned())
        else {
            tracing::error!(
                participant_a = %a,
                participant_b = %b,
                "queued participant missing from registry, start aborted"
            );
            for id in [b, a] {
                if self.registry.contains(id) {
                    self.queue.requeue_winner(id);
                }
            }
            return;
        };

        let session_id = SessionId(self.next_session_id);
        self.next_session_id += 1;

        let payload = R::init(&self.rules_config, [a, b]);
        let mut session = Session::forming(session_id, [pa, pb], payload);
        let generation = match session.activate() {
            Ok(generation) => generation,
            Err(e) => {
                tracing::error!(%session_id, error = %e, "session failed to activate");
                self.queue.requeue_winner(b);
                self.queue.requeue_winner(a);
                return;
            }
        };

        self.timer
            .arm(session_id, generation, a, self.config.turn_timeout);
        if let Some(limit) = R::match_time_limit(&self.rules_config) {
            self.clock.arm(session_id, limit);
        }
        tracing::info!(
            %session_id,
            participant_a = %a,
            participant_b = %b,
            "session started"
        );

        let started = SessionStarted {
            session_id,
            participants: session.participants().clone(),
            turn_of: session.turn_of(),
            payload: session.payload.clone(),
        };
        self.session = Some(session);
        self.broadcaster
            .broadcast(&Notification::SessionStarted(Arc::new(started)));
    }

    /// Terminal epilogue: stop the clock, settle rankings and queue,
    /// announce the result, and try to seat the next pair.
    fn conclude(&mut self, result: TerminalResult) {
        let Some(mut session) = self.session.take() else {
            tracing::warn!(kind = result.kind(), "no session to conclude");
            return;
        };
        self.timer.cancel(session.id);
        self.clock.cancel(session.id);
        if let Err(e) = session.terminate() {
            tracing::warn!(session_id = %session.id, error = %e, "terminating session");
        }

        match result {
            TerminalResult::Win { winner, loser }
            | TerminalResult::TimedOut {
                winner,
                timed_out: loser,
            } => {
                self.credit(&session, winner);
                self.requeue(winner, WaitQueue::requeue_winner);
                self.requeue(loser, WaitQueue::requeue_loser);
            }
            TerminalResult::Draw {
                participants: [first, second],
            } => {
                if self.registry.contains(first) && self.registry.contains(second) {
                    self.queue.requeue_both(first, second);
                } else {
                    self.requeue(first, WaitQueue::requeue_loser);
                    self.requeue(second, WaitQueue::requeue_loser);
                }
            }
            TerminalResult::Abandoned { remaining, .. } => {
                self.credit(&session, remaining);
                self.requeue(remaining, WaitQueue::requeue_winner);
            }
            TerminalResult::Discarded => {}
        }

        let winner = result
            .winner()
            .and_then(|id| session.seat_of(id).map(|seat| session.participant(seat)));
        tracing::info!(
            session_id = %session.id,
            kind = result.kind(),
            winner = ?winner.map(|p| p.id),
            "session ended"
        );
        let ended = SessionEnded {
            session_id: session.id,
            result,
            winner_identity: winner.map(|p| p.identity_key.clone()),
            winner_name: winner.map(|p| p.display_name.clone()),
        };
        self.broadcaster
            .broadcast(&Notification::SessionEnded(Arc::new(ended)));

        self.try_start();
    }

    fn credit(&mut self, session: &Session<R::Payload>, id: ParticipantId) {
        if let Some(seat) = session.seat_of(id) {
            self.rankings.record_win(session.participant(seat));
        }
    }

    /// Requeues `id` if it is still connected.
    fn requeue(&mut self, id: ParticipantId, place: fn(&mut WaitQueue, ParticipantId)) {
        if self.registry.contains(id) {
            place(&mut self.queue, id);
        }
    }

    fn snapshot(&self) -> Arc<StateSnapshot<R::Payload>> {
        assemble_snapshot(
            &self.registry,
            &self.queue,
            self.session.as_ref(),
            &self.rankings,
        )
    }

    fn broadcast_snapshot(&self) {
        self.broadcaster
            .broadcast(&Notification::Snapshot(self.snapshot()));
    }
}

fn won_by<P>(session: &Session<P>, seat: Seat) -> TerminalResult {
    TerminalResult::Win {
        winner: session.participant(seat).id,
        loser: session.participant(seat.other()).id,
    }
}

fn drawn<P>(session: &Session<P>) -> TerminalResult {
    TerminalResult::Draw {
        participants: [
            session.participant(Seat::A).id,
            session.participant(Seat::B).id,
        ],
    }
}

/// Result for a session whose `departed` participant disconnected. With
/// nobody left connected to credit, the session is thrown away.
fn abandonment(
    remaining: ParticipantId,
    departed: ParticipantId,
    remaining_connected: bool,
) -> TerminalResult {
    if remaining_connected {
        TerminalResult::Abandoned {
            remaining,
            departed,
        }
    } else {
        TerminalResult::Discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session<()> {
        let seat = |n: u64, name: &str| Participant {
            id: ParticipantId(n),
            display_name: name.into(),
            identity_key: name.to_lowercase(),
            attributes: Default::default(),
        };
        Session::forming(SessionId(1), [seat(1, "Ana"), seat(2, "Bo")], ())
    }

    #[test]
    fn test_abandonment_credits_connected_opponent() {
        assert_eq!(
            abandonment(ParticipantId(1), ParticipantId(2), true),
            TerminalResult::Abandoned {
                remaining: ParticipantId(1),
                departed: ParticipantId(2),
            }
        );
    }

    #[test]
    fn test_abandonment_without_opponent_is_discarded() {
        assert_eq!(
            abandonment(ParticipantId(1), ParticipantId(2), false),
            TerminalResult::Discarded
        );
    }

    #[test]
    fn test_won_by_and_drawn_use_seat_order() {
        let session = session();
        assert_eq!(
            won_by(&session, Seat::B),
            TerminalResult::Win {
                winner: ParticipantId(2),
                loser: ParticipantId(1),
            }
        );
        assert_eq!(
            drawn(&session),
            TerminalResult::Draw {
                participants: [ParticipantId(1), ParticipantId(2)],
            }
        );
    }
}
