//! One match between two seated participants.

use duelhall_protocol::{
    Generation, Participant, ParticipantId, SessionId, SessionStatus, SessionView,
};

use crate::{LobbyError, Seat};

/// A live match.
///
/// Created `Forming`, moved to `Active` once the payload is ready, and
/// to `Terminal` when it ends. A terminal session is never reused; the
/// lobby builds a new one for the next match.
///
/// `generation` changes every time the turn timer is re-armed, so an
/// expiry tagged with an older generation can be told apart from the
/// current one.
#[derive(Debug, Clone)]
pub struct Session<P> {
    pub id: SessionId,
    seats: [Participant; 2],
    turn: Seat,
    pub payload: P,
    status: SessionStatus,
    generation: Generation,
}

impl<P> Session<P> {
    /// A new session in `Forming` with seat A to move.
    pub fn forming(id: SessionId, seats: [Participant; 2], payload: P) -> Self {
        Self {
            id,
            seats,
            turn: Seat::A,
            payload,
            status: SessionStatus::Forming,
            generation: Generation::default(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    /// The participant whose turn it is.
    pub fn turn_of(&self) -> ParticipantId {
        self.seats[self.turn.index()].id
    }

    pub fn participant(&self, seat: Seat) -> &Participant {
        &self.seats[seat.index()]
    }

    pub fn participants(&self) -> &[Participant; 2] {
        &self.seats
    }

    pub fn seat_of(&self, id: ParticipantId) -> Option<Seat> {
        if self.seats[0].id == id {
            Some(Seat::A)
        } else if self.seats[1].id == id {
            Some(Seat::B)
        } else {
            None
        }
    }

    /// `Forming → Active`. Starts the first generation.
    pub fn activate(&mut self) -> Result<Generation, LobbyError> {
        self.transition(SessionStatus::Active)?;
        self.generation = self.generation.next();
        Ok(self.generation)
    }

    /// Passes the turn to the other seat and starts a new generation.
    pub fn advance_turn(&mut self) -> Result<Generation, LobbyError> {
        if self.status != SessionStatus::Active {
            return Err(LobbyError::SessionNotActive(self.id));
        }
        self.turn = self.turn.other();
        self.generation = self.generation.next();
        Ok(self.generation)
    }

    /// Moves to `Terminal`, from either `Forming` or `Active`.
    pub fn terminate(&mut self) -> Result<(), LobbyError> {
        self.transition(SessionStatus::Terminal)
    }

    fn transition(&mut self, to: SessionStatus) -> Result<(), LobbyError> {
        if !self.status.can_transition_to(to) {
            return Err(LobbyError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        tracing::debug!(session_id = %self.id, from = %self.status, %to, "session transition");
        self.status = to;
        Ok(())
    }
}

impl<P: Clone> Session<P> {
    pub fn view(&self) -> SessionView<P> {
        SessionView {
            session_id: self.id,
            generation: self.generation,
            status: self.status,
            participants: self.seats.clone(),
            turn_of: self.turn_of(),
            payload: self.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use duelhall_protocol::Attributes;

    use super::*;

    fn participant(id: u64) -> Participant {
        Participant {
            id: ParticipantId(id),
            display_name: format!("p{id}"),
            identity_key: format!("p{id}"),
            attributes: Attributes::new(),
        }
    }

    fn session() -> Session<u32> {
        Session::forming(SessionId(1), [participant(10), participant(20)], 0)
    }

    #[test]
    fn test_forming_starts_with_seat_a() {
        let s = session();
        assert_eq!(s.status(), SessionStatus::Forming);
        assert_eq!(s.turn_of(), ParticipantId(10));
        assert_eq!(s.generation(), Generation(0));
    }

    #[test]
    fn test_activate_bumps_generation() {
        let mut s = session();
        assert_eq!(s.activate().unwrap(), Generation(1));
        assert_eq!(s.status(), SessionStatus::Active);
    }

    #[test]
    fn test_activate_twice_fails() {
        let mut s = session();
        s.activate().unwrap();
        let err = s.activate().unwrap_err();
        assert_eq!(
            err,
            LobbyError::InvalidTransition {
                from: SessionStatus::Active,
                to: SessionStatus::Active
            }
        );
    }

    #[test]
    fn test_advance_turn_alternates() {
        let mut s = session();
        s.activate().unwrap();
        s.advance_turn().unwrap();
        assert_eq!(s.turn_of(), ParticipantId(20));
        s.advance_turn().unwrap();
        assert_eq!(s.turn_of(), ParticipantId(10));
        assert_eq!(s.generation(), Generation(3));
    }

    #[test]
    fn test_advance_turn_requires_active() {
        let mut s = session();
        assert_eq!(
            s.advance_turn().unwrap_err(),
            LobbyError::SessionNotActive(SessionId(1))
        );
    }

    #[test]
    fn test_terminate_from_forming_or_active() {
        let mut forming = session();
        assert!(forming.terminate().is_ok());

        let mut active = session();
        active.activate().unwrap();
        assert!(active.terminate().is_ok());
        assert!(active.terminate().is_err());
        assert!(active.advance_turn().is_err());
    }

    #[test]
    fn test_seat_of() {
        let s = session();
        assert_eq!(s.seat_of(ParticipantId(10)), Some(Seat::A));
        assert_eq!(s.seat_of(ParticipantId(20)), Some(Seat::B));
        assert_eq!(s.seat_of(ParticipantId(30)), None);
    }

    #[test]
    fn test_view_reflects_current_turn() {
        let mut s = session();
        s.activate().unwrap();
        s.advance_turn().unwrap();
        s.payload = 7;
        let view = s.view();
        assert_eq!(view.turn_of, ParticipantId(20));
        assert_eq!(view.payload, 7);
        assert_eq!(view.generation, Generation(2));
    }
}
