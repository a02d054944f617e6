//! Three in a row on a 3x3 grid.

use duelhall_lobby::{RuleEngine, Seat, Verdict};
use duelhall_protocol::ParticipantId;
use serde::{Deserialize, Serialize};

/// Cells are numbered row by row:
///
/// ```text
///  0 | 1 | 2
///  3 | 4 | 5
///  6 | 7 | 8
/// ```
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// Seat A plays X.
    pub fn for_seat(seat: Seat) -> Self {
        match seat {
            Seat::A => Self::X,
            Seat::B => Self::O,
        }
    }
}

/// Place a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMove {
    pub cell: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBoard {
    pub cells: [Option<Mark>; 9],
    /// Who holds X and who holds O, for rendering.
    pub players: [ParticipantId; 2],
}

impl GridBoard {
    pub fn new(players: [ParticipantId; 2]) -> Self {
        Self {
            cells: [None; 9],
            players,
        }
    }

    /// The mark that owns a full line, if any.
    pub fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|&[a, b, c]| match self.cells[a] {
            Some(m) if self.cells[b] == Some(m) && self.cells[c] == Some(m) => Some(m),
            _ => None,
        })
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

/// The classic game. No configuration.
pub struct GridGame;

impl RuleEngine for GridGame {
    type Config = ();
    type Payload = GridBoard;
    type Action = GridMove;

    fn init(_config: &(), seats: [ParticipantId; 2]) -> GridBoard {
        GridBoard::new(seats)
    }

    fn apply_action(board: &mut GridBoard, seat: Seat, mv: GridMove) -> Result<Verdict, String> {
        let cell = board
            .cells
            .get_mut(mv.cell)
            .ok_or_else(|| format!("cell {} is off the board", mv.cell))?;
        if cell.is_some() {
            return Err(format!("cell {} is already taken", mv.cell));
        }
        let mark = Mark::for_seat(seat);
        *cell = Some(mark);

        if board.winner() == Some(mark) {
            Ok(Verdict::Win(seat))
        } else if board.is_full() {
            Ok(Verdict::Draw)
        } else {
            Ok(Verdict::Continue)
        }
    }

    fn name() -> &'static str {
        "grid"
    }
}
