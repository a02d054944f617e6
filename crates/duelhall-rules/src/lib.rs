//! Game rules for Duelhall.
//!
//! Each game is a zero-sized type implementing
//! [`RuleEngine`](duelhall_lobby::RuleEngine):
//!
//! - [`GridGame`]: three in a row on a 3x3 board
//! - [`QuizDuel`]: answer questions to bomb the other castle

mod bank;
mod grid;
mod quiz;

pub use grid::{GridBoard, GridGame, GridMove, Mark};
pub use quiz::{
    Answer, Castle, DuelistScore, LastAnswer, Question, QuestionView, QuizConfig, QuizDuel,
    QuizState,
};
