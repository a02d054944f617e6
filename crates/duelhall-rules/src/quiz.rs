//! Quiz duel: answer correctly to bomb the other castle.
//!
//! Each duelist owns a castle of blocks. Turns alternate; on your turn
//! you answer the current question. A correct answer earns a bomb that
//! immediately knocks out one intact block of the opponent's castle.
//! Every `repair_streak` correct answers in a row also rebuild one of
//! your own destroyed blocks. Flatten the other castle to win. When the
//! deck runs out, or the match clock does, the castle with more blocks
//! standing wins.

use std::time::Duration;

use duelhall_lobby::{RuleEngine, Seat, Verdict};
use duelhall_protocol::ParticipantId;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::bank;

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// A multiple-choice question. `answer` is never serialized, so a
/// question can be read from config but not leaked to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub theme: String,
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`.
    #[serde(skip_serializing)]
    pub answer: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// What clients see of the question being answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub number: usize,
    pub theme: String,
    pub prompt: String,
    pub options: Vec<String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub castle_blocks: usize,
    pub questions_per_match: usize,
    /// Consecutive correct answers needed for one repair.
    pub repair_streak: u32,
    /// Restrict draws to these themes. Empty means every theme.
    pub themes: Vec<String>,
    /// Length of a whole match in seconds. `0` turns the clock off.
    pub match_time_limit_secs: u64,
    /// Question bank. Empty means the built-in bank.
    pub bank: Vec<Question>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            castle_blocks: 9,
            questions_per_match: 20,
            repair_streak: 5,
            themes: Vec::new(),
            match_time_limit_secs: 600,
            bank: Vec::new(),
        }
    }
}

impl QuizConfig {
    /// Drops malformed questions and clamps counts to at least 1.
    pub fn validated(mut self) -> Self {
        self.castle_blocks = self.castle_blocks.max(1);
        self.questions_per_match = self.questions_per_match.max(1);
        self.repair_streak = self.repair_streak.max(1);

        let before = self.bank.len();
        self.bank.retain(|q| q.answer < q.options.len());
        if self.bank.len() < before {
            tracing::warn!(
                dropped = before - self.bank.len(),
                "questions with an out-of-range answer were dropped"
            );
        }
        self
    }

    /// Questions eligible for a match, after theme filtering. Falls back
    /// to the whole bank, then to the built-in one, rather than return
    /// nothing.
    fn candidates(&self) -> Vec<Question> {
        let bank = if self.bank.is_empty() {
            bank::builtin()
        } else {
            self.bank.clone()
        };
        if self.themes.is_empty() {
            return bank;
        }
        let filtered: Vec<Question> = bank
            .iter()
            .filter(|q| self.themes.iter().any(|t| t == &q.theme))
            .cloned()
            .collect();
        if filtered.is_empty() {
            tracing::warn!(themes = ?self.themes, "no questions for the configured themes");
            bank
        } else {
            filtered
        }
    }

    fn draw_deck(&self) -> Vec<Question> {
        let mut deck = self.candidates();
        deck.shuffle(&mut rand::rng());
        deck.truncate(self.questions_per_match);
        deck
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// One castle. `true` is a standing block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Castle {
    pub blocks: Vec<bool>,
}

impl Castle {
    fn new(size: usize) -> Self {
        Self {
            blocks: vec![true; size],
        }
    }

    pub fn intact(&self) -> usize {
        self.blocks.iter().filter(|&&b| b).count()
    }

    pub fn is_destroyed(&self) -> bool {
        self.intact() == 0
    }

    fn first_intact(&self) -> Option<usize> {
        self.blocks.iter().position(|&b| b)
    }

    fn first_destroyed(&self) -> Option<usize> {
        self.blocks.iter().position(|&b| !b)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuelistScore {
    pub correct: u32,
    pub wrong: u32,
    pub streak: u32,
    /// Bombs landed on the opponent's castle.
    pub hits: u32,
    pub repairs: u32,
}

/// The outcome of the previous answer, shown to both duelists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastAnswer {
    pub seat: Seat,
    pub chosen: usize,
    pub correct: bool,
    pub correct_option: usize,
    pub explanation: Option<String>,
    /// Opponent block knocked out, if any.
    pub hit: Option<usize>,
    /// Own block rebuilt, if any.
    pub repaired: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizState {
    pub players: [ParticipantId; 2],
    pub castles: [Castle; 2],
    pub scores: [DuelistScore; 2],
    /// Questions answered so far.
    pub round: usize,
    pub total_rounds: usize,
    pub current: Option<QuestionView>,
    pub last: Option<LastAnswer>,
    repair_streak: u32,
    #[serde(skip)]
    deck: Vec<Question>,
}

impl QuizState {
    fn new(config: &QuizConfig, players: [ParticipantId; 2], deck: Vec<Question>) -> Self {
        let mut state = Self {
            players,
            castles: [
                Castle::new(config.castle_blocks),
                Castle::new(config.castle_blocks),
            ],
            scores: Default::default(),
            round: 0,
            total_rounds: deck.len(),
            current: None,
            last: None,
            repair_streak: config.repair_streak,
            deck,
        };
        state.refresh_current();
        state
    }

    fn refresh_current(&mut self) {
        self.current = self.deck.get(self.round).map(|q| QuestionView {
            number: self.round + 1,
            theme: q.theme.clone(),
            prompt: q.prompt.clone(),
            options: q.options.clone(),
        });
    }

    /// Verdict by blocks standing, once the deck or the match clock
    /// runs out.
    fn final_verdict(&self) -> Verdict {
        let (a, b) = (self.castles[0].intact(), self.castles[1].intact());
        match a.cmp(&b) {
            std::cmp::Ordering::Greater => Verdict::Win(Seat::A),
            std::cmp::Ordering::Less => Verdict::Win(Seat::B),
            std::cmp::Ordering::Equal => Verdict::Draw,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// An answer to the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub option: usize,
    /// Opponent block to bomb. Defaults to the first one standing.
    #[serde(default)]
    pub target: Option<usize>,
    /// Own block to rebuild when a repair is earned. Defaults to the
    /// first destroyed one.
    #[serde(default)]
    pub repair: Option<usize>,
}

pub struct QuizDuel;

impl RuleEngine for QuizDuel {
    type Config = QuizConfig;
    type Payload = QuizState;
    type Action = Answer;

    fn prepare_config(config: QuizConfig) -> QuizConfig {
        config.validated()
    }

    fn init(config: &QuizConfig, seats: [ParticipantId; 2]) -> QuizState {
        let deck = config.draw_deck();
        QuizState::new(config, seats, deck)
    }

    fn apply_action(state: &mut QuizState, seat: Seat, answer: Answer) -> Result<Verdict, String> {
        let question = state
            .deck
            .get(state.round)
            .ok_or_else(|| "no question left to answer".to_string())?;
        if answer.option >= question.options.len() {
            return Err(format!("option {} does not exist", answer.option));
        }
        let blocks = state.castles[0].blocks.len();
        for index in [answer.target, answer.repair].into_iter().flatten() {
            if index >= blocks {
                return Err(format!("block {index} does not exist"));
            }
        }

        let me = seat.index();
        let them = seat.other().index();
        if let Some(i) = answer.target {
            if !state.castles[them].blocks[i] {
                return Err(format!("block {i} is already destroyed"));
            }
        }
        let correct = answer.option == question.answer;
        let mut last = LastAnswer {
            seat,
            chosen: answer.option,
            correct,
            correct_option: question.answer,
            explanation: question.explanation.clone(),
            hit: None,
            repaired: None,
        };

        if correct {
            let score = &mut state.scores[me];
            score.correct += 1;
            score.streak += 1;

            if score.streak >= state.repair_streak {
                score.streak = 0;
                let own = &mut state.castles[me];
                let spot = answer
                    .repair
                    .filter(|&i| !own.blocks[i])
                    .or_else(|| own.first_destroyed());
                if let Some(i) = spot {
                    own.blocks[i] = true;
                    state.scores[me].repairs += 1;
                    last.repaired = Some(i);
                }
            }

            let enemy = &mut state.castles[them];
            let target = answer.target.or_else(|| enemy.first_intact());
            if let Some(i) = target {
                enemy.blocks[i] = false;
                state.scores[me].hits += 1;
                last.hit = Some(i);
            }
        } else {
            let score = &mut state.scores[me];
            score.wrong += 1;
            score.streak = 0;
        }

        state.last = Some(last);
        state.round += 1;
        state.refresh_current();

        if state.castles[them].is_destroyed() {
            return Ok(Verdict::Win(seat));
        }
        if state.round >= state.deck.len() {
            return Ok(state.final_verdict());
        }
        Ok(Verdict::Continue)
    }

    fn match_time_limit(config: &QuizConfig) -> Option<Duration> {
        let secs = config.match_time_limit_secs;
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    fn time_up(state: &QuizState) -> Verdict {
        state.final_verdict()
    }

    fn name() -> &'static str {
        "quiz"
    }
}
