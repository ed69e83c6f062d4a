//! Record types for the five entity kinds: games, squares, questions,
//! answers, and guesses.
//!
//! Squares and questions form a fixed catalog shared by every game. Games own
//! their board; answers and guesses are scoped to a game and are superseded
//! in place rather than duplicated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::board::{Board, Mark};

// ─── Game ────────────────────────────────────────────────────────────────────

/// Where the host is in the current turn.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GameState {
  /// A square may be activated.
  #[default]
  Idle,
  /// The active square is the secret square.
  SecretSquare,
  /// Audience percentages are on display.
  ShowGuesses,
  /// Terminal until the next game.
  Win,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
  pub game_id:    Uuid,
  pub slug:       String,
  pub board:      Board,
  pub state:      GameState,
  /// Server-assigned; the newest game for a slug is the live one.
  pub created_at: DateTime<Utc>,
}

/// Fields of a game that may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct GamePatch {
  pub board: Option<Board>,
  pub state: Option<GameState>,
}

// ─── Square ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Square {
  pub square_id: Uuid,
  /// Board cell this square occupies, `0..=8`.
  pub location:  u8,
  pub name:      String,
  pub link:      Option<String>,
  /// Opaque key into external photo storage.
  pub photo:     Option<String>,
  pub active:    bool,
  pub secret:    bool,
  /// `None` while the square is unresolved.
  pub state:     Option<Mark>,
}

#[derive(Debug, Clone)]
pub struct NewSquare {
  pub location: u8,
  pub name:     String,
  pub link:     Option<String>,
  pub photo:    Option<String>,
}

/// Fields of a square that may change. `None` leaves the field untouched;
/// `state: Some(None)` clears the square.
#[derive(Debug, Clone, Default)]
pub struct SquarePatch {
  pub active: Option<bool>,
  pub secret: Option<bool>,
  pub state:  Option<Option<Mark>>,
  pub name:   Option<String>,
  pub link:   Option<Option<String>>,
  pub photo:  Option<Option<String>>,
}

impl SquarePatch {
  /// Reset an unresolved square: no mark, not active.
  pub fn cleared() -> Self {
    Self { active: Some(false), state: Some(None), ..Self::default() }
  }
}

// ─── Question ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
  pub question_id: Uuid,
  pub square_id:   Uuid,
  pub text:        String,
  /// The canned answer the square gives.
  pub answer:      String,
  pub active:      bool,
  /// Once set, never cleared.
  pub complete:    bool,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
  pub square_id: Uuid,
  pub text:      String,
  pub answer:    String,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
  pub active:   Option<bool>,
  pub complete: Option<bool>,
}

// ─── Answer ──────────────────────────────────────────────────────────────────

/// The host's ruling on whether the square's canned answer was correct.
/// Unique per (game, question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
  pub answer_id:          Uuid,
  pub game_id:            Uuid,
  pub question_id:        Uuid,
  pub was_square_correct: bool,
  /// Set when the turn on this question ends in this game. Never cleared.
  pub resolved:           bool,
  pub recorded_at:        DateTime<Utc>,
}

impl Answer {
  /// The guess that agrees with this ruling.
  pub fn winning_guess(&self) -> GuessChoice {
    if self.was_square_correct {
      GuessChoice::Agree
    } else {
      GuessChoice::Disagree
    }
  }

  /// Whether `guess` matches this ruling. A missing guess never matches.
  pub fn is_matched_by(&self, guess: Option<GuessChoice>) -> bool {
    guess == Some(self.winning_guess())
  }
}

// ─── Guess ───────────────────────────────────────────────────────────────────

/// An audience member's prediction about the square's answer.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GuessChoice {
  Agree,
  Disagree,
}

/// Unique per (game, user, question); the latest guess wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guess {
  pub guess_id:    Uuid,
  pub game_id:     Uuid,
  pub user_id:     String,
  pub question_id: Uuid,
  pub square_id:   Uuid,
  pub guess:       GuessChoice,
  pub recorded_at: DateTime<Utc>,
}

/// Input to [`crate::store::GameStore::upsert_guess`]. `user_id` comes from
/// the caller's identity, never from request data.
#[derive(Debug, Clone)]
pub struct NewGuess {
  pub game_id:     Uuid,
  pub user_id:     String,
  pub question_id: Uuid,
  pub square_id:   Uuid,
  pub guess:       GuessChoice,
}
