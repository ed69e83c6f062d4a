//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. UUIDs are hyphenated lowercase strings.
//! The board is nine characters (`X`, `O`, `.`); enums use their `strum`
//! names.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use squares_core::{
  board::{Board, Mark},
  entity::{Answer, Game, GameState, Guess, GuessChoice, Question, Square},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

/// Parse any `strum`-named column.
fn decode_named<T>(column: &str, s: &str) -> Result<T>
where
  T: FromStr,
{
  T::from_str(s).map_err(|_| Error::Decode(format!("unknown {column}: {s:?}")))
}

pub fn encode_mark(mark: Option<Mark>) -> Option<String> {
  mark.map(|m| m.to_string())
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const GAME_COLUMNS: &str = "game_id, slug, board, state, created_at";

pub const SQUARE_COLUMNS: &str =
  "square_id, location, name, link, photo, active, secret, state";

pub const QUESTION_COLUMNS: &str =
  "question_id, square_id, text, answer, active, complete, created_at";

pub const ANSWER_COLUMNS: &str =
  "answer_id, game_id, question_id, was_square_correct, resolved, recorded_at";

pub const GUESS_COLUMNS: &str =
  "guess_id, game_id, user_id, question_id, square_id, guess, recorded_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `games` row.
pub struct RawGame {
  pub game_id:    String,
  pub slug:       String,
  pub board:      String,
  pub state:      String,
  pub created_at: String,
}

impl RawGame {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      game_id:    row.get(0)?,
      slug:       row.get(1)?,
      board:      row.get(2)?,
      state:      row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_game(self) -> Result<Game> {
    Ok(Game {
      game_id:    decode_uuid(&self.game_id)?,
      slug:       self.slug,
      board:      Board::from_str(&self.board)
        .map_err(|e| Error::Decode(e.to_string()))?,
      state:      decode_named::<GameState>("game state", &self.state)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `squares` row.
pub struct RawSquare {
  pub square_id: String,
  pub location:  u8,
  pub name:      String,
  pub link:      Option<String>,
  pub photo:     Option<String>,
  pub active:    bool,
  pub secret:    bool,
  pub state:     Option<String>,
}

impl RawSquare {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      square_id: row.get(0)?,
      location:  row.get(1)?,
      name:      row.get(2)?,
      link:      row.get(3)?,
      photo:     row.get(4)?,
      active:    row.get(5)?,
      secret:    row.get(6)?,
      state:     row.get(7)?,
    })
  }

  pub fn into_square(self) -> Result<Square> {
    Ok(Square {
      square_id: decode_uuid(&self.square_id)?,
      location:  self.location,
      name:      self.name,
      link:      self.link,
      photo:     self.photo,
      active:    self.active,
      secret:    self.secret,
      state:     self
        .state
        .as_deref()
        .map(|s| decode_named::<Mark>("mark", s))
        .transpose()?,
    })
  }
}

/// Raw values read directly from a `questions` row.
pub struct RawQuestion {
  pub question_id: String,
  pub square_id:   String,
  pub text:        String,
  pub answer:      String,
  pub active:      bool,
  pub complete:    bool,
  pub created_at:  String,
}

impl RawQuestion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      question_id: row.get(0)?,
      square_id:   row.get(1)?,
      text:        row.get(2)?,
      answer:      row.get(3)?,
      active:      row.get(4)?,
      complete:    row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_question(self) -> Result<Question> {
    Ok(Question {
      question_id: decode_uuid(&self.question_id)?,
      square_id:   decode_uuid(&self.square_id)?,
      text:        self.text,
      answer:      self.answer,
      active:      self.active,
      complete:    self.complete,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `answers` row.
pub struct RawAnswer {
  pub answer_id:          String,
  pub game_id:            String,
  pub question_id:        String,
  pub was_square_correct: bool,
  pub resolved:           bool,
  pub recorded_at:        String,
}

impl RawAnswer {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      answer_id:          row.get(0)?,
      game_id:            row.get(1)?,
      question_id:        row.get(2)?,
      was_square_correct: row.get(3)?,
      resolved:           row.get(4)?,
      recorded_at:        row.get(5)?,
    })
  }

  pub fn into_answer(self) -> Result<Answer> {
    Ok(Answer {
      answer_id:          decode_uuid(&self.answer_id)?,
      game_id:            decode_uuid(&self.game_id)?,
      question_id:        decode_uuid(&self.question_id)?,
      was_square_correct: self.was_square_correct,
      resolved:           self.resolved,
      recorded_at:        decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `guesses` row.
pub struct RawGuess {
  pub guess_id:    String,
  pub game_id:     String,
  pub user_id:     String,
  pub question_id: String,
  pub square_id:   String,
  pub guess:       String,
  pub recorded_at: String,
}

impl RawGuess {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      guess_id:    row.get(0)?,
      game_id:     row.get(1)?,
      user_id:     row.get(2)?,
      question_id: row.get(3)?,
      square_id:   row.get(4)?,
      guess:       row.get(5)?,
      recorded_at: row.get(6)?,
    })
  }

  pub fn into_guess(self) -> Result<Guess> {
    Ok(Guess {
      guess_id:    decode_uuid(&self.guess_id)?,
      game_id:     decode_uuid(&self.game_id)?,
      user_id:     self.user_id,
      question_id: decode_uuid(&self.question_id)?,
      square_id:   decode_uuid(&self.square_id)?,
      guess:       decode_named::<GuessChoice>("guess", &self.guess)?,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
