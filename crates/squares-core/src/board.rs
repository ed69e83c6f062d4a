//! The 3×3 board: marks, line enumeration, and win/tie detection.
//!
//! Cells are indexed row-major, `0..=8`:
//!
//! ```text
//!  0 | 1 | 2
//!  3 | 4 | 5
//!  6 | 7 | 8
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{Error, Result};

/// Number of cells on the board (and squares in the catalog).
pub const CELLS: usize = 9;

/// Every line of three that wins: rows, then columns, then diagonals.
pub const LINES: [[usize; 3]; 8] = [
  [0, 1, 2],
  [3, 4, 5],
  [6, 7, 8],
  [0, 3, 6],
  [1, 4, 7],
  [2, 5, 8],
  [0, 4, 8],
  [2, 4, 6],
];

/// Return the fixed set of winning lines.
pub fn win_lines() -> &'static [[usize; 3]] { &LINES }

/// Check that `location` addresses a board cell.
pub fn check_location(location: u8) -> Result<usize> {
  let idx = usize::from(location);
  if idx < CELLS {
    Ok(idx)
  } else {
    Err(Error::InvalidLocation(location))
  }
}

// ─── Mark ────────────────────────────────────────────────────────────────────

/// The letter placed on the board once a turn resolves.
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
pub enum Mark {
  X,
  O,
}

impl Mark {
  fn as_char(self) -> char {
    match self {
      Self::X => 'X',
      Self::O => 'O',
    }
  }
}

// ─── Board ───────────────────────────────────────────────────────────────────

/// Nine cells, each empty or holding a [`Mark`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board([Option<Mark>; CELLS]);

impl Board {
  pub fn empty() -> Self { Self::default() }

  pub fn from_cells(cells: [Option<Mark>; CELLS]) -> Self { Self(cells) }

  pub fn cells(&self) -> &[Option<Mark>; CELLS] { &self.0 }

  pub fn get(&self, idx: usize) -> Option<Mark> {
    self.0.get(idx).copied().flatten()
  }

  /// Place `mark` at `idx`. Out-of-range indices are rejected.
  pub fn set(&mut self, idx: usize, mark: Mark) -> Result<()> {
    match self.0.get_mut(idx) {
      Some(cell) => {
        *cell = Some(mark);
        Ok(())
      }
      None => Err(Error::InvalidLocation(u8::try_from(idx).unwrap_or(u8::MAX))),
    }
  }

  pub fn is_full(&self) -> bool { self.0.iter().all(Option::is_some) }

  pub fn evaluate(&self) -> Outcome { evaluate(self) }
}

/// Compact text form: one character per cell, `X`, `O`, or `.` for empty.
impl fmt::Display for Board {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for cell in &self.0 {
      let c = cell.map_or('.', Mark::as_char);
      write!(f, "{c}")?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid board encoding: {0:?}")]
pub struct ParseBoardError(String);

impl FromStr for Board {
  type Err = ParseBoardError;

  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() != CELLS {
      return Err(ParseBoardError(s.to_owned()));
    }
    let mut cells = [None; CELLS];
    for (cell, c) in cells.iter_mut().zip(chars) {
      *cell = match c {
        'X' => Some(Mark::X),
        'O' => Some(Mark::O),
        '.' => None,
        _ => return Err(ParseBoardError(s.to_owned())),
      };
    }
    Ok(Self(cells))
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// The result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
  Win { mark: Mark, line: [usize; 3] },
  /// Full board, no line of three: a cat's game.
  Tie,
  Undecided,
}

impl Outcome {
  pub fn is_terminal(&self) -> bool { !matches!(self, Self::Undecided) }

  /// Label for display: the winning mark, or "cat's game".
  pub fn winner_label(&self) -> Option<String> {
    match self {
      Self::Win { mark, .. } => Some(mark.to_string()),
      Self::Tie => Some("cat's game".to_owned()),
      Self::Undecided => None,
    }
  }
}

/// Return the first winning line in [`LINES`] order, else a tie when the
/// board is full, else [`Outcome::Undecided`].
pub fn evaluate(board: &Board) -> Outcome {
  for line in LINES {
    let [a, b, c] = line;
    if let Some(mark) = board.get(a)
      && board.get(b) == Some(mark)
      && board.get(c) == Some(mark)
    {
      return Outcome::Win { mark, line };
    }
  }
  if board.is_full() {
    Outcome::Tie
  } else {
    Outcome::Undecided
  }
}
