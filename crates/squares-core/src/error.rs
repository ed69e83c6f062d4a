//! Error types for `squares-core`.

use thiserror::Error;
use uuid::Uuid;

/// A host or audience action whose preconditions do not hold. Nothing is
/// written when one of these is returned; the game stays where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
  #[error("another square is already active")]
  SquareAlreadyActive,

  #[error("no square is active")]
  NoActiveSquare,

  #[error("the given square is not the active square")]
  SquareNotActive,

  #[error("square is already marked")]
  SquareAlreadyMarked,

  #[error("no question is active")]
  NoActiveQuestion,

  #[error("no answer has been recorded for the active question")]
  AnswerNotRecorded,

  #[error("the recorded answer does not say the square was correct")]
  AnswerNotCorrect,

  #[error("the game is already won")]
  GameOver,

  #[error("the square catalog does not cover all nine locations")]
  IncompleteCatalog,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("game not found: {0}")]
  GameNotFound(Uuid),

  #[error("no game for slug {0:?}")]
  NoGameForSlug(String),

  #[error("square not found: {0}")]
  SquareNotFound(Uuid),

  #[error("no square at location {0}")]
  NoSquareAt(u8),

  #[error("question not found: {0}")]
  QuestionNotFound(Uuid),

  #[error("no question bound to square {0}")]
  NoQuestionForSquare(Uuid),

  #[error("invalid board location: {0}")]
  InvalidLocation(u8),

  #[error("unauthorized: {0}")]
  Unauthorized(&'static str),

  #[error("precondition unmet: {0}")]
  PreconditionUnmet(#[from] Precondition),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
