//! The `GameStore` trait: typed CRUD and indexed lookups over the five
//! entity kinds.
//!
//! The trait is implemented by storage backends (e.g. `squares-store-sqlite`).
//! The engine modules depend on this abstraction, not on any concrete backend.
//!
//! Every method is a single atomic operation in the backend. Operations that
//! touch several records (marking a square, starting a game) are ordered
//! sequences of these calls, not transactions.

use std::future::Future;

use uuid::Uuid;

use crate::entity::{
  Answer, Game, GamePatch, Guess, NewGuess, NewQuestion, NewSquare, Question,
  QuestionPatch, Square, SquarePatch,
};

/// Abstraction over a Squares data store backend.
///
/// Lookups return `Ok(None)` (or an empty list) when nothing matches;
/// `patch_*` methods return `Ok(None)` when the id does not resolve.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait GameStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Games ─────────────────────────────────────────────────────────────

  /// Create a game with an empty board in the idle state.
  fn insert_game(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<Game, Self::Error>> + Send + '_;

  fn get_game(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Game>, Self::Error>> + Send + '_;

  /// The live game for `slug`: the most recently created one.
  fn game_by_slug(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<Option<Game>, Self::Error>> + Send + '_;

  fn patch_game(
    &self,
    id: Uuid,
    patch: GamePatch,
  ) -> impl Future<Output = Result<Option<Game>, Self::Error>> + Send + '_;

  // ── Squares ───────────────────────────────────────────────────────────

  /// Add a square to the catalog. Fails if the location is taken.
  fn insert_square(
    &self,
    input: NewSquare,
  ) -> impl Future<Output = Result<Square, Self::Error>> + Send + '_;

  fn get_square(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Square>, Self::Error>> + Send + '_;

  /// All squares, ordered by location.
  fn list_squares(
    &self,
  ) -> impl Future<Output = Result<Vec<Square>, Self::Error>> + Send + '_;

  fn square_at(
    &self,
    location: u8,
  ) -> impl Future<Output = Result<Option<Square>, Self::Error>> + Send + '_;

  fn active_square(
    &self,
  ) -> impl Future<Output = Result<Option<Square>, Self::Error>> + Send + '_;

  fn secret_square(
    &self,
  ) -> impl Future<Output = Result<Option<Square>, Self::Error>> + Send + '_;

  fn patch_square(
    &self,
    id: Uuid,
    patch: SquarePatch,
  ) -> impl Future<Output = Result<Option<Square>, Self::Error>> + Send + '_;

  // ── Questions ─────────────────────────────────────────────────────────

  fn insert_question(
    &self,
    input: NewQuestion,
  ) -> impl Future<Output = Result<Question, Self::Error>> + Send + '_;

  fn get_question(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  /// Questions bound to a square, in creation order.
  fn questions_for_square(
    &self,
    square_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + '_;

  fn active_question(
    &self,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  fn complete_questions(
    &self,
  ) -> impl Future<Output = Result<Vec<Question>, Self::Error>> + Send + '_;

  fn patch_question(
    &self,
    id: Uuid,
    patch: QuestionPatch,
  ) -> impl Future<Output = Result<Option<Question>, Self::Error>> + Send + '_;

  // ── Answers ───────────────────────────────────────────────────────────

  /// Insert or overwrite the ruling for (game, question).
  fn upsert_answer(
    &self,
    game_id: Uuid,
    question_id: Uuid,
    was_square_correct: bool,
  ) -> impl Future<Output = Result<Answer, Self::Error>> + Send + '_;

  /// Mark the ruling for (game, question) resolved. `None` when no ruling
  /// was recorded.
  fn resolve_answer(
    &self,
    game_id: Uuid,
    question_id: Uuid,
  ) -> impl Future<Output = Result<Option<Answer>, Self::Error>> + Send + '_;

  fn answer_for(
    &self,
    game_id: Uuid,
    question_id: Uuid,
  ) -> impl Future<Output = Result<Option<Answer>, Self::Error>> + Send + '_;

  fn answers_for_game(
    &self,
    game_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Answer>, Self::Error>> + Send + '_;

  // ── Guesses ───────────────────────────────────────────────────────────

  /// Insert or overwrite the guess for (game, user, question).
  fn upsert_guess(
    &self,
    input: NewGuess,
  ) -> impl Future<Output = Result<Guess, Self::Error>> + Send + '_;

  fn guess_for(
    &self,
    game_id: Uuid,
    user_id: String,
    question_id: Uuid,
  ) -> impl Future<Output = Result<Option<Guess>, Self::Error>> + Send + '_;

  fn guesses_for_question(
    &self,
    game_id: Uuid,
    question_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Guess>, Self::Error>> + Send + '_;

  fn guesses_for_game(
    &self,
    game_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Guess>, Self::Error>> + Send + '_;
}
