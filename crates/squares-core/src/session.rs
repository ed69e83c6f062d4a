//! [`GameSession`]: the orchestrator for one live game.
//!
//! The session binds a game id to a shared catalog store and exposes every
//! host and audience entry point. It never advances on its own: each
//! transition below is triggered by a caller.
//!
//! ```text
//! idle ──select──▶ idle | secret-square ──show_guesses──▶ show-guesses
//!   ▲                                                        │
//!   └──────────────── mark_x / mark_o / mark_incorrect ◀─────┘
//!                              │ line or full board
//!                              ▼
//!                             win ──next_game──▶ (new game) idle
//! ```

use std::{collections::BTreeMap, sync::Arc};

use uuid::Uuid;

use crate::{
  Error, Precondition, Result,
  board::Outcome,
  entity::{
    Answer, Game, GamePatch, GameState, Guess, GuessChoice, NewGuess, Question,
    Square,
  },
  identity::{Identity, require_host, require_user},
  judge::{self, SecretSquareOutcome},
  ledger::{self, GuessTally, Score},
  questions, squares,
  store::GameStore,
};

/// Handle on the live game for a slug. Cloning is cheap.
pub struct GameSession<S> {
  store:   Arc<S>,
  game_id: Uuid,
}

impl<S> Clone for GameSession<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), game_id: self.game_id }
  }
}

impl<S> std::fmt::Debug for GameSession<S> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GameSession")
      .field("game_id", &self.game_id)
      .finish_non_exhaustive()
  }
}

impl<S> GameSession<S>
where
  S: GameStore,
{
  // ── Setup ─────────────────────────────────────────────────────────────

  /// Open the live game for `slug`, creating it if none exists. A new game
  /// starts from a cleared catalog with a freshly designated secret square.
  pub async fn start(
    store: Arc<S>,
    caller: &impl Identity,
    slug: &str,
  ) -> Result<Self> {
    require_host(caller)?;
    if let Some(game) = store
      .game_by_slug(slug.to_owned())
      .await
      .map_err(Error::store)?
    {
      return Ok(Self { store, game_id: game.game_id });
    }

    squares::designate_secret_square(store.as_ref(), squares::random_seed())
      .await?;
    squares::clear_all(store.as_ref()).await?;
    let game = store
      .insert_game(slug.to_owned())
      .await
      .map_err(Error::store)?;
    tracing::info!(slug, game = %game.game_id, "game started");
    Ok(Self { store, game_id: game.game_id })
  }

  /// Open the live game for `slug`.
  pub async fn open(store: Arc<S>, slug: &str) -> Result<Self> {
    let game = store
      .game_by_slug(slug.to_owned())
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NoGameForSlug(slug.to_owned()))?;
    Ok(Self { store, game_id: game.game_id })
  }

  pub fn game_id(&self) -> Uuid { self.game_id }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Current game record, read fresh from the store.
  pub async fn game(&self) -> Result<Game> {
    self
      .store
      .get_game(self.game_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::GameNotFound(self.game_id))
  }

  // ── Host: turn flow ───────────────────────────────────────────────────

  /// Activate a square and its question.
  pub async fn select(
    &self,
    caller: &impl Identity,
    square_id: Uuid,
  ) -> Result<(Square, Question)> {
    require_host(caller)?;
    let game = self.game().await?;
    squares::activate(self.store.as_ref(), &game, square_id).await
  }

  /// Record the host's ruling on the active question.
  pub async fn record_answer(
    &self,
    caller: &impl Identity,
    was_square_correct: bool,
  ) -> Result<Answer> {
    require_host(caller)?;
    let question = self.require_active_question().await?;
    judge::record_answer(
      self.store.as_ref(),
      self.game_id,
      question.question_id,
      was_square_correct,
    )
    .await
  }

  /// Put the audience percentages on display. Requires a ruling on the
  /// active question.
  pub async fn show_guesses(&self, caller: &impl Identity) -> Result<Game> {
    require_host(caller)?;
    let game = self.game().await?;
    if game.state == GameState::Win {
      return Err(Precondition::GameOver.into());
    }
    let question = self.require_active_question().await?;
    self
      .store
      .answer_for(self.game_id, question.question_id)
      .await
      .map_err(Error::store)?
      .ok_or(Precondition::AnswerNotRecorded)?;

    let game = self.set_state(GameState::ShowGuesses).await?;
    tracing::info!(game = %self.game_id, "showing guesses");
    Ok(game)
  }

  pub async fn mark_x(&self, caller: &impl Identity, square_id: Uuid) -> Result<Game> {
    require_host(caller)?;
    let game = self.game().await?;
    squares::mark_x(self.store.as_ref(), &game, square_id).await
  }

  pub async fn mark_o(&self, caller: &impl Identity, square_id: Uuid) -> Result<Game> {
    require_host(caller)?;
    let game = self.game().await?;
    squares::mark_o(self.store.as_ref(), &game, square_id).await
  }

  pub async fn mark_incorrect(
    &self,
    caller: &impl Identity,
    square_id: Uuid,
  ) -> Result<Game> {
    require_host(caller)?;
    let game = self.game().await?;
    squares::mark_incorrect(self.store.as_ref(), &game, square_id).await
  }

  /// Start the next game for this slug: a fresh board in the idle state, a
  /// cleared catalog, and a new secret square. Rulings and guesses stay with
  /// the finished game.
  pub async fn next_game(&self, caller: &impl Identity) -> Result<Self> {
    require_host(caller)?;
    let previous = self.game().await?;
    squares::designate_secret_square(self.store.as_ref(), squares::random_seed())
      .await?;
    squares::clear_all(self.store.as_ref()).await?;
    let game = self
      .store
      .insert_game(previous.slug.clone())
      .await
      .map_err(Error::store)?;
    tracing::info!(
      slug = %game.slug,
      previous = %previous.game_id,
      game = %game.game_id,
      "next game"
    );
    Ok(Self { store: Arc::clone(&self.store), game_id: game.game_id })
  }

  // ── Host: catalog controls ────────────────────────────────────────────

  /// Take a square off the air without resolving it.
  pub async fn deselect(&self, caller: &impl Identity, square_id: Uuid) -> Result<Square> {
    require_host(caller)?;
    let game = self.game().await?;
    squares::deactivate(self.store.as_ref(), &game, square_id).await
  }

  /// Undo an unresolved turn on one square.
  pub async fn clear_square(
    &self,
    caller: &impl Identity,
    square_id: Uuid,
  ) -> Result<Square> {
    require_host(caller)?;
    let game = self.game().await?;
    squares::clear(self.store.as_ref(), &game, square_id).await
  }

  /// Reset every square. A turn in progress is abandoned.
  pub async fn clear_all(&self, caller: &impl Identity) -> Result<Vec<Square>> {
    require_host(caller)?;
    let game = self.game().await?;
    let cleared = squares::clear_all(self.store.as_ref()).await?;
    if matches!(game.state, GameState::SecretSquare | GameState::ShowGuesses) {
      self.set_state(GameState::Idle).await?;
    }
    Ok(cleared)
  }

  /// Re-draw the secret square from `seed`.
  pub async fn reset_secret_square(
    &self,
    caller: &impl Identity,
    seed: u64,
  ) -> Result<Square> {
    require_host(caller)?;
    squares::designate_secret_square(self.store.as_ref(), seed).await
  }

  pub async fn update_square_details(
    &self,
    caller: &impl Identity,
    square_id: Uuid,
    name: String,
    link: Option<String>,
    photo: Option<String>,
  ) -> Result<Square> {
    require_host(caller)?;
    squares::update_details(self.store.as_ref(), square_id, name, link, photo).await
  }

  // ── Audience ──────────────────────────────────────────────────────────

  /// Guess on a specific question. The user id comes from `caller`.
  pub async fn add_guess(
    &self,
    caller: &impl Identity,
    question_id: Uuid,
    square_id: Uuid,
    guess: GuessChoice,
  ) -> Result<Guess> {
    let user_id = require_user(caller)?;
    self
      .store
      .get_question(question_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::QuestionNotFound(question_id))?;
    squares::get(self.store.as_ref(), square_id).await?;

    ledger::add_guess(self.store.as_ref(), NewGuess {
      game_id: self.game_id,
      user_id,
      question_id,
      square_id,
      guess,
    })
    .await
  }

  /// Guess on the active square's question.
  pub async fn guess(&self, caller: &impl Identity, guess: GuessChoice) -> Result<Guess> {
    let (square, question) = self.require_active_turn().await?;
    self
      .add_guess(caller, question.question_id, square.square_id, guess)
      .await
  }

  /// The caller's guess on the active question, if they cast one.
  pub async fn my_guess(&self, caller: &impl Identity) -> Result<Option<Guess>> {
    let user_id = require_user(caller)?;
    let Some(question) = self.active_question().await? else {
      return Ok(None);
    };
    self
      .store
      .guess_for(self.game_id, user_id, question.question_id)
      .await
      .map_err(Error::store)
  }

  pub async fn my_score(&self, caller: &impl Identity) -> Result<Score> {
    let user_id = require_user(caller)?;
    ledger::score_by_user(self.store.as_ref(), self.game_id, &user_id).await
  }

  pub async fn secret_square_outcome(
    &self,
    caller: &impl Identity,
  ) -> Result<SecretSquareOutcome> {
    let user_id = require_user(caller)?;
    judge::secret_square_outcome(self.store.as_ref(), self.game_id, &user_id).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Evaluate the current board.
  pub async fn check_for_win(&self) -> Result<Outcome> {
    Ok(self.game().await?.board.evaluate())
  }

  pub async fn squares(&self) -> Result<Vec<Square>> {
    self.store.list_squares().await.map_err(Error::store)
  }

  pub async fn square_at(&self, location: u8) -> Result<Square> {
    crate::board::check_location(location)?;
    self
      .store
      .square_at(location)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NoSquareAt(location))
  }

  pub async fn active_square(&self) -> Result<Option<Square>> {
    self.store.active_square().await.map_err(Error::store)
  }

  pub async fn active_question(&self) -> Result<Option<Question>> {
    questions::get_active(self.store.as_ref()).await
  }

  /// The ruling on the active question in this game, if recorded.
  pub async fn current_answer(&self) -> Result<Option<Answer>> {
    let Some(question) = self.active_question().await? else {
      return Ok(None);
    };
    self
      .store
      .answer_for(self.game_id, question.question_id)
      .await
      .map_err(Error::store)
  }

  pub async fn answers(&self) -> Result<Vec<Answer>> {
    self
      .store
      .answers_for_game(self.game_id)
      .await
      .map_err(Error::store)
  }

  pub async fn guess_tally(&self, question_id: Uuid) -> Result<GuessTally> {
    ledger::aggregate(self.store.as_ref(), self.game_id, question_id).await
  }

  pub async fn scoreboard(&self) -> Result<BTreeMap<String, u32>> {
    ledger::scoreboard(self.store.as_ref(), self.game_id).await
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn set_state(&self, state: GameState) -> Result<Game> {
    self
      .store
      .patch_game(self.game_id, GamePatch { state: Some(state), ..GamePatch::default() })
      .await
      .map_err(Error::store)?
      .ok_or(Error::GameNotFound(self.game_id))
  }

  async fn require_active_question(&self) -> Result<Question> {
    Ok(
      self
        .active_question()
        .await?
        .ok_or(Precondition::NoActiveQuestion)?,
    )
  }

  async fn require_active_turn(&self) -> Result<(Square, Question)> {
    let square = self
      .active_square()
      .await?
      .ok_or(Precondition::NoActiveSquare)?;
    let question = self.require_active_question().await?;
    Ok((square, question))
  }
}
