//! Square lifecycle: secret-square designation, activation, clearing, and
//! resolving a turn with a mark.
//!
//! These functions perform no authorization; [`crate::session::GameSession`]
//! gates them on the caller's role. Every precondition is checked before the
//! first write.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::{
  Error, Precondition, Result,
  board::{CELLS, Mark, Outcome},
  entity::{Game, GamePatch, GameState, Question, Square, SquarePatch},
  judge, questions,
  store::GameStore,
};

// ─── Secret square ───────────────────────────────────────────────────────────

/// Pick a location `0..=8` uniformly from `seed`. Pure: the same seed always
/// picks the same location.
pub fn choose_secret_index(seed: u64) -> u8 {
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  rng.random_range(0..CELLS as u8)
}

/// A fresh seed from the thread-local generator.
pub fn random_seed() -> u64 { rand::random() }

/// Mark the square at [`choose_secret_index`]`(seed)` secret and every other
/// square not secret. Visits all nine squares, so exactly one is secret
/// afterwards whatever the prior state.
pub async fn designate_secret_square<S>(store: &S, seed: u64) -> Result<Square>
where
  S: GameStore,
{
  let squares = store.list_squares().await.map_err(Error::store)?;
  let covered = (0..CELLS as u8)
    .all(|loc| squares.iter().any(|sq| sq.location == loc));
  if squares.len() != CELLS || !covered {
    return Err(Precondition::IncompleteCatalog.into());
  }

  let secret_location = choose_secret_index(seed);
  let mut chosen = None;
  for square in squares {
    let secret = square.location == secret_location;
    let patched = store
      .patch_square(square.square_id, SquarePatch {
        secret: Some(secret),
        ..SquarePatch::default()
      })
      .await
      .map_err(Error::store)?
      .ok_or(Error::SquareNotFound(square.square_id))?;
    if secret {
      chosen = Some(patched);
    }
  }

  let chosen = chosen.ok_or(Error::NoSquareAt(secret_location))?;
  tracing::info!(location = chosen.location, "secret square designated");
  Ok(chosen)
}

// ─── Activation ──────────────────────────────────────────────────────────────

/// Make `square_id` the active square, activate its question, and move the
/// game into the secret-square state if this is the secret square, or back
/// to idle if it is not.
pub async fn activate<S>(
  store: &S,
  game: &Game,
  square_id: Uuid,
) -> Result<(Square, Question)>
where
  S: GameStore,
{
  if game.state == GameState::Win {
    return Err(Precondition::GameOver.into());
  }
  let square = get(store, square_id).await?;
  if let Some(active) = store.active_square().await.map_err(Error::store)?
    && active.square_id != square_id
  {
    return Err(Precondition::SquareAlreadyActive.into());
  }
  if square.state.is_some() {
    return Err(Precondition::SquareAlreadyMarked.into());
  }

  let question = questions::activate(store, square.location).await?;

  let state = if square.secret {
    GameState::SecretSquare
  } else {
    GameState::Idle
  };
  if !square.active && game.state != state {
    set_state(store, game, state).await?;
  }

  let square = patch(store, square_id, SquarePatch {
    active: Some(true),
    ..SquarePatch::default()
  })
  .await?;

  tracing::info!(
    game = %game.game_id,
    location = square.location,
    secret = square.secret,
    "square activated"
  );
  Ok((square, question))
}

/// Clear `active` without touching the square's mark. If the square held the
/// turn, its question goes off the air and the game returns to idle.
pub async fn deactivate<S>(store: &S, game: &Game, square_id: Uuid) -> Result<Square>
where
  S: GameStore,
{
  let square = get(store, square_id).await?;
  release_turn(store, game, &square).await?;
  patch(store, square_id, SquarePatch {
    active: Some(false),
    ..SquarePatch::default()
  })
  .await
}

/// Reset one square to unmarked and inactive, releasing its turn as
/// [`deactivate`] does. The game board is untouched.
pub async fn clear<S>(store: &S, game: &Game, square_id: Uuid) -> Result<Square>
where
  S: GameStore,
{
  let square = get(store, square_id).await?;
  release_turn(store, game, &square).await?;
  let square = patch(store, square_id, SquarePatch::cleared()).await?;
  tracing::info!(location = square.location, "square cleared");
  Ok(square)
}

/// Reset every square in the catalog and take any active question off the
/// air. Game state is left to the caller.
pub async fn clear_all<S>(store: &S) -> Result<Vec<Square>>
where
  S: GameStore,
{
  if let Some(question) = questions::get_active(store).await? {
    questions::deactivate(store, question.question_id).await?;
  }
  let squares = store.list_squares().await.map_err(Error::store)?;
  let mut cleared = Vec::with_capacity(squares.len());
  for square in squares {
    cleared.push(patch(store, square.square_id, SquarePatch::cleared()).await?);
  }
  tracing::info!(count = cleared.len(), "all squares cleared");
  Ok(cleared)
}

/// Replace a square's display details.
pub async fn update_details<S>(
  store: &S,
  square_id: Uuid,
  name: String,
  link: Option<String>,
  photo: Option<String>,
) -> Result<Square>
where
  S: GameStore,
{
  patch(store, square_id, SquarePatch {
    name: Some(name),
    link: Some(link),
    photo: Some(photo),
    ..SquarePatch::default()
  })
  .await
}

// ─── Resolving a turn ────────────────────────────────────────────────────────

/// Resolve the active square with an X.
pub async fn mark_x<S>(store: &S, game: &Game, square_id: Uuid) -> Result<Game>
where
  S: GameStore,
{
  let (square, question) = active_turn(store, game, square_id).await?;
  place_mark(store, game, square, question, Mark::X).await
}

/// Resolve the active square with an O. The host must already have ruled the
/// square's answer correct for this game.
pub async fn mark_o<S>(store: &S, game: &Game, square_id: Uuid) -> Result<Game>
where
  S: GameStore,
{
  let (square, question) = active_turn(store, game, square_id).await?;
  let answer = store
    .answer_for(game.game_id, question.question_id)
    .await
    .map_err(Error::store)?
    .ok_or(Precondition::AnswerNotRecorded)?;
  if !answer.was_square_correct {
    return Err(Precondition::AnswerNotCorrect.into());
  }
  place_mark(store, game, square, question, Mark::O).await
}

/// End the turn without placing a letter: the question completes, the ruling
/// is recorded as square-incorrect, and the square goes back to unmarked.
pub async fn mark_incorrect<S>(
  store: &S,
  game: &Game,
  square_id: Uuid,
) -> Result<Game>
where
  S: GameStore,
{
  let (square, question) = active_turn(store, game, square_id).await?;

  questions::mark_complete(store, question.question_id).await?;
  judge::record_answer(store, game.game_id, question.question_id, false).await?;
  judge::resolve(store, game.game_id, question.question_id).await?;
  let game = set_state(store, game, GameState::Idle).await?;
  patch(store, square.square_id, SquarePatch::cleared()).await?;

  tracing::info!(game = %game.game_id, location = square.location, "turn ended incorrect");
  Ok(game)
}

/// Check that `square_id` is the active square and fetch the active question.
async fn active_turn<S>(
  store: &S,
  game: &Game,
  square_id: Uuid,
) -> Result<(Square, Question)>
where
  S: GameStore,
{
  if game.state == GameState::Win {
    return Err(Precondition::GameOver.into());
  }
  let square = store
    .active_square()
    .await
    .map_err(Error::store)?
    .ok_or(Precondition::NoActiveSquare)?;
  if square.square_id != square_id {
    return Err(Precondition::SquareNotActive.into());
  }
  let question = store
    .active_question()
    .await
    .map_err(Error::store)?
    .ok_or(Precondition::NoActiveQuestion)?;
  Ok((square, question))
}

/// Complete the question and resolve its ruling, write the board cell and the
/// next game state in one patch, then release the square. A failure part-way
/// leaves the earlier writes in place.
async fn place_mark<S>(
  store: &S,
  game: &Game,
  square: Square,
  question: Question,
  mark: Mark,
) -> Result<Game>
where
  S: GameStore,
{
  questions::mark_complete(store, question.question_id).await?;
  judge::resolve(store, game.game_id, question.question_id).await?;

  let mut board = game.board;
  board.set(usize::from(square.location), mark)?;
  let outcome = board.evaluate();
  let state = if outcome.is_terminal() {
    GameState::Win
  } else {
    GameState::Idle
  };

  let game = store
    .patch_game(game.game_id, GamePatch { board: Some(board), state: Some(state) })
    .await
    .map_err(Error::store)?
    .ok_or(Error::GameNotFound(game.game_id))?;

  patch(store, square.square_id, SquarePatch {
    active: Some(false),
    state: Some(Some(mark)),
    ..SquarePatch::default()
  })
  .await?;

  match outcome {
    Outcome::Undecided => {
      tracing::info!(game = %game.game_id, location = square.location, %mark, "square marked");
    }
    _ => {
      tracing::info!(
        game = %game.game_id,
        location = square.location,
        %mark,
        winner = ?outcome.winner_label(),
        "square marked; game over"
      );
    }
  }
  Ok(game)
}

/// Undo the turn held by `square`, if it holds one: its question goes off the
/// air and a secret-square or show-guesses game drops back to idle.
async fn release_turn<S>(store: &S, game: &Game, square: &Square) -> Result<()>
where
  S: GameStore,
{
  if !square.active {
    return Ok(());
  }
  if let Some(question) = questions::get_active(store).await?
    && question.square_id == square.square_id
  {
    questions::deactivate(store, question.question_id).await?;
  }
  if matches!(game.state, GameState::SecretSquare | GameState::ShowGuesses) {
    set_state(store, game, GameState::Idle).await?;
  }
  tracing::info!(game = %game.game_id, location = square.location, "turn released");
  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn set_state<S>(store: &S, game: &Game, state: GameState) -> Result<Game>
where
  S: GameStore,
{
  store
    .patch_game(game.game_id, GamePatch {
      state: Some(state),
      ..GamePatch::default()
    })
    .await
    .map_err(Error::store)?
    .ok_or(Error::GameNotFound(game.game_id))
}

pub(crate) async fn get<S>(store: &S, square_id: Uuid) -> Result<Square>
where
  S: GameStore,
{
  store
    .get_square(square_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::SquareNotFound(square_id))
}

async fn patch<S>(store: &S, square_id: Uuid, patch: SquarePatch) -> Result<Square>
where
  S: GameStore,
{
  store
    .patch_square(square_id, patch)
    .await
    .map_err(Error::store)?
    .ok_or(Error::SquareNotFound(square_id))
}
