//! Host rulings and the secret-square bonus.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, entity::Answer, store::GameStore};

/// Record the host's ruling on whether the square's canned answer was
/// correct. A later ruling for the same (game, question) overwrites the
/// earlier one.
pub async fn record_answer<S>(
  store: &S,
  game_id: Uuid,
  question_id: Uuid,
  was_square_correct: bool,
) -> Result<Answer>
where
  S: GameStore,
{
  let answer = store
    .upsert_answer(game_id, question_id, was_square_correct)
    .await
    .map_err(Error::store)?;
  tracing::info!(game = %game_id, question = %question_id, was_square_correct, "answer recorded");
  Ok(answer)
}

/// Close the ruling on `question_id` for this game, if one was recorded.
/// Scores and the secret-square outcome only count resolved rulings.
pub async fn resolve<S>(
  store: &S,
  game_id: Uuid,
  question_id: Uuid,
) -> Result<Option<Answer>>
where
  S: GameStore,
{
  let answer = store
    .resolve_answer(game_id, question_id)
    .await
    .map_err(Error::store)?;
  if answer.is_some() {
    tracing::debug!(game = %game_id, question = %question_id, "answer resolved");
  }
  Ok(answer)
}

/// How a player fared on the secret square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretSquareOutcome {
  /// The secret square's turn has not ended in this game, or the player did
  /// not guess on it.
  Undetermined,
  Correct,
  Incorrect,
}

impl SecretSquareOutcome {
  pub fn is_correct(self) -> bool { self == Self::Correct }
}

/// Judge `user_id`'s guess on the secret square's question in this game.
///
/// Only rulings resolved in this game are considered; the first question
/// bound to the secret square with one is the one judged.
pub async fn secret_square_outcome<S>(
  store: &S,
  game_id: Uuid,
  user_id: &str,
) -> Result<SecretSquareOutcome>
where
  S: GameStore,
{
  let Some(secret) = store.secret_square().await.map_err(Error::store)? else {
    return Ok(SecretSquareOutcome::Undetermined);
  };

  let questions = store
    .questions_for_square(secret.square_id)
    .await
    .map_err(Error::store)?;

  for question in questions {
    let Some(answer) = store
      .answer_for(game_id, question.question_id)
      .await
      .map_err(Error::store)?
      .filter(|a| a.resolved)
    else {
      continue;
    };

    let guess = store
      .guess_for(game_id, user_id.to_owned(), question.question_id)
      .await
      .map_err(Error::store)?;

    return Ok(match guess {
      None => SecretSquareOutcome::Undetermined,
      Some(g) if answer.is_matched_by(Some(g.guess)) => SecretSquareOutcome::Correct,
      Some(_) => SecretSquareOutcome::Incorrect,
    });
  }

  Ok(SecretSquareOutcome::Undetermined)
}
