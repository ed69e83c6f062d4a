//! Question lifecycle: activation by board location and completion.

use uuid::Uuid;

use crate::{
  Error, Result,
  board::check_location,
  entity::{Question, QuestionPatch},
  store::GameStore,
};

/// Activate the question bound to the square at `location`, deactivating any
/// other active question first.
///
/// The catalog is reused across games, so the first incomplete question wins;
/// when every bound question is complete the first one is asked again.
pub async fn activate<S>(store: &S, location: u8) -> Result<Question>
where
  S: GameStore,
{
  check_location(location)?;
  let square = store
    .square_at(location)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NoSquareAt(location))?;

  let bound = store
    .questions_for_square(square.square_id)
    .await
    .map_err(Error::store)?;
  let question = bound
    .iter()
    .find(|q| !q.complete)
    .or_else(|| bound.first())
    .cloned()
    .ok_or(Error::NoQuestionForSquare(square.square_id))?;

  if let Some(previous) = get_active(store).await?
    && previous.question_id != question.question_id
  {
    patch(store, previous.question_id, QuestionPatch {
      active: Some(false),
      ..QuestionPatch::default()
    })
    .await?;
  }

  let question = patch(store, question.question_id, QuestionPatch {
    active: Some(true),
    ..QuestionPatch::default()
  })
  .await?;
  tracing::debug!(question = %question.question_id, location, "question activated");
  Ok(question)
}

/// Mark a question complete and inactive. Completion is never undone.
pub async fn mark_complete<S>(store: &S, question_id: Uuid) -> Result<Question>
where
  S: GameStore,
{
  patch(store, question_id, QuestionPatch {
    active:   Some(false),
    complete: Some(true),
  })
  .await
}

/// Take a question off the air without completing it.
pub async fn deactivate<S>(store: &S, question_id: Uuid) -> Result<Question>
where
  S: GameStore,
{
  patch(store, question_id, QuestionPatch {
    active: Some(false),
    ..QuestionPatch::default()
  })
  .await
}

/// The single active question, if any. Absence is not an error.
pub async fn get_active<S>(store: &S) -> Result<Option<Question>>
where
  S: GameStore,
{
  store.active_question().await.map_err(Error::store)
}

async fn patch<S>(
  store: &S,
  question_id: Uuid,
  patch: QuestionPatch,
) -> Result<Question>
where
  S: GameStore,
{
  store
    .patch_question(question_id, patch)
    .await
    .map_err(Error::store)?
    .ok_or(Error::QuestionNotFound(question_id))
}
