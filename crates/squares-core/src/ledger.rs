//! The guess ledger: audience guesses, live percentages, and scores.
//!
//! [`score_by_user`] counts only turns that ended in this game; [`scoreboard`]
//! is the per-game leaderboard over every ruling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  entity::{Guess, GuessChoice, NewGuess},
  store::GameStore,
};

/// Record a guess. The latest guess for (game, user, question) wins.
pub async fn add_guess<S>(store: &S, input: NewGuess) -> Result<Guess>
where
  S: GameStore,
{
  let guess = store.upsert_guess(input).await.map_err(Error::store)?;
  tracing::debug!(
    game = %guess.game_id,
    question = %guess.question_id,
    user = %guess.user_id,
    guess = %guess.guess,
    "guess recorded"
  );
  Ok(guess)
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// Audience split on one question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessTally {
  pub agree:        u32,
  pub disagree:     u32,
  /// Rounded half-up; both percentages share the same denominator.
  pub agree_pct:    u8,
  pub disagree_pct: u8,
}

impl GuessTally {
  pub fn from_guesses<'a>(guesses: impl IntoIterator<Item = &'a Guess>) -> Self {
    let (agree, disagree) =
      guesses.into_iter().fold((0u32, 0u32), |(a, d), g| match g.guess {
        GuessChoice::Agree => (a + 1, d),
        GuessChoice::Disagree => (a, d + 1),
      });
    let total = agree + disagree;
    Self {
      agree,
      disagree,
      agree_pct: percent(agree, total),
      disagree_pct: percent(disagree, total),
    }
  }

  pub fn total(&self) -> u32 { self.agree + self.disagree }
}

fn percent(count: u32, total: u32) -> u8 {
  if total == 0 {
    return 0;
  }
  let pct = (u64::from(count) * 100 + u64::from(total) / 2) / u64::from(total);
  pct as u8
}

/// Count agree/disagree guesses on one question in one game.
pub async fn aggregate<S>(
  store: &S,
  game_id: Uuid,
  question_id: Uuid,
) -> Result<GuessTally>
where
  S: GameStore,
{
  let guesses = store
    .guesses_for_question(game_id, question_id)
    .await
    .map_err(Error::store)?;
  Ok(GuessTally::from_guesses(&guesses))
}

// ─── Scores ──────────────────────────────────────────────────────────────────

/// A player's record on settled questions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
  pub correct: u32,
  /// Resolved rulings in this game.
  pub total:   u32,
}

/// Score `user_id` over every resolved ruling in this game. A question the
/// user did not guess on counts as wrong, not skipped.
pub async fn score_by_user<S>(
  store: &S,
  game_id: Uuid,
  user_id: &str,
) -> Result<Score>
where
  S: GameStore,
{
  let answers = store.answers_for_game(game_id).await.map_err(Error::store)?;
  let guesses: BTreeMap<Uuid, GuessChoice> = store
    .guesses_for_game(game_id)
    .await
    .map_err(Error::store)?
    .into_iter()
    .filter(|g| g.user_id == user_id)
    .map(|g| (g.question_id, g.guess))
    .collect();

  let mut score = Score::default();
  for answer in answers.iter().filter(|a| a.resolved) {
    score.total += 1;
    if answer.is_matched_by(guesses.get(&answer.question_id).copied()) {
      score.correct += 1;
    }
  }
  Ok(score)
}

/// Correct-guess totals for every user who guessed in this game, over every
/// ruling recorded in it. Users with no correct guesses appear with zero.
pub async fn scoreboard<S>(store: &S, game_id: Uuid) -> Result<BTreeMap<String, u32>>
where
  S: GameStore,
{
  let answers = store.answers_for_game(game_id).await.map_err(Error::store)?;
  let guesses = store.guesses_for_game(game_id).await.map_err(Error::store)?;

  let mut board: BTreeMap<String, u32> = BTreeMap::new();
  for guess in &guesses {
    let entry = board.entry(guess.user_id.clone()).or_default();
    let matched = answers
      .iter()
      .find(|a| a.question_id == guess.question_id)
      .is_some_and(|a| a.is_matched_by(Some(guess.guess)));
    if matched {
      *entry += 1;
    }
  }
  Ok(board)
}
