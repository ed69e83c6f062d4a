//! [`SqliteStore`]: the SQLite implementation of [`GameStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use squares_core::{
  board::{Board, CELLS},
  entity::{
    Answer, Game, GamePatch, GameState, Guess, NewGuess, NewQuestion, NewSquare,
    Question, QuestionPatch, Square, SquarePatch,
  },
  store::GameStore,
};

use crate::{
  Error, Result,
  encode::{
    ANSWER_COLUMNS, GAME_COLUMNS, GUESS_COLUMNS, QUESTION_COLUMNS, RawAnswer,
    RawGame, RawGuess, RawQuestion, RawSquare, SQUARE_COLUMNS, encode_dt,
    encode_mark, encode_uuid,
  },
  schema::SCHEMA,
};

type RowMapper<R> = fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Squares game store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a statement that yields at most one row.
  async fn fetch_one<R>(
    &self,
    sql: String,
    params: Vec<Value>,
    map: RowMapper<R>,
  ) -> Result<Option<R>>
  where
    R: Send + 'static,
  {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), map)
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  /// Run a query and collect every row.
  async fn fetch_all<R>(
    &self,
    sql: String,
    params: Vec<Value>,
    map: RowMapper<R>,
  ) -> Result<Vec<R>>
  where
    R: Send + 'static,
  {
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), map)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn execute(&self, sql: &'static str, params: Vec<Value>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(sql, rusqlite::params_from_iter(params))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn one_square(&self, filter: &str, params: Vec<Value>) -> Result<Option<Square>> {
    let sql = format!(
      "SELECT {SQUARE_COLUMNS} FROM squares WHERE {filter} ORDER BY location LIMIT 1"
    );
    let raw = self.fetch_one(sql, params, RawSquare::from_row).await?;
    raw.map(RawSquare::into_square).transpose()
  }

  async fn questions_where(&self, filter: &str, params: Vec<Value>) -> Result<Vec<Question>> {
    let sql =
      format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE {filter} ORDER BY rowid");
    let raws = self.fetch_all(sql, params, RawQuestion::from_row).await?;
    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  async fn guesses_where(&self, filter: &str, params: Vec<Value>) -> Result<Vec<Guess>> {
    let sql = format!("SELECT {GUESS_COLUMNS} FROM guesses WHERE {filter} ORDER BY rowid");
    let raws = self.fetch_all(sql, params, RawGuess::from_row).await?;
    raws.into_iter().map(RawGuess::into_guess).collect()
  }
}

fn uuid_value(id: Uuid) -> Value { Value::Text(encode_uuid(id)) }

// ─── GameStore impl ──────────────────────────────────────────────────────────

impl GameStore for SqliteStore {
  type Error = Error;

  // ── Games ─────────────────────────────────────────────────────────────────

  async fn insert_game(&self, slug: String) -> Result<Game> {
    let game = Game {
      game_id:    Uuid::new_v4(),
      slug,
      board:      Board::empty(),
      state:      GameState::Idle,
      created_at: Utc::now(),
    };

    self
      .execute(
        "INSERT INTO games (game_id, slug, board, state, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        vec![
          uuid_value(game.game_id),
          Value::Text(game.slug.clone()),
          Value::Text(game.board.to_string()),
          Value::Text(game.state.to_string()),
          Value::Text(encode_dt(game.created_at)),
        ],
      )
      .await?;

    Ok(game)
  }

  async fn get_game(&self, id: Uuid) -> Result<Option<Game>> {
    let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE game_id = ?1");
    let raw = self.fetch_one(sql, vec![uuid_value(id)], RawGame::from_row).await?;
    raw.map(RawGame::into_game).transpose()
  }

  async fn game_by_slug(&self, slug: String) -> Result<Option<Game>> {
    let sql = format!(
      "SELECT {GAME_COLUMNS} FROM games WHERE slug = ?1 ORDER BY rowid DESC LIMIT 1"
    );
    let raw = self.fetch_one(sql, vec![Value::Text(slug)], RawGame::from_row).await?;
    raw.map(RawGame::into_game).transpose()
  }

  async fn patch_game(&self, id: Uuid, patch: GamePatch) -> Result<Option<Game>> {
    let sql = format!(
      "UPDATE games SET
         board = COALESCE(?2, board),
         state = COALESCE(?3, state)
       WHERE game_id = ?1
       RETURNING {GAME_COLUMNS}"
    );
    let params = vec![
      uuid_value(id),
      Value::from(patch.board.map(|b| b.to_string())),
      Value::from(patch.state.map(|s| s.to_string())),
    ];
    let raw = self.fetch_one(sql, params, RawGame::from_row).await?;
    raw.map(RawGame::into_game).transpose()
  }

  // ── Squares ───────────────────────────────────────────────────────────────

  async fn insert_square(&self, input: NewSquare) -> Result<Square> {
    if usize::from(input.location) >= CELLS {
      return Err(Error::InvalidLocation(input.location));
    }

    let square = Square {
      square_id: Uuid::new_v4(),
      location:  input.location,
      name:      input.name,
      link:      input.link,
      photo:     input.photo,
      active:    false,
      secret:    false,
      state:     None,
    };

    self
      .execute(
        "INSERT INTO squares (square_id, location, name, link, photo, active, secret, state)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, NULL)",
        vec![
          uuid_value(square.square_id),
          Value::from(square.location),
          Value::Text(square.name.clone()),
          Value::from(square.link.clone()),
          Value::from(square.photo.clone()),
        ],
      )
      .await?;

    Ok(square)
  }

  async fn get_square(&self, id: Uuid) -> Result<Option<Square>> {
    self.one_square("square_id = ?1", vec![uuid_value(id)]).await
  }

  async fn list_squares(&self) -> Result<Vec<Square>> {
    let sql = format!("SELECT {SQUARE_COLUMNS} FROM squares ORDER BY location");
    let raws = self.fetch_all(sql, vec![], RawSquare::from_row).await?;
    raws.into_iter().map(RawSquare::into_square).collect()
  }

  async fn square_at(&self, location: u8) -> Result<Option<Square>> {
    self.one_square("location = ?1", vec![Value::from(location)]).await
  }

  async fn active_square(&self) -> Result<Option<Square>> {
    self.one_square("active = 1", vec![]).await
  }

  async fn secret_square(&self) -> Result<Option<Square>> {
    self.one_square("secret = 1", vec![]).await
  }

  async fn patch_square(&self, id: Uuid, patch: SquarePatch) -> Result<Option<Square>> {
    // Nullable columns carry a "set" flag so a patch can write NULL.
    let sql = format!(
      "UPDATE squares SET
         active = COALESCE(?2, active),
         secret = COALESCE(?3, secret),
         state  = CASE WHEN ?4 THEN ?5 ELSE state END,
         name   = COALESCE(?6, name),
         link   = CASE WHEN ?7 THEN ?8 ELSE link END,
         photo  = CASE WHEN ?9 THEN ?10 ELSE photo END
       WHERE square_id = ?1
       RETURNING {SQUARE_COLUMNS}"
    );
    let params = vec![
      uuid_value(id),
      Value::from(patch.active),
      Value::from(patch.secret),
      Value::from(patch.state.is_some()),
      Value::from(patch.state.and_then(encode_mark)),
      Value::from(patch.name),
      Value::from(patch.link.is_some()),
      Value::from(patch.link.flatten()),
      Value::from(patch.photo.is_some()),
      Value::from(patch.photo.flatten()),
    ];
    let raw = self.fetch_one(sql, params, RawSquare::from_row).await?;
    raw.map(RawSquare::into_square).transpose()
  }

  // ── Questions ─────────────────────────────────────────────────────────────

  async fn insert_question(&self, input: NewQuestion) -> Result<Question> {
    let question = Question {
      question_id: Uuid::new_v4(),
      square_id:   input.square_id,
      text:        input.text,
      answer:      input.answer,
      active:      false,
      complete:    false,
      created_at:  Utc::now(),
    };

    self
      .execute(
        "INSERT INTO questions (question_id, square_id, text, answer, active, complete, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, 0, ?5)",
        vec![
          uuid_value(question.question_id),
          uuid_value(question.square_id),
          Value::Text(question.text.clone()),
          Value::Text(question.answer.clone()),
          Value::Text(encode_dt(question.created_at)),
        ],
      )
      .await?;

    Ok(question)
  }

  async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
    let mut found = self.questions_where("question_id = ?1", vec![uuid_value(id)]).await?;
    Ok(found.pop())
  }

  async fn questions_for_square(&self, square_id: Uuid) -> Result<Vec<Question>> {
    self.questions_where("square_id = ?1", vec![uuid_value(square_id)]).await
  }

  async fn active_question(&self) -> Result<Option<Question>> {
    let found = self.questions_where("active = 1", vec![]).await?;
    Ok(found.into_iter().next())
  }

  async fn complete_questions(&self) -> Result<Vec<Question>> {
    self.questions_where("complete = 1", vec![]).await
  }

  async fn patch_question(
    &self,
    id: Uuid,
    patch: QuestionPatch,
  ) -> Result<Option<Question>> {
    // `complete` only ever moves from 0 to 1.
    let sql = format!(
      "UPDATE questions SET
         active   = COALESCE(?2, active),
         complete = MAX(complete, COALESCE(?3, complete))
       WHERE question_id = ?1
       RETURNING {QUESTION_COLUMNS}"
    );
    let params = vec![
      uuid_value(id),
      Value::from(patch.active),
      Value::from(patch.complete),
    ];
    let raw = self.fetch_one(sql, params, RawQuestion::from_row).await?;
    raw.map(RawQuestion::into_question).transpose()
  }

  // ── Answers ───────────────────────────────────────────────────────────────

  async fn upsert_answer(
    &self,
    game_id: Uuid,
    question_id: Uuid,
    was_square_correct: bool,
  ) -> Result<Answer> {
    let sql = format!(
      "INSERT INTO answers (answer_id, game_id, question_id, was_square_correct, recorded_at)
       VALUES (?1, ?2, ?3, ?4, ?5)
       ON CONFLICT (game_id, question_id) DO UPDATE SET
         was_square_correct = excluded.was_square_correct,
         recorded_at        = excluded.recorded_at
       RETURNING {ANSWER_COLUMNS}"
    );
    let params = vec![
      uuid_value(Uuid::new_v4()),
      uuid_value(game_id),
      uuid_value(question_id),
      Value::from(was_square_correct),
      Value::Text(encode_dt(Utc::now())),
    ];
    let raw = self
      .fetch_one(sql, params, RawAnswer::from_row)
      .await?
      .ok_or(Error::MissingRow("answers"))?;
    raw.into_answer()
  }

  async fn resolve_answer(
    &self,
    game_id: Uuid,
    question_id: Uuid,
  ) -> Result<Option<Answer>> {
    let sql = format!(
      "UPDATE answers SET resolved = 1
       WHERE game_id = ?1 AND question_id = ?2
       RETURNING {ANSWER_COLUMNS}"
    );
    let params = vec![uuid_value(game_id), uuid_value(question_id)];
    let raw = self.fetch_one(sql, params, RawAnswer::from_row).await?;
    raw.map(RawAnswer::into_answer).transpose()
  }

  async fn answer_for(&self, game_id: Uuid, question_id: Uuid) -> Result<Option<Answer>> {
    let sql = format!(
      "SELECT {ANSWER_COLUMNS} FROM answers WHERE game_id = ?1 AND question_id = ?2"
    );
    let params = vec![uuid_value(game_id), uuid_value(question_id)];
    let raw = self.fetch_one(sql, params, RawAnswer::from_row).await?;
    raw.map(RawAnswer::into_answer).transpose()
  }

  async fn answers_for_game(&self, game_id: Uuid) -> Result<Vec<Answer>> {
    let sql =
      format!("SELECT {ANSWER_COLUMNS} FROM answers WHERE game_id = ?1 ORDER BY rowid");
    let raws = self
      .fetch_all(sql, vec![uuid_value(game_id)], RawAnswer::from_row)
      .await?;
    raws.into_iter().map(RawAnswer::into_answer).collect()
  }

  // ── Guesses ───────────────────────────────────────────────────────────────

  async fn upsert_guess(&self, input: NewGuess) -> Result<Guess> {
    let sql = format!(
      "INSERT INTO guesses (guess_id, game_id, user_id, question_id, square_id, guess, recorded_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
       ON CONFLICT (game_id, user_id, question_id) DO UPDATE SET
         square_id   = excluded.square_id,
         guess       = excluded.guess,
         recorded_at = excluded.recorded_at
       RETURNING {GUESS_COLUMNS}"
    );
    let params = vec![
      uuid_value(Uuid::new_v4()),
      uuid_value(input.game_id),
      Value::Text(input.user_id),
      uuid_value(input.question_id),
      uuid_value(input.square_id),
      Value::Text(input.guess.to_string()),
      Value::Text(encode_dt(Utc::now())),
    ];
    let raw = self
      .fetch_one(sql, params, RawGuess::from_row)
      .await?
      .ok_or(Error::MissingRow("guesses"))?;
    raw.into_guess()
  }

  async fn guess_for(
    &self,
    game_id: Uuid,
    user_id: String,
    question_id: Uuid,
  ) -> Result<Option<Guess>> {
    let found = self
      .guesses_where(
        "game_id = ?1 AND user_id = ?2 AND question_id = ?3",
        vec![uuid_value(game_id), Value::Text(user_id), uuid_value(question_id)],
      )
      .await?;
    Ok(found.into_iter().next())
  }

  async fn guesses_for_question(&self, game_id: Uuid, question_id: Uuid) -> Result<Vec<Guess>> {
    self
      .guesses_where(
        "game_id = ?1 AND question_id = ?2",
        vec![uuid_value(game_id), uuid_value(question_id)],
      )
      .await
  }

  async fn guesses_for_game(&self, game_id: Uuid) -> Result<Vec<Guess>> {
    self.guesses_where("game_id = ?1", vec![uuid_value(game_id)]).await
  }
}
