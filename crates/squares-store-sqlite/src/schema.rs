//! SQL schema for the Squares SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per playthrough. The newest row for a slug is the live game.
CREATE TABLE IF NOT EXISTS games (
    game_id     TEXT PRIMARY KEY,
    slug        TEXT NOT NULL,
    board       TEXT NOT NULL DEFAULT '.........',
    state       TEXT NOT NULL DEFAULT 'idle',   -- idle | secret-square | show-guesses | win
    created_at  TEXT NOT NULL
);

-- The shared catalog of nine squares.
CREATE TABLE IF NOT EXISTS squares (
    square_id  TEXT PRIMARY KEY,
    location   INTEGER NOT NULL UNIQUE CHECK (location BETWEEN 0 AND 8),
    name       TEXT NOT NULL,
    link       TEXT,
    photo      TEXT,
    active     INTEGER NOT NULL DEFAULT 0,
    secret     INTEGER NOT NULL DEFAULT 0,
    state      TEXT                               -- 'X' | 'O' | NULL
);

CREATE TABLE IF NOT EXISTS questions (
    question_id TEXT PRIMARY KEY,
    square_id   TEXT NOT NULL REFERENCES squares(square_id),
    text        TEXT NOT NULL,
    answer      TEXT NOT NULL,
    active      INTEGER NOT NULL DEFAULT 0,
    complete    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

-- Host rulings; overwritten in place per (game, question).
CREATE TABLE IF NOT EXISTS answers (
    answer_id          TEXT PRIMARY KEY,
    game_id            TEXT NOT NULL REFERENCES games(game_id),
    question_id        TEXT NOT NULL REFERENCES questions(question_id),
    was_square_correct INTEGER NOT NULL,
    resolved           INTEGER NOT NULL DEFAULT 0,   -- turn ended in this game
    recorded_at        TEXT NOT NULL,
    UNIQUE (game_id, question_id)
);

-- Audience guesses; overwritten in place per (game, user, question).
CREATE TABLE IF NOT EXISTS guesses (
    guess_id    TEXT PRIMARY KEY,
    game_id     TEXT NOT NULL REFERENCES games(game_id),
    user_id     TEXT NOT NULL,
    question_id TEXT NOT NULL REFERENCES questions(question_id),
    square_id   TEXT NOT NULL REFERENCES squares(square_id),
    guess       TEXT NOT NULL,                    -- agree | disagree
    recorded_at TEXT NOT NULL,
    UNIQUE (game_id, user_id, question_id)
);

CREATE INDEX IF NOT EXISTS games_slug_idx         ON games(slug);
CREATE INDEX IF NOT EXISTS squares_active_idx     ON squares(active);
CREATE INDEX IF NOT EXISTS squares_secret_idx     ON squares(secret);
CREATE INDEX IF NOT EXISTS questions_square_idx   ON questions(square_id);
CREATE INDEX IF NOT EXISTS questions_active_idx   ON questions(active);
CREATE INDEX IF NOT EXISTS questions_complete_idx ON questions(complete);
CREATE INDEX IF NOT EXISTS guesses_question_idx   ON guesses(game_id, question_id);

PRAGMA user_version = 1;
";
