//! `squares`: host and audience console for a Squares game.
//!
//! Reads `squares.toml` (or the path given with `--config`), layers
//! `SQUARES_*` environment variables and command-line flags over it, opens
//! the SQLite store, and runs one engine call.
//!
//! # Usage
//!
//! ```
//! squares --role host seed catalog.json
//! squares --role host start
//! squares --role host select 4
//! squares --user user_alice guess agree
//! squares --role host answer correct
//! squares --role host mark 4 o
//! ```

mod config;
mod seed;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use squares_core::{
  GameSession,
  board::{Board, Outcome},
  entity::GuessChoice,
  identity::{Caller, require_host},
  judge::SecretSquareOutcome,
  squares,
};
use squares_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{CliConfig, Overrides, Role};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "squares", version, about = "Host and audience console for a Squares game")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "squares.toml")]
  config: PathBuf,

  /// SQLite database path.
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  /// Game slug.
  #[arg(long, global = true)]
  slug: Option<String>,

  /// Opaque user id of the caller.
  #[arg(long, global = true)]
  user: Option<String>,

  #[arg(long, value_enum, global = true)]
  role: Option<Role>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Load squares and questions from a JSON catalog file.
  Seed { file: PathBuf },
  /// Create the live game for the slug if there is none.
  Start,
  /// Show the board, game state, and result.
  Board,
  /// List the square catalog.
  Squares,
  /// Activate the square at a location.
  Select { location: u8 },
  /// Deactivate the square at a location without resolving it.
  Deselect { location: u8 },
  /// Rule on the active question.
  Answer {
    #[arg(value_enum)]
    ruling: Ruling,
  },
  /// Put the audience percentages on display.
  ShowGuesses,
  /// Resolve the active square.
  Mark {
    location: u8,
    #[arg(value_enum)]
    mark:     MarkKind,
  },
  /// Reset one square to unmarked.
  Clear { location: u8 },
  /// Reset every square.
  ClearAll,
  /// Re-draw the secret square.
  Secret {
    #[arg(long)]
    seed: Option<u64>,
  },
  /// Replace a square's display details.
  UpdateSquare {
    location: u8,
    #[arg(long)]
    name:     String,
    #[arg(long)]
    link:     Option<String>,
    #[arg(long)]
    photo:    Option<String>,
  },
  /// Start the next game for the slug.
  NextGame,
  /// Guess on the active square's question.
  Guess { choice: GuessChoice },
  /// Show your guess on the active question.
  MyGuess,
  /// Agree/disagree split on the active question.
  Tally,
  /// Rulings recorded in the live game.
  Answers,
  /// Your score on settled questions.
  Score,
  /// Correct-guess totals for every player.
  Scoreboard,
  /// How your secret-square guess fared.
  SecretStatus,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Ruling {
  Correct,
  Incorrect,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MarkKind {
  X,
  O,
  /// End the turn without a letter.
  Incorrect,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let cfg = CliConfig::load(&cli.config, Overrides {
    store_path: cli.store,
    slug:       cli.slug,
    user:       cli.user,
    role:       cli.role,
  })?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let store = Arc::new(store);
  let caller = cfg.caller();

  run(cli.command, store, &cfg, &caller).await
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

async fn run(
  command: Command,
  store: Arc<SqliteStore>,
  cfg: &CliConfig,
  caller: &Caller,
) -> anyhow::Result<()> {
  match command {
    Command::Seed { file } => {
      require_host(caller)?;
      let catalog = seed::read(&file)?;
      let (squares, questions) = seed::load(store.as_ref(), catalog).await?;
      println!("seeded {squares} squares, {questions} questions");
    }
    Command::Start => {
      let session = GameSession::start(store, caller, &cfg.slug).await?;
      println!("live game {} for {:?}", session.game_id(), cfg.slug);
    }
    command => {
      let session = GameSession::open(store, &cfg.slug)
        .await
        .with_context(|| format!("no live game for {:?}; run `squares start`", cfg.slug))?;
      in_session(command, &session, cfg, caller).await?;
    }
  }
  Ok(())
}

/// Commands that act on the live game.
async fn in_session(
  command: Command,
  session: &GameSession<SqliteStore>,
  cfg: &CliConfig,
  caller: &Caller,
) -> anyhow::Result<()> {
  match command {
    Command::Seed { .. } | Command::Start => {}

    // Host: turn flow.
    Command::Select { location } => {
      let square = session.square_at(location).await?;
      let (square, question) = session.select(caller, square.square_id).await?;
      println!("{} is up: {}", square.name, question.text);
      println!("their answer: {}", question.answer);
    }
    Command::Deselect { location } => {
      let square = session.square_at(location).await?;
      session.deselect(caller, square.square_id).await?;
    }
    Command::Answer { ruling } => {
      let answer = session
        .record_answer(caller, matches!(ruling, Ruling::Correct))
        .await?;
      print_json(&answer)?;
    }
    Command::ShowGuesses => {
      session.show_guesses(caller).await?;
      print_tally(session).await?;
    }
    Command::Mark { location, mark } => {
      let square = session.square_at(location).await?;
      let game = match mark {
        MarkKind::X => session.mark_x(caller, square.square_id).await?,
        MarkKind::O => session.mark_o(caller, square.square_id).await?,
        MarkKind::Incorrect => session.mark_incorrect(caller, square.square_id).await?,
      };
      print_board(&game.board);
      print_outcome(game.board.evaluate());
    }
    Command::NextGame => {
      let next = session.next_game(caller).await?;
      println!("live game {} for {:?}", next.game_id(), cfg.slug);
    }

    // Host: catalog controls.
    Command::Clear { location } => {
      let square = session.square_at(location).await?;
      session.clear_square(caller, square.square_id).await?;
    }
    Command::ClearAll => {
      let cleared = session.clear_all(caller).await?;
      println!("cleared {} squares", cleared.len());
    }
    Command::Secret { seed } => {
      let seed = seed.unwrap_or_else(squares::random_seed);
      session.reset_secret_square(caller, seed).await?;
      println!("secret square re-drawn");
    }
    Command::UpdateSquare { location, name, link, photo } => {
      let square = session.square_at(location).await?;
      let square = session
        .update_square_details(caller, square.square_id, name, link, photo)
        .await?;
      print_json(&square)?;
    }

    // Audience.
    Command::Guess { choice } => {
      let guess = session.guess(caller, choice).await?;
      println!("you guessed {}", guess.guess);
    }
    Command::MyGuess => match session.my_guess(caller).await? {
      Some(guess) => println!("{}", guess.guess),
      None => println!("no guess on the active question"),
    },
    Command::Score => {
      let score = session.my_score(caller).await?;
      println!("{} / {}", score.correct, score.total);
    }
    Command::SecretStatus => {
      let outcome = session.secret_square_outcome(caller).await?;
      println!("{}", secret_status(outcome));
    }

    // Reads.
    Command::Board => {
      let game = session.game().await?;
      println!("game {} ({})", game.game_id, game.state);
      print_board(&game.board);
      print_outcome(session.check_for_win().await?);
    }
    Command::Squares => {
      for square in session.squares().await? {
        let mark = square.state.map_or("-".to_string(), |m| m.to_string());
        let mut flags = Vec::new();
        if square.active {
          flags.push("active");
        }
        if caller.host && square.secret {
          flags.push("secret");
        }
        println!("{} {mark} {} {}", square.location, square.name, flags.join(","));
      }
    }
    Command::Tally => print_tally(session).await?,
    Command::Answers => print_json(&session.answers().await?)?,
    Command::Scoreboard => print_json(&session.scoreboard().await?)?,
  }
  Ok(())
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_board(board: &Board) {
  for row in board_rows(board) {
    println!("{row}");
  }
}

/// The board's text form split into its three rows.
fn board_rows(board: &Board) -> Vec<String> {
  board
    .to_string()
    .as_bytes()
    .chunks(3)
    .map(|row| String::from_utf8_lossy(row).into_owned())
    .collect()
}

fn secret_status(outcome: SecretSquareOutcome) -> &'static str {
  match outcome {
    SecretSquareOutcome::Undetermined => "secret square not settled yet",
    _ if outcome.is_correct() => "you called the secret square",
    _ => "you missed the secret square",
  }
}

fn print_outcome(outcome: Outcome) {
  if let Some(label) = outcome.winner_label() {
    println!("winner: {label}");
  }
}

async fn print_tally(session: &GameSession<SqliteStore>) -> anyhow::Result<()> {
  let Some(question) = session.active_question().await? else {
    println!("no active question");
    return Ok(());
  };
  let tally = session.guess_tally(question.question_id).await?;
  println!(
    "agree {}% ({})  disagree {}% ({})",
    tally.agree_pct, tally.agree, tally.disagree_pct, tally.disagree
  );
  Ok(())
}
