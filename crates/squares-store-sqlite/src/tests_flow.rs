//! Whole-game flows through `GameSession` backed by an in-memory store.

use std::sync::Arc;

use squares_core::{
  Error, GameSession, Precondition,
  board::{Mark, Outcome},
  entity::{
    Game, GameState, GuessChoice, NewQuestion, NewSquare, Square, SquarePatch,
  },
  identity::Caller,
  judge::SecretSquareOutcome,
  ledger::{GuessTally, Score},
  squares::{self, choose_secret_index},
  store::GameStore,
};

use crate::SqliteStore;

type Session = GameSession<SqliteStore>;

const SLUG: &str = "friday";

fn host() -> Caller { Caller::host("user_host") }

fn player(id: &str) -> Caller { Caller::player(id) }

/// Nine squares, one question each.
async fn catalog() -> Arc<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  for location in 0..9u8 {
    let square = store
      .insert_square(NewSquare {
        location,
        name: format!("Panelist {location}"),
        link: None,
        photo: None,
      })
      .await
      .unwrap();
    store
      .insert_question(NewQuestion {
        square_id: square.square_id,
        text:      format!("Question {location}?"),
        answer:    format!("Answer {location}"),
      })
      .await
      .unwrap();
  }
  Arc::new(store)
}

async fn session() -> Session {
  GameSession::start(catalog().await, &host(), SLUG).await.unwrap()
}

async fn at(s: &Session, location: u8) -> Square {
  s.square_at(location).await.unwrap()
}

/// Select `location` and resolve it with `mark`.
async fn play(s: &Session, location: u8, mark: Mark) -> Game {
  let square = at(s, location).await;
  s.select(&host(), square.square_id).await.unwrap();
  match mark {
    Mark::X => s.mark_x(&host(), square.square_id).await.unwrap(),
    Mark::O => {
      s.record_answer(&host(), true).await.unwrap();
      s.mark_o(&host(), square.square_id).await.unwrap()
    }
  }
}

/// A location that is not the secret square.
async fn ordinary_location(s: &Session) -> u8 {
  let secret = s.store().secret_square().await.unwrap().unwrap();
  (secret.location + 1) % 9
}

// ─── Setup ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn start_creates_idle_game_with_one_secret() {
  let s = session().await;
  let game = s.game().await.unwrap();
  assert_eq!(game.slug, SLUG);
  assert_eq!(game.state, GameState::Idle);
  assert_eq!(game.board.evaluate(), Outcome::Undecided);

  let secrets = s.squares().await.unwrap().iter().filter(|sq| sq.secret).count();
  assert_eq!(secrets, 1);
}

#[tokio::test]
async fn start_reuses_the_live_game() {
  let store = catalog().await;
  let first = GameSession::start(Arc::clone(&store), &host(), SLUG).await.unwrap();
  let again = GameSession::start(Arc::clone(&store), &host(), SLUG).await.unwrap();
  assert_eq!(first.game_id(), again.game_id());

  let opened = GameSession::open(store, SLUG).await.unwrap();
  assert_eq!(opened.game_id(), first.game_id());
}

#[tokio::test]
async fn open_unknown_slug_fails() {
  let err = GameSession::open(catalog().await, "nope").await.unwrap_err();
  assert!(matches!(err, Error::NoGameForSlug(slug) if slug == "nope"));
}

#[tokio::test]
async fn start_requires_host() {
  let store = catalog().await;
  let err = GameSession::start(Arc::clone(&store), &player("user_a"), SLUG)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized(_)));
  assert!(store.game_by_slug(SLUG.into()).await.unwrap().is_none());
}

// ─── Secret square ───────────────────────────────────────────────────────────

#[tokio::test]
async fn designate_leaves_exactly_one_secret() {
  let s = session().await;
  for sq in s.squares().await.unwrap() {
    s.store()
      .patch_square(sq.square_id, SquarePatch {
        secret: Some(sq.location % 2 == 0),
        ..Default::default()
      })
      .await
      .unwrap();
  }

  let chosen = s.reset_secret_square(&host(), 7).await.unwrap();
  assert_eq!(chosen.location, choose_secret_index(7));

  let secrets: Vec<u8> = s
    .squares()
    .await
    .unwrap()
    .iter()
    .filter(|sq| sq.secret)
    .map(|sq| sq.location)
    .collect();
  assert_eq!(secrets, vec![choose_secret_index(7)]);
}

#[tokio::test]
async fn designate_rejects_incomplete_catalog() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  for location in 0..8u8 {
    store
      .insert_square(NewSquare {
        location,
        name: format!("Panelist {location}"),
        link: None,
        photo: None,
      })
      .await
      .unwrap();
  }
  let err = squares::designate_secret_square(&store, 1).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::IncompleteCatalog)
  ));
  assert!(store.secret_square().await.unwrap().is_none());
}

#[tokio::test]
async fn selecting_secret_square_sets_state() {
  let s = session().await;
  let secret = s.store().secret_square().await.unwrap().unwrap();

  let (square, question) = s.select(&host(), secret.square_id).await.unwrap();
  assert!(square.active);
  assert!(question.active);
  assert_eq!(question.square_id, secret.square_id);
  assert_eq!(s.game().await.unwrap().state, GameState::SecretSquare);
}

// ─── Selecting ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn select_ordinary_square_stays_idle() {
  let s = session().await;
  let square = at(&s, ordinary_location(&s).await).await;

  s.select(&host(), square.square_id).await.unwrap();
  assert_eq!(s.game().await.unwrap().state, GameState::Idle);
  assert_eq!(
    s.active_square().await.unwrap().unwrap().square_id,
    square.square_id
  );
  assert_eq!(
    s.active_question().await.unwrap().unwrap().square_id,
    square.square_id
  );
}

#[tokio::test]
async fn second_active_square_rejected() {
  let s = session().await;
  let first = at(&s, 0).await;
  let second = at(&s, 1).await;
  s.select(&host(), first.square_id).await.unwrap();

  let err = s.select(&host(), second.square_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::SquareAlreadyActive)
  ));
  assert!(!at(&s, 1).await.active);
}

#[tokio::test]
async fn marked_square_cannot_be_selected() {
  let s = session().await;
  play(&s, 3, Mark::X).await;

  let err = s.select(&host(), at(&s, 3).await.square_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::SquareAlreadyMarked)
  ));
}

#[tokio::test]
async fn non_host_cannot_select() {
  let s = session().await;
  let square = at(&s, 0).await;

  let err = s.select(&player("user_a"), square.square_id).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized(_)));
  assert!(s.active_square().await.unwrap().is_none());
  assert!(s.active_question().await.unwrap().is_none());
}

// ─── Rulings and marks ───────────────────────────────────────────────────────

#[tokio::test]
async fn mark_x_writes_board_and_returns_to_idle() {
  let s = session().await;
  let game = play(&s, 4, Mark::X).await;

  assert_eq!(game.board.get(4), Some(Mark::X));
  assert_eq!(game.state, GameState::Idle);

  let square = at(&s, 4).await;
  assert!(!square.active);
  assert_eq!(square.state, Some(Mark::X));
  assert!(s.active_question().await.unwrap().is_none());
  assert_eq!(s.store().complete_questions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn mark_o_requires_a_correct_ruling() {
  let s = session().await;
  let square = at(&s, 2).await;
  s.select(&host(), square.square_id).await.unwrap();

  let err = s.mark_o(&host(), square.square_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::AnswerNotRecorded)
  ));

  s.record_answer(&host(), false).await.unwrap();
  let err = s.mark_o(&host(), square.square_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::AnswerNotCorrect)
  ));
  assert_eq!(s.game().await.unwrap().board.get(2), None);

  s.record_answer(&host(), true).await.unwrap();
  let game = s.mark_o(&host(), square.square_id).await.unwrap();
  assert_eq!(game.board.get(2), Some(Mark::O));
}

#[tokio::test]
async fn mark_requires_the_active_square() {
  let s = session().await;
  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();

  let err = s.mark_x(&host(), at(&s, 1).await.square_id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::SquareNotActive)
  ));
}

#[tokio::test]
async fn record_answer_latest_wins() {
  let s = session().await;
  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();

  s.record_answer(&host(), true).await.unwrap();
  s.record_answer(&host(), false).await.unwrap();

  let answers = s.answers().await.unwrap();
  assert_eq!(answers.len(), 1);
  assert!(!answers[0].was_square_correct);
  assert!(!s.current_answer().await.unwrap().unwrap().was_square_correct);
}

#[tokio::test]
async fn record_answer_needs_active_question() {
  let s = session().await;
  let err = s.record_answer(&host(), true).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::NoActiveQuestion)
  ));
}

#[tokio::test]
async fn mark_incorrect_leaves_cell_empty() {
  let s = session().await;
  let square = at(&s, 5).await;
  s.select(&host(), square.square_id).await.unwrap();

  let game = s.mark_incorrect(&host(), square.square_id).await.unwrap();
  assert_eq!(game.board.get(5), None);
  assert_eq!(game.state, GameState::Idle);

  let square = at(&s, 5).await;
  assert!(!square.active);
  assert_eq!(square.state, None);

  let answers = s.answers().await.unwrap();
  assert_eq!(answers.len(), 1);
  assert!(!answers[0].was_square_correct);
  assert_eq!(s.store().complete_questions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn show_guesses_requires_ruling() {
  let s = session().await;
  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();

  let err = s.show_guesses(&host()).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::AnswerNotRecorded)
  ));

  s.record_answer(&host(), true).await.unwrap();
  let game = s.show_guesses(&host()).await.unwrap();
  assert_eq!(game.state, GameState::ShowGuesses);

  let game = s.mark_o(&host(), at(&s, 0).await.square_id).await.unwrap();
  assert_eq!(game.state, GameState::Idle);
}

#[tokio::test]
async fn clear_square_does_not_touch_board() {
  let s = session().await;
  play(&s, 6, Mark::X).await;

  let cleared = s.clear_square(&host(), at(&s, 6).await.square_id).await.unwrap();
  assert_eq!(cleared.state, None);
  assert_eq!(s.game().await.unwrap().board.get(6), Some(Mark::X));
}

#[tokio::test]
async fn update_square_details_replaces_display_fields() {
  let s = session().await;
  let square = at(&s, 0).await;

  let updated = s
    .update_square_details(
      &host(),
      square.square_id,
      "Paul Lynde".into(),
      Some("https://example.com/paul".into()),
      None,
    )
    .await
    .unwrap();
  assert_eq!(updated.name, "Paul Lynde");
  assert_eq!(updated.link.as_deref(), Some("https://example.com/paul"));
  assert_eq!(updated.location, 0);
}

// ─── Winning ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn diagonal_wins_and_locks_the_game() {
  let s = session().await;
  play(&s, 0, Mark::O).await;
  play(&s, 4, Mark::O).await;
  let game = play(&s, 8, Mark::O).await;

  assert_eq!(game.state, GameState::Win);
  let outcome = s.check_for_win().await.unwrap();
  assert_eq!(outcome, Outcome::Win { mark: Mark::O, line: [0, 4, 8] });
  assert_eq!(outcome.winner_label().as_deref(), Some("O"));

  let err = s.select(&host(), at(&s, 1).await.square_id).await.unwrap_err();
  assert!(matches!(err, Error::PreconditionUnmet(Precondition::GameOver)));
}

#[tokio::test]
async fn full_board_without_line_is_a_tie() {
  let s = session().await;
  let layout = [
    (0, Mark::X),
    (1, Mark::O),
    (2, Mark::X),
    (3, Mark::X),
    (4, Mark::O),
    (5, Mark::O),
    (6, Mark::O),
    (7, Mark::X),
  ];
  for (location, mark) in layout {
    let game = play(&s, location, mark).await;
    assert_eq!(game.state, GameState::Idle);
  }
  let game = play(&s, 8, Mark::X).await;

  assert_eq!(game.state, GameState::Win);
  assert_eq!(s.check_for_win().await.unwrap(), Outcome::Tie);
}

#[tokio::test]
async fn next_game_starts_fresh() {
  let s = session().await;
  play(&s, 0, Mark::O).await;
  play(&s, 1, Mark::O).await;
  play(&s, 2, Mark::O).await;
  assert_eq!(s.game().await.unwrap().state, GameState::Win);

  let next = s.next_game(&host()).await.unwrap();
  assert_ne!(next.game_id(), s.game_id());

  let game = next.game().await.unwrap();
  assert_eq!(game.state, GameState::Idle);
  assert!(game.board.cells().iter().all(Option::is_none));
  assert!(next.answers().await.unwrap().is_empty());
  assert_eq!(s.answers().await.unwrap().len(), 3);

  let squares = next.squares().await.unwrap();
  assert!(squares.iter().all(|sq| sq.state.is_none() && !sq.active));
  assert_eq!(squares.iter().filter(|sq| sq.secret).count(), 1);

  let live = GameSession::open(Arc::clone(next.store()), SLUG).await.unwrap();
  assert_eq!(live.game_id(), next.game_id());
}

// ─── Audience ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn guess_tally_three_to_one() {
  let s = session().await;
  let (_, question) = s.select(&host(), at(&s, 0).await.square_id).await.unwrap();

  for (user, choice) in [
    ("u1", GuessChoice::Agree),
    ("u2", GuessChoice::Agree),
    ("u3", GuessChoice::Agree),
    ("u4", GuessChoice::Disagree),
  ] {
    s.guess(&player(user), choice).await.unwrap();
  }

  let tally = s.guess_tally(question.question_id).await.unwrap();
  assert_eq!(tally.agree, 3);
  assert_eq!(tally.disagree, 1);
  assert_eq!(tally.agree_pct, 75);
  assert_eq!(tally.disagree_pct, 25);
}

#[tokio::test]
async fn no_guesses_tally_is_zero() {
  let s = session().await;
  let (_, question) = s.select(&host(), at(&s, 0).await.square_id).await.unwrap();
  let tally = s.guess_tally(question.question_id).await.unwrap();
  assert_eq!(tally, GuessTally::default());
}

#[tokio::test]
async fn changing_a_guess_replaces_it() {
  let s = session().await;
  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();
  let alice = player("user_alice");

  s.guess(&alice, GuessChoice::Agree).await.unwrap();
  s.guess(&alice, GuessChoice::Disagree).await.unwrap();

  let mine = s.my_guess(&alice).await.unwrap().unwrap();
  assert_eq!(mine.guess, GuessChoice::Disagree);
  assert!(s.my_guess(&player("user_bob")).await.unwrap().is_none());

  let question = s.active_question().await.unwrap().unwrap();
  assert_eq!(s.guess_tally(question.question_id).await.unwrap().total(), 1);
}

#[tokio::test]
async fn anonymous_guess_rejected() {
  let s = session().await;
  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();

  let err = s.guess(&Caller::anonymous(), GuessChoice::Agree).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized(_)));

  let question = s.active_question().await.unwrap().unwrap();
  assert_eq!(s.guess_tally(question.question_id).await.unwrap().total(), 0);
}

#[tokio::test]
async fn guess_without_active_turn_rejected() {
  let s = session().await;
  let err = s.guess(&player("u1"), GuessChoice::Agree).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::NoActiveSquare)
  ));
}

#[tokio::test]
async fn score_counts_missing_guess_as_wrong() {
  let s = session().await;
  let alice = player("user_alice");

  // First question: ruled correct, Alice agreed.
  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();
  s.guess(&alice, GuessChoice::Agree).await.unwrap();
  s.record_answer(&host(), true).await.unwrap();
  s.mark_o(&host(), at(&s, 0).await.square_id).await.unwrap();

  // Second question: Alice sat it out.
  play(&s, 1, Mark::O).await;

  let score = s.my_score(&alice).await.unwrap();
  assert_eq!(score, Score { correct: 1, total: 2 });
}

#[tokio::test]
async fn score_ignores_questions_still_open() {
  let s = session().await;
  let alice = player("user_alice");

  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();
  s.guess(&alice, GuessChoice::Agree).await.unwrap();
  s.record_answer(&host(), true).await.unwrap();

  assert_eq!(s.my_score(&alice).await.unwrap(), Score::default());
}

#[tokio::test]
async fn scoreboard_lists_zero_score_players() {
  let s = session().await;
  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();
  s.guess(&player("u_right"), GuessChoice::Disagree).await.unwrap();
  s.guess(&player("u_wrong"), GuessChoice::Agree).await.unwrap();
  s.mark_incorrect(&host(), at(&s, 0).await.square_id).await.unwrap();

  let board = s.scoreboard().await.unwrap();
  assert_eq!(board.get("u_right"), Some(&1));
  assert_eq!(board.get("u_wrong"), Some(&0));
  assert_eq!(board.len(), 2);
}

#[tokio::test]
async fn secret_square_outcome_follows_the_ruling() {
  let s = session().await;
  let secret = s.store().secret_square().await.unwrap().unwrap();
  let agree = player("u_agree");
  let disagree = player("u_disagree");
  let silent = player("u_silent");

  s.select(&host(), secret.square_id).await.unwrap();
  s.guess(&agree, GuessChoice::Agree).await.unwrap();
  s.guess(&disagree, GuessChoice::Disagree).await.unwrap();
  s.record_answer(&host(), true).await.unwrap();

  // Ruled but the turn is still open.
  assert_eq!(
    s.secret_square_outcome(&agree).await.unwrap(),
    SecretSquareOutcome::Undetermined
  );

  s.mark_o(&host(), secret.square_id).await.unwrap();

  assert_eq!(
    s.secret_square_outcome(&agree).await.unwrap(),
    SecretSquareOutcome::Correct
  );
  assert_eq!(
    s.secret_square_outcome(&disagree).await.unwrap(),
    SecretSquareOutcome::Incorrect
  );
  assert_eq!(
    s.secret_square_outcome(&silent).await.unwrap(),
    SecretSquareOutcome::Undetermined
  );
}

// ─── Undoing a turn ──────────────────────────────────────────────────────────

#[tokio::test]
async fn deselect_keeps_the_mark() {
  let s = session().await;
  play(&s, 3, Mark::X).await;
  let square_id = at(&s, 3).await.square_id;
  s.store()
    .patch_square(square_id, SquarePatch { active: Some(true), ..SquarePatch::default() })
    .await
    .unwrap();

  let square = s.deselect(&host(), square_id).await.unwrap();
  assert!(!square.active);
  assert_eq!(square.state, Some(Mark::X));
  assert_eq!(s.game().await.unwrap().board.get(3), Some(Mark::X));
}

#[tokio::test]
async fn clearing_secret_turn_returns_to_idle() {
  let s = session().await;
  let secret = s.store().secret_square().await.unwrap().unwrap();
  s.select(&host(), secret.square_id).await.unwrap();
  assert_eq!(s.game().await.unwrap().state, GameState::SecretSquare);

  s.clear_square(&host(), secret.square_id).await.unwrap();
  assert_eq!(s.game().await.unwrap().state, GameState::Idle);
  assert!(s.active_square().await.unwrap().is_none());
  assert!(s.active_question().await.unwrap().is_none());

  let ordinary = at(&s, ordinary_location(&s).await).await;
  s.select(&host(), ordinary.square_id).await.unwrap();
  assert_eq!(s.game().await.unwrap().state, GameState::Idle);
}

#[tokio::test]
async fn deselecting_shown_turn_returns_to_idle() {
  let s = session().await;
  let secret = s.store().secret_square().await.unwrap().unwrap();
  s.select(&host(), secret.square_id).await.unwrap();
  s.record_answer(&host(), true).await.unwrap();
  s.show_guesses(&host()).await.unwrap();

  let square = s.deselect(&host(), secret.square_id).await.unwrap();
  assert!(!square.active);
  assert_eq!(s.game().await.unwrap().state, GameState::Idle);
  assert!(s.active_question().await.unwrap().is_none());

  s.select(&host(), secret.square_id).await.unwrap();
  assert_eq!(s.game().await.unwrap().state, GameState::SecretSquare);
}

#[tokio::test]
async fn clear_all_abandons_the_live_turn() {
  let s = session().await;
  let secret = s.store().secret_square().await.unwrap().unwrap();
  s.select(&host(), secret.square_id).await.unwrap();

  s.clear_all(&host()).await.unwrap();
  assert_eq!(s.game().await.unwrap().state, GameState::Idle);
  assert!(s.active_square().await.unwrap().is_none());
  assert!(s.active_question().await.unwrap().is_none());

  let err = s.record_answer(&host(), true).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::NoActiveQuestion)
  ));
}

#[tokio::test]
async fn next_game_mid_turn_starts_without_a_question() {
  let s = session().await;
  s.select(&host(), at(&s, 0).await.square_id).await.unwrap();

  let next = s.next_game(&host()).await.unwrap();
  assert!(next.active_square().await.unwrap().is_none());
  assert!(next.active_question().await.unwrap().is_none());

  let err = next.record_answer(&host(), true).await.unwrap_err();
  assert!(matches!(
    err,
    Error::PreconditionUnmet(Precondition::NoActiveQuestion)
  ));
}

// ─── Later games ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_game_scores_only_ended_turns() {
  let s = session().await;
  play(&s, 0, Mark::O).await;
  let next = s.next_game(&host()).await.unwrap();
  let alice = player("user_alice");

  // The catalog question is complete from the first game, but this turn is
  // still open.
  let square = at(&next, 0).await;
  next.select(&host(), square.square_id).await.unwrap();
  next.guess(&alice, GuessChoice::Agree).await.unwrap();
  next.record_answer(&host(), true).await.unwrap();
  assert_eq!(next.my_score(&alice).await.unwrap(), Score::default());

  next.mark_o(&host(), square.square_id).await.unwrap();
  assert_eq!(next.my_score(&alice).await.unwrap(), Score { correct: 1, total: 1 });
}

#[tokio::test]
async fn second_game_secret_outcome_waits_for_the_mark() {
  let s = session().await;
  play(&s, 0, Mark::O).await;
  let next = s.next_game(&host()).await.unwrap();

  let seed = (0u64..).find(|seed| choose_secret_index(*seed) == 0).unwrap();
  let secret = next.reset_secret_square(&host(), seed).await.unwrap();
  assert_eq!(secret.location, 0);

  let alice = player("user_alice");
  next.select(&host(), secret.square_id).await.unwrap();
  next.guess(&alice, GuessChoice::Agree).await.unwrap();
  next.record_answer(&host(), true).await.unwrap();
  assert_eq!(
    next.secret_square_outcome(&alice).await.unwrap(),
    SecretSquareOutcome::Undetermined
  );

  next.mark_o(&host(), secret.square_id).await.unwrap();
  assert_eq!(
    next.secret_square_outcome(&alice).await.unwrap(),
    SecretSquareOutcome::Correct
  );
}
