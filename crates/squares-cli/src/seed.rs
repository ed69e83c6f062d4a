//! Loading the square catalog from a JSON file.
//!
//! ```json
//! { "squares": [
//!   { "location": 0, "name": "Whoopi", "link": null, "photo": "whoopi.jpg",
//!     "questions": [ { "text": "…", "answer": "…" } ] }
//! ] }
//! ```

use std::path::Path;

use anyhow::{Context as _, bail};
use serde::Deserialize;
use squares_core::{
  entity::{NewQuestion, NewSquare},
  store::GameStore,
};

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
  pub squares: Vec<SquareEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SquareEntry {
  pub location:  u8,
  pub name:      String,
  #[serde(default)]
  pub link:      Option<String>,
  #[serde(default)]
  pub photo:     Option<String>,
  #[serde(default)]
  pub questions: Vec<QuestionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionEntry {
  pub text:   String,
  pub answer: String,
}

pub fn read(path: &Path) -> anyhow::Result<CatalogFile> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading catalog file {}", path.display()))?;
  serde_json::from_str(&raw).context("parsing catalog file")
}

/// Insert every square and its questions. Returns (squares, questions)
/// inserted.
pub async fn load<S>(store: &S, catalog: CatalogFile) -> anyhow::Result<(usize, usize)>
where
  S: GameStore,
{
  if let Some(entry) = catalog.squares.iter().find(|e| e.questions.is_empty()) {
    bail!("square at location {} has no questions", entry.location);
  }

  let mut questions = 0;
  let count = catalog.squares.len();
  for entry in catalog.squares {
    let square = store
      .insert_square(NewSquare {
        location: entry.location,
        name:     entry.name,
        link:     entry.link,
        photo:    entry.photo,
      })
      .await
      .with_context(|| format!("inserting square at location {}", entry.location))?;

    for q in entry.questions {
      store
        .insert_question(NewQuestion {
          square_id: square.square_id,
          text:      q.text,
          answer:    q.answer,
        })
        .await
        .context("inserting question")?;
      questions += 1;
    }
    tracing::debug!(location = square.location, name = %square.name, "square seeded");
  }
  Ok((count, questions))
}
