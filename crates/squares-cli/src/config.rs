//! Layered configuration: optional TOML file, then `SQUARES_*` environment
//! variables, then command-line overrides.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use squares_core::identity::Caller;

/// Which side of the game the caller plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Host,
  #[default]
  Player,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default = "default_slug")]
  pub slug:       String,
  /// Opaque user id from the sign-in provider. Absent means anonymous.
  #[serde(default)]
  pub user:       Option<String>,
  #[serde(default)]
  pub role:       Role,
}

fn default_store_path() -> PathBuf { PathBuf::from("squares.db") }

fn default_slug() -> String { "main".to_string() }

/// Values given on the command line; each one beats the file and environment.
#[derive(Debug, Default)]
pub struct Overrides {
  pub store_path: Option<PathBuf>,
  pub slug:       Option<String>,
  pub user:       Option<String>,
  pub role:       Option<Role>,
}

impl CliConfig {
  pub fn load(path: &Path, overrides: Overrides) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SQUARES"))
      .set_override_option(
        "store_path",
        overrides.store_path.map(|p| p.to_string_lossy().into_owned()),
      )?
      .set_override_option("slug", overrides.slug)?
      .set_override_option("user", overrides.user)?
      .set_override_option(
        "role",
        overrides.role.map(|r| match r {
          Role::Host => "host",
          Role::Player => "player",
        }),
      )?
      .build()
      .context("failed to read config")?;

    let mut cfg: CliConfig = settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  /// The identity every engine call is made under.
  pub fn caller(&self) -> Caller {
    Caller {
      user_id: self.user.clone(),
      host:    self.role == Role::Host,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
