//! The caller's identity, as supplied by an external sign-in provider.
//!
//! The engine never authenticates anyone. It consumes an opaque user id and a
//! host capability flag and gates its entry points on them.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub trait Identity {
  /// `None` for an anonymous caller.
  fn current_user_id(&self) -> Option<&str>;

  /// Whether the caller holds the privileged host role.
  fn is_host(&self) -> bool;
}

/// Plain identity value, for callers that already resolved one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
  pub user_id: Option<String>,
  pub host:    bool,
}

impl Caller {
  pub fn host(user_id: impl Into<String>) -> Self {
    Self { user_id: Some(user_id.into()), host: true }
  }

  pub fn player(user_id: impl Into<String>) -> Self {
    Self { user_id: Some(user_id.into()), host: false }
  }

  pub fn anonymous() -> Self { Self::default() }
}

impl Identity for Caller {
  fn current_user_id(&self) -> Option<&str> { self.user_id.as_deref() }

  fn is_host(&self) -> bool { self.host }
}

/// Reject non-hosts before any store write.
pub fn require_host(caller: &impl Identity) -> Result<()> {
  if caller.is_host() {
    Ok(())
  } else {
    tracing::warn!(user = ?caller.current_user_id(), "host-only action rejected");
    Err(Error::Unauthorized("host role required"))
  }
}

/// The signed-in caller's user id.
pub fn require_user(caller: &impl Identity) -> Result<String> {
  caller
    .current_user_id()
    .map(str::to_owned)
    .ok_or(Error::Unauthorized("sign-in required"))
}
