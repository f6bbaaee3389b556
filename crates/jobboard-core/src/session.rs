//! Session credentials and the authenticated principal.

use chrono::Duration;
use uuid::Uuid;

use crate::{
  Result,
  account::{Account, AccountKind},
};

/// Lifetime of an issued session token.
pub const SESSION_TTL_DAYS: i64 = 7;

pub fn session_ttl() -> Duration { Duration::days(SESSION_TTL_DAYS) }

/// Mints and checks signed session tokens bound to an account id.
///
/// Tokens are not refreshable and there is no revocation list; logging out
/// is the client discarding its token.
pub trait SessionIssuer: Send + Sync {
  fn issue(&self, account_id: Uuid) -> Result<String>;

  /// Return the account id a valid, unexpired token was issued for.
  fn verify(&self, token: &str) -> Result<Uuid>;
}

/// The verified account making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
  pub account_id: Uuid,
  pub kind:       AccountKind,
}

impl Principal {
  pub fn of(account: &Account) -> Self {
    Self { account_id: account.account_id, kind: account.kind() }
  }

  /// Fail with `Forbidden` unless `target` is the principal's own account.
  pub fn ensure_owner(&self, target: Uuid) -> Result<()> {
    if self.account_id == target {
      Ok(())
    } else {
      Err(crate::Error::Forbidden)
    }
  }
}
