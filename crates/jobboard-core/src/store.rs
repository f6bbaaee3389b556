//! The `AccountStore` trait.
//!
//! Implemented by storage backends (e.g. `jobboard-store-sqlite`). The
//! lifecycle layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::account::{Account, AccountKind};

/// Abstraction over the persistent account collections.
///
/// Each kind is its own collection: emails are unique per kind, and the
/// secondary identifiers (national ID; tax number, commercial register) are
/// unique when present. A write that would break either constraint fails
/// with [`crate::Error::Conflict`] once converted.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AccountStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  /// Persist a newly registered account.
  fn create_account(
    &self,
    account: Account,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Retrieve an account of the given kind by id.
  fn get_account(
    &self,
    kind: AccountKind,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Retrieve an account by id regardless of kind.
  fn find_account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// Look an account up by its (already normalised) email.
  fn find_by_email<'a>(
    &'a self,
    kind: AccountKind,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Atomically load, modify and write back one account.
  ///
  /// `apply` runs against the current stored state; nothing is written if it
  /// returns an error, and that error is handed back to the caller. Returns
  /// `None` if the account does not exist.
  fn update_account<F>(
    &self,
    kind: AccountKind,
    id: Uuid,
    apply: F,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_
  where
    F: FnOnce(&mut Account) -> crate::Result<()> + Send + 'static;

  /// Remove an account. Returns `false` if it did not exist.
  fn delete_account(
    &self,
    kind: AccountKind,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
