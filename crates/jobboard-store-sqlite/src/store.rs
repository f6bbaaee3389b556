//! [`SqliteStore`], the SQLite implementation of [`AccountStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use jobboard_core::{
  account::{Account, AccountKind},
  store::AccountStore,
};

use crate::{
  Error, Result,
  encode::{RawAccount, Table, encode_uuid, table},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An account store backed by a single SQLite file.
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

  /// Fetch one row of `table` matching `column = value`.
  async fn select_one(
    &self,
    kind: AccountKind,
    column: &'static str,
    value: String,
  ) -> Result<Option<Account>> {
    let table = table(kind);
    let raw = self
      .conn
      .call(move |conn| Ok(query_one(conn, table, column, &value)?))
      .await?;
    raw.map(|r| r.into_account(kind)).transpose()
  }
}

fn query_one(
  conn: &rusqlite::Connection,
  table: &Table,
  column: &str,
  value: &str,
) -> rusqlite::Result<Option<RawAccount>> {
  let sql = format!(
    "SELECT {} FROM {} WHERE {column} = ?1",
    table.select_list(),
    table.name
  );
  conn
    .query_row(&sql, rusqlite::params![value], RawAccount::from_row)
    .optional()
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  type Error = Error;

  async fn create_account(&self, account: Account) -> Result<Account> {
    let table = table(account.kind());
    let row = RawAccount::from_account(&account)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(&table.insert_sql(), row.params().as_slice())?;
        Ok(())
      })
      .await
      .map_err(Error::from_db)?;
    Ok(account)
  }

  async fn get_account(&self, kind: AccountKind, id: Uuid) -> Result<Option<Account>> {
    self.select_one(kind, "account_id", encode_uuid(id)).await
  }

  async fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
    for kind in [AccountKind::JobSeeker, AccountKind::Company] {
      if let Some(account) = self.get_account(kind, id).await? {
        return Ok(Some(account));
      }
    }
    Ok(None)
  }

  async fn find_by_email<'a>(
    &'a self,
    kind: AccountKind,
    email: &'a str,
  ) -> Result<Option<Account>> {
    self.select_one(kind, "email", email.to_owned()).await
  }

  async fn update_account<F>(
    &self,
    kind: AccountKind,
    id: Uuid,
    apply: F,
  ) -> Result<Option<Account>>
  where
    F: FnOnce(&mut Account) -> jobboard_core::Result<()> + Send + 'static,
  {
    let table = table(kind);
    let id_str = encode_uuid(id);

    // The read, the caller's edit and the write share one IMMEDIATE
    // transaction; an error from `apply` drops it uncommitted.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(raw) = query_one(&tx, table, "account_id", &id_str)? else {
          return Ok(Ok(None));
        };
        let mut account = match raw.into_account(kind) {
          Ok(account) => account,
          Err(e) => return Ok(Err(e)),
        };
        if let Err(e) = apply(&mut account) {
          return Ok(Err(Error::Core(e)));
        }
        let row = match RawAccount::from_account(&account) {
          Ok(row) => row,
          Err(e) => return Ok(Err(e)),
        };
        tx.execute(&table.update_sql(), row.params().as_slice())?;
        tx.commit()?;
        Ok(Ok(Some(account)))
      })
      .await
      .map_err(Error::from_db)?
  }

  async fn delete_account(&self, kind: AccountKind, id: Uuid) -> Result<bool> {
    let table = table(kind);
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          &format!("DELETE FROM {} WHERE account_id = ?1", table.name),
          rusqlite::params![id_str],
        )?;
        Ok(n)
      })
      .await?;
    Ok(deleted > 0)
  }
}
