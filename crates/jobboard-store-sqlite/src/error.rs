//! Error type for `jobboard-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] jobboard_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A UNIQUE column already holds this value.
  #[error("duplicate value for {column}")]
  Duplicate { column: String },
}

impl Error {
  /// Classify a database failure, singling out UNIQUE violations.
  pub(crate) fn from_db(err: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(e) = &err
      && let Some(column) = unique_violation(e)
    {
      return Self::Duplicate { column };
    }
    Self::Database(err)
  }
}

/// The offending column of a UNIQUE constraint failure, if that is what
/// `err` is. SQLite reports these as `UNIQUE constraint failed: table.column`.
pub(crate) fn unique_violation(err: &rusqlite::Error) -> Option<String> {
  let rusqlite::Error::SqliteFailure(code, Some(message)) = err else {
    return None;
  };
  if code.extended_code != rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
    return None;
  }
  let column = message.rsplit('.').next()?;
  Some(column.trim().to_owned())
}

impl From<Error> for jobboard_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Duplicate { column } => jobboard_core::Error::Conflict(match column.as_str() {
        "email" => "an account with this email already exists".to_owned(),
        "national_id" => "this national ID is already registered".to_owned(),
        "tax_number" => "this tax number is already registered".to_owned(),
        "commercial_register" => "this commercial register is already registered".to_owned(),
        other => format!("{other} is already in use"),
      }),
      other => jobboard_core::Error::Store(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
