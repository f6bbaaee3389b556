//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, and the kind-specific profile as compact JSON. The secondary
//! identifiers are copied out of the profile into their own UNIQUE columns.

use chrono::{DateTime, Utc};
use jobboard_core::account::{
  Account, AccountKind, PendingCode, Profile, ProfileCompletion,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Tables ──────────────────────────────────────────────────────────────────

/// Where one account kind lives and which of its identifiers are unique.
pub struct Table {
  pub name: &'static str,
  pub keys: &'static [&'static str],
}

pub const JOB_SEEKERS: Table = Table { name: "job_seekers", keys: &["national_id"] };

pub const COMPANIES: Table = Table {
  name: "companies",
  keys: &["tax_number", "commercial_register"],
};

pub fn table(kind: AccountKind) -> &'static Table {
  match kind {
    AccountKind::JobSeeker => &JOB_SEEKERS,
    AccountKind::Company => &COMPANIES,
  }
}

/// Columns every table shares, in row order.
pub const COMMON_COLUMNS: &[&str] = &[
  "account_id",
  "email",
  "password_hash",
  "is_verified",
  "verification_code",
  "code_expires_at",
  "step",
  "is_complete",
  "trust_score",
  "created_at",
  "last_login_at",
  "profile_json",
];

impl Table {
  /// Columns read back into a [`RawAccount`]. Key columns are write-only.
  pub fn select_list(&self) -> String { COMMON_COLUMNS.join(", ") }

  pub fn insert_sql(&self) -> String {
    let columns: Vec<&str> = COMMON_COLUMNS.iter().chain(self.keys).copied().collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
      "INSERT INTO {} ({}) VALUES ({})",
      self.name,
      columns.join(", "),
      params.join(", ")
    )
  }

  /// `UPDATE` of every column but the primary key, which binds as `?1`.
  pub fn update_sql(&self) -> String {
    let assignments: Vec<String> = COMMON_COLUMNS
      .iter()
      .chain(self.keys)
      .enumerate()
      .skip(1)
      .map(|(i, column)| format!("{column} = ?{}", i + 1))
      .collect();
    format!(
      "UPDATE {} SET {} WHERE account_id = ?1",
      self.name,
      assignments.join(", ")
    )
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values of one account row, in [`COMMON_COLUMNS`] order followed by
/// the table's key columns.
pub struct RawAccount {
  pub account_id:        String,
  pub email:             String,
  pub password_hash:     String,
  pub is_verified:       bool,
  pub verification_code: Option<String>,
  pub code_expires_at:   Option<String>,
  pub step:              i64,
  pub is_complete:       bool,
  pub trust_score:       i64,
  pub created_at:        String,
  pub last_login_at:     Option<String>,
  pub profile_json:      String,
  pub keys:              Vec<Option<String>>,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:        row.get(0)?,
      email:             row.get(1)?,
      password_hash:     row.get(2)?,
      is_verified:       row.get(3)?,
      verification_code: row.get(4)?,
      code_expires_at:   row.get(5)?,
      step:              row.get(6)?,
      is_complete:       row.get(7)?,
      trust_score:       row.get(8)?,
      created_at:        row.get(9)?,
      last_login_at:     row.get(10)?,
      profile_json:      row.get(11)?,
      keys:              Vec::new(),
    })
  }

  pub fn from_account(account: &Account) -> Result<Self> {
    let (profile_json, keys) = match &account.profile {
      Profile::JobSeeker(p) => (serde_json::to_string(p)?, vec![p.national_id.clone()]),
      Profile::Company(c) => (
        serde_json::to_string(c)?,
        vec![c.tax_number.clone(), c.commercial_register.clone()],
      ),
    };
    let pending = account.pending_code.as_ref();

    Ok(Self {
      account_id: encode_uuid(account.account_id),
      email: account.email.clone(),
      password_hash: account.password_hash.clone(),
      is_verified: account.is_verified,
      verification_code: pending.map(|p| p.code.clone()),
      code_expires_at: pending.map(|p| encode_dt(p.expires_at)),
      step: i64::from(account.completion.step),
      is_complete: account.completion.is_complete,
      trust_score: i64::from(account.completion.trust_score),
      created_at: encode_dt(account.created_at),
      last_login_at: account.last_login_at.map(encode_dt),
      profile_json,
      keys,
    })
  }

  /// Bind values in column order.
  pub fn params(&self) -> Vec<&dyn rusqlite::ToSql> {
    let mut params: Vec<&dyn rusqlite::ToSql> = vec![
      &self.account_id,
      &self.email,
      &self.password_hash,
      &self.is_verified,
      &self.verification_code,
      &self.code_expires_at,
      &self.step,
      &self.is_complete,
      &self.trust_score,
      &self.created_at,
      &self.last_login_at,
      &self.profile_json,
    ];
    params.extend(self.keys.iter().map(|k| k as &dyn rusqlite::ToSql));
    params
  }

  pub fn into_account(self, kind: AccountKind) -> Result<Account> {
    let profile = match kind {
      AccountKind::JobSeeker => Profile::JobSeeker(serde_json::from_str(&self.profile_json)?),
      AccountKind::Company => Profile::Company(serde_json::from_str(&self.profile_json)?),
    };

    let pending_code = match (self.verification_code, self.code_expires_at) {
      (Some(code), Some(expires_at)) => Some(PendingCode {
        code,
        expires_at: decode_dt(&expires_at)?,
      }),
      _ => None,
    };

    Ok(Account {
      account_id: decode_uuid(&self.account_id)?,
      email: self.email,
      password_hash: self.password_hash,
      is_verified: self.is_verified,
      pending_code,
      completion: ProfileCompletion {
        step:        u8::try_from(self.step).unwrap_or(1),
        is_complete: self.is_complete,
        trust_score: u8::try_from(self.trust_score).unwrap_or(0),
      },
      created_at: decode_dt(&self.created_at)?,
      last_login_at: self.last_login_at.as_deref().map(decode_dt).transpose()?,
      profile,
    })
  }
}
