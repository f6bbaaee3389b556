//! One-time verification codes for email confirmation and login step-up.
//!
//! Codes are six decimal digits drawn uniformly from `100000..=999999`. A
//! newly issued code replaces any earlier one. Codes expire after the TTL
//! given at issue time; an expired code never verifies.

use chrono::{DateTime, Duration, Utc};
use rand::Rng as _;

use crate::{
  Error, Result,
  account::{Account, PendingCode},
};

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

/// Default lifetime of an issued code, in minutes.
pub const DEFAULT_CODE_TTL_MINUTES: i64 = 10;

/// Draw a fresh code.
pub fn generate_code() -> String {
  rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX).to_string()
}

/// Store a new code on `account` and return it.
pub fn issue(account: &mut Account, now: DateTime<Utc>, ttl: Duration) -> String {
  let code = generate_code();
  account.pending_code = Some(PendingCode { code: code.clone(), expires_at: now + ttl });
  code
}

/// Compare `submitted` with the stored code.
///
/// On a match the code is consumed, the account becomes verified and
/// `last_login_at` is stamped. Otherwise the account is left untouched.
pub fn verify(account: &mut Account, submitted: &str, now: DateTime<Utc>) -> bool {
  let matches = account
    .pending_code
    .as_ref()
    .is_some_and(|p| p.expires_at > now && p.code == submitted);

  if matches {
    account.pending_code = None;
    account.is_verified = true;
    account.last_login_at = Some(now);
  }
  matches
}

/// Re-issue a registration code. Verified accounts have nothing to confirm.
pub fn resend(account: &mut Account, now: DateTime<Utc>, ttl: Duration) -> Result<String> {
  if account.is_verified {
    return Err(Error::AlreadyVerified);
  }
  Ok(issue(account, now, ttl))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::account::{JobSeekerProfile, Profile};

  fn account() -> Account {
    Account::new(
      "ali@x.com",
      String::new(),
      Profile::JobSeeker(JobSeekerProfile { name: "Ali".into(), ..Default::default() }),
      Utc::now(),
    )
  }

  fn ttl() -> Duration { Duration::minutes(DEFAULT_CODE_TTL_MINUTES) }

  #[test]
  fn codes_are_six_digits_in_range() {
    for _ in 0..500 {
      let code = generate_code();
      assert_eq!(code.len(), 6);
      let n: u32 = code.parse().unwrap();
      assert!((CODE_MIN..=CODE_MAX).contains(&n));
    }
  }

  #[test]
  fn correct_code_verifies_once() {
    let mut a = account();
    let now = Utc::now();
    let code = issue(&mut a, now, ttl());

    assert!(verify(&mut a, &code, now));
    assert!(a.is_verified);
    assert!(a.pending_code.is_none());
    assert_eq!(a.last_login_at, Some(now));

    assert!(!verify(&mut a, &code, now));
  }

  #[test]
  fn wrong_code_leaves_account_unchanged() {
    let mut a = account();
    let now = Utc::now();
    let code = issue(&mut a, now, ttl());
    let wrong = if code == "100000" { "100001" } else { "100000" };

    assert!(!verify(&mut a, wrong, now));
    assert!(!verify(&mut a, &format!(" {code}"), now));
    assert!(!a.is_verified);
    assert_eq!(a.pending_code.as_ref().map(|p| p.code.as_str()), Some(code.as_str()));
    assert!(a.last_login_at.is_none());
  }

  #[test]
  fn expired_code_is_rejected() {
    let mut a = account();
    let issued = Utc::now();
    let code = issue(&mut a, issued, ttl());

    assert!(!verify(&mut a, &code, issued + Duration::minutes(11)));
    assert!(!a.is_verified);
  }

  #[test]
  fn reissue_supersedes_previous_code() {
    let mut a = account();
    let now = Utc::now();
    issue(&mut a, now, ttl());
    let latest = issue(&mut a, now, ttl());
    assert_eq!(a.pending_code.as_ref().unwrap().code, latest);
  }

  #[test]
  fn resend_refuses_verified_accounts() {
    let mut a = account();
    a.is_verified = true;
    assert!(matches!(
      resend(&mut a, Utc::now(), ttl()),
      Err(Error::AlreadyVerified)
    ));
    assert!(a.pending_code.is_none());
  }
}
