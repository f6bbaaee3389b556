//! Outbound email: the `Mailer` trait and the verification message.
//!
//! Delivery is best-effort. A mailer reports failure by returning `false`
//! and never raises; callers log and carry on.

use std::future::Future;

use crate::account::AccountKind;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
  pub to:      String,
  pub subject: String,
  pub html:    String,
  pub text:    String,
}

pub trait Mailer: Send + Sync {
  /// Attempt delivery; `true` on success.
  fn send(&self, email: Email) -> impl Future<Output = bool> + Send + '_;
}

/// Build the verification-code message for `name`.
pub fn verification_email(
  to: &str,
  name: &str,
  code: &str,
  kind: AccountKind,
  ttl_minutes: i64,
) -> Email {
  let audience = match kind {
    AccountKind::JobSeeker => "your account",
    AccountKind::Company => "your company account",
  };
  let name = escape_html(name);

  let html = format!(
    r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"></head>
<body style="font-family: Arial, sans-serif;">
  <h1>Verify {audience}</h1>
  <p>Hello <strong>{name}</strong>,</p>
  <p>Use the code below to confirm your email address.</p>
  <p style="font-size: 32px; letter-spacing: 8px;"><strong>{code}</strong></p>
  <p>The code is valid for {ttl_minutes} minutes. Never share it with anyone.</p>
  <p>If you did not request this code you can ignore this message.</p>
</body>
</html>"#
  );

  Email {
    to:      to.to_owned(),
    subject: "Your verification code".to_owned(),
    html,
    text:    format!("Your verification code is: {code}"),
  }
}

fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn message_carries_code_in_both_bodies() {
    let email = verification_email("ali@x.com", "Ali", "482913", AccountKind::JobSeeker, 10);
    assert_eq!(email.to, "ali@x.com");
    assert!(email.html.contains("482913"));
    assert!(email.text.contains("482913"));
    assert!(email.html.contains("10 minutes"));
  }

  #[test]
  fn names_are_escaped() {
    let email = verification_email("a@b.c", "<script>", "100000", AccountKind::Company, 10);
    assert!(!email.html.contains("<script>"));
    assert!(email.html.contains("&lt;script&gt;"));
  }
}
