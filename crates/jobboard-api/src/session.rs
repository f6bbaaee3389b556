//! HMAC-signed session tokens.
//!
//! A token is `base64url(claims) "." base64url(HMAC-SHA256(claims))`, where
//! the claims are `{"sub": <account id>, "iat": <unix>, "exp": <unix>}`.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use chrono::Utc;
use hmac::{Hmac, Mac};
use jobboard_core::{
  Error, Result,
  session::{SessionIssuer, session_ttl},
};
use rand::RngCore as _;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
  sub: Uuid,
  iat: i64,
  exp: i64,
}

/// Issues and checks tokens with a single server-side key.
pub struct HmacSessions {
  key: Vec<u8>,
}

impl HmacSessions {
  pub fn new(key: impl Into<Vec<u8>>) -> Self { Self { key: key.into() } }

  /// A throwaway key; tokens die with the process.
  pub fn ephemeral() -> Self {
    let mut key = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    Self { key }
  }

  fn mac(&self) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(&self.key)
      .map_err(|e| Error::Internal(format!("invalid session key: {e}")))
  }
}

fn invalid() -> Error { Error::Unauthorized("invalid or expired session token".into()) }

impl SessionIssuer for HmacSessions {
  fn issue(&self, account_id: Uuid) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
      sub: account_id,
      iat: now.timestamp(),
      exp: (now + session_ttl()).timestamp(),
    };
    let payload = B64.encode(serde_json::to_vec(&claims)?);

    let mut mac = self.mac()?;
    mac.update(payload.as_bytes());
    let signature = B64.encode(mac.finalize().into_bytes());
    Ok(format!("{payload}.{signature}"))
  }

  fn verify(&self, token: &str) -> Result<Uuid> {
    let (payload, signature) = token.split_once('.').ok_or_else(invalid)?;
    let signature = B64.decode(signature).map_err(|_| invalid())?;

    let mut mac = self.mac()?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| invalid())?;

    let claims: Claims = B64
      .decode(payload)
      .ok()
      .and_then(|bytes| serde_json::from_slice(&bytes).ok())
      .ok_or_else(invalid)?;
    if claims.exp <= Utc::now().timestamp() {
      return Err(invalid());
    }
    Ok(claims.sub)
  }
}
