//! Bearer-token authentication.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use jobboard_core::{Error, mail::Mailer, session::Principal, store::AccountStore};

use crate::{AppState, error::ApiError};

/// The verified account behind the request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Principal);

/// Pull the token out of an `Authorization: Bearer …` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }
  let token = token.trim();
  (!token.is_empty()).then_some(token)
}

impl<S, M> FromRequestParts<AppState<S, M>> for Authenticated
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, M>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)
      .ok_or_else(|| Error::Unauthorized("missing or malformed bearer token".into()))?;
    let principal = state.lifecycle.authenticate(token).await?;
    Ok(Self(principal))
  }
}
