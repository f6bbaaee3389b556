//! Handlers shared by both account kinds. The kind comes from an
//! [`Extension`] installed on each kind's router.
//!
//! | Method | Path | Auth | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/login` | – | `{email, password}`; always answers `requiresVerification` |
//! | `POST` | `/verify-code` | – | `{email, code}`; returns the session token |
//! | `POST` | `/resend-code` | – | `{email}`; unverified accounts only |
//! | `GET`  | `/profile-by-token` | ✓ | the caller's own account |
//! | `GET`  | `/profile/{id}` | ✓ | `id` must be the caller |
//! | `POST` | `/update-profile` | ✓ | `{step, data}` |
//! | `GET`  | `/profile-status/{id}` | ✓ | `id` must be the caller |
//! | `DELETE` | `/me` | ✓ | irreversible |

use axum::{
  Extension, Json, Router,
  extract::State,
  routing::{delete, get, post},
};
use jobboard_core::{
  Error,
  account::AccountKind,
  mail::Mailer,
  store::AccountStore,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::{coerce_string, reply};
use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  extract::{JsonBody, PathParam},
};

pub fn routes<S, M>() -> Router<AppState<S, M>>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  Router::new()
    .route("/login", post(login::<S, M>))
    .route("/verify-code", post(verify_code::<S, M>))
    .route("/resend-code", post(resend_code::<S, M>))
    .route("/profile-by-token", get(profile_by_token::<S, M>))
    .route("/profile/{id}", get(profile::<S, M>))
    .route("/update-profile", post(update_profile::<S, M>))
    .route("/profile-status/{id}", get(profile_status::<S, M>))
    .route("/me", delete(delete_me::<S, M>))
}

fn required(name: &str, value: Option<String>) -> Result<String, Error> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
    .ok_or_else(|| Error::missing_fields(vec![name.to_owned()]))
}

// ─── Login & verification ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    Option<String>,
  pub password: Option<String>,
}

/// `POST /login`
pub async fn login<S, M>(
  State(state): State<AppState<S, M>>,
  Extension(kind): Extension<AccountKind>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let missing: Vec<String> = [("email", &body.email), ("password", &body.password)]
    .into_iter()
    .filter(|(_, v)| v.as_deref().is_none_or(|v| v.trim().is_empty()))
    .map(|(name, _)| name.to_owned())
    .collect();
  if !missing.is_empty() {
    return Err(Error::missing_fields(missing).into());
  }
  let email = body.email.unwrap_or_default();
  let password = body.password.unwrap_or_default();

  let issued = state.lifecycle.login(kind, &email, &password).await?;
  let mut out = reply("a verification code has been sent to your email", issued)?;
  out.0["requiresVerification"] = Value::Bool(true);
  Ok(out)
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
  pub email: Option<String>,
  /// A string or a number.
  pub code:  Option<Value>,
}

/// `POST /verify-code`
pub async fn verify_code<S, M>(
  State(state): State<AppState<S, M>>,
  Extension(kind): Extension<AccountKind>,
  JsonBody(body): JsonBody<VerifyBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let code = coerce_string(body.code).filter(|c| !c.trim().is_empty());
  let (email, code) = match (body.email.filter(|e| !e.trim().is_empty()), code) {
    (Some(email), Some(code)) => (email, code),
    (email, code) => {
      let mut missing = Vec::new();
      if email.is_none() {
        missing.push("email".to_owned());
      }
      if code.is_none() {
        missing.push("code".to_owned());
      }
      return Err(Error::missing_fields(missing).into());
    }
  };

  let session = state.lifecycle.verify_code(kind, &email, &code).await?;
  reply("email verified", session)
}

#[derive(Debug, Deserialize)]
pub struct ResendBody {
  pub email: Option<String>,
}

/// `POST /resend-code`
pub async fn resend_code<S, M>(
  State(state): State<AppState<S, M>>,
  Extension(kind): Extension<AccountKind>,
  JsonBody(body): JsonBody<ResendBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let email = required("email", body.email)?;
  let issued = state.lifecycle.resend_code(kind, &email).await?;
  reply("a new verification code has been sent", issued)
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// `GET /profile-by-token`
pub async fn profile_by_token<S, M>(
  State(state): State<AppState<S, M>>,
  Extension(kind): Extension<AccountKind>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let account = state.lifecycle.profile(&principal, kind, principal.account_id).await?;
  reply("profile loaded", json!({ "account": account }))
}

/// `GET /profile/{id}`
pub async fn profile<S, M>(
  State(state): State<AppState<S, M>>,
  Extension(kind): Extension<AccountKind>,
  Authenticated(principal): Authenticated,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let account = state.lifecycle.profile(&principal, kind, id).await?;
  reply("profile loaded", json!({ "account": account }))
}

#[derive(Debug, Deserialize)]
pub struct StepBody {
  /// A number, or a string holding one.
  pub step: Option<Value>,
  pub data: Option<Value>,
}

impl StepBody {
  fn into_parts(self) -> Result<(Option<i64>, Option<Map<String, Value>>), Error> {
    let step = match self.step {
      None | Some(Value::Null) => None,
      Some(Value::Number(n)) => Some(n.as_i64().ok_or_else(|| Error::validation("step must be an integer"))?),
      Some(Value::String(s)) if s.trim().is_empty() => None,
      Some(Value::String(s)) => Some(
        s.trim()
          .parse()
          .map_err(|_| Error::validation("step must be an integer"))?,
      ),
      Some(_) => return Err(Error::validation("step must be an integer")),
    };
    let data = match self.data {
      None | Some(Value::Null) => None,
      Some(Value::Object(map)) => Some(map),
      Some(_) => return Err(Error::validation("data must be an object")),
    };
    Ok((step, data))
  }
}

/// `POST /update-profile`
pub async fn update_profile<S, M>(
  State(state): State<AppState<S, M>>,
  Extension(kind): Extension<AccountKind>,
  Authenticated(principal): Authenticated,
  JsonBody(body): JsonBody<StepBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let (step, data) = body.into_parts()?;
  let outcome = state
    .lifecycle
    .apply_step(&principal, kind, principal.account_id, step, data)
    .await?;
  reply("profile updated", json!({ "profileCompletion": outcome }))
}

/// `GET /profile-status/{id}`
pub async fn profile_status<S, M>(
  State(state): State<AppState<S, M>>,
  Extension(kind): Extension<AccountKind>,
  Authenticated(principal): Authenticated,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let status = state.lifecycle.profile_status(&principal, kind, id).await?;
  reply("profile status", status)
}

/// `DELETE /me`
pub async fn delete_me<S, M>(
  State(state): State<AppState<S, M>>,
  Extension(kind): Extension<AccountKind>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  if principal.kind != kind {
    return Err(Error::NotFound(kind.noun().into()).into());
  }
  state.lifecycle.delete_account(&principal).await?;
  reply("account deleted", ())
}
