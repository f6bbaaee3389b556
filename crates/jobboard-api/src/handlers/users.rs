//! Job seeker routes, mounted at `/api/users`.
//!
//! Besides the routes in [`super::accounts`]:
//!
//! | Method | Path | Auth | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/register` | – | `201` with the new account id |
//! | `POST` | `/update-profile-info` | ✓ | `{name?, avatar?}` |
//! | `POST` | `/add-skill` | ✓ | `{skill}`; duplicates ignored |
//! | `POST` | `/add-language` | ✓ | `{name, proficiency?, native?}` |
//! | `POST` | `/upload-certificate` | ✓ | multipart; file in `certificate_file` is optional |
//! | `DELETE` | `/delete-certificate?name=` | ✓ | |
//! | `POST` | `/upload-avatar` | ✓ | multipart, image in `avatar` |
//! | `POST` | `/upload-id-card` | ✓ | multipart, image or PDF in `idCard` |
//! | `POST` | `/add-friend` | ✓ | `{friendId}` |
//! | `GET`  | `/friends` | ✓ | |

use axum::{
  Extension, Json, Router,
  extract::{Multipart, State, multipart::MultipartRejection},
  http::StatusCode,
  routing::{delete, get, post},
};
use chrono::Utc;
use jobboard_core::{
  Error,
  account::{AccountKind, Certificate, IdCard, Language},
  lifecycle::{JobSeekerRegistration, ProfileInfoUpdate, Registration},
  mail::Mailer,
  store::AccountStore,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{accounts, reply};
use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  extract::{JsonBody, QueryParams},
  uploads::{Form, UploadKind},
};

pub fn routes<S, M>() -> Router<AppState<S, M>>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  Router::new()
    .route("/register", post(register::<S, M>))
    .route("/update-profile-info", post(update_profile_info::<S, M>))
    .route("/add-skill", post(add_skill::<S, M>))
    .route("/add-language", post(add_language::<S, M>))
    .route("/upload-certificate", post(upload_certificate::<S, M>))
    .route("/delete-certificate", delete(delete_certificate::<S, M>))
    .route("/upload-avatar", post(upload_avatar::<S, M>))
    .route("/upload-id-card", post(upload_id_card::<S, M>))
    .route("/add-friend", post(add_friend::<S, M>))
    .route("/friends", get(friends::<S, M>))
    .merge(accounts::routes::<S, M>())
    .layer(Extension(AccountKind::JobSeeker))
}

/// `POST /register`
pub async fn register<S, M>(
  State(state): State<AppState<S, M>>,
  JsonBody(body): JsonBody<JobSeekerRegistration>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let issued = state.lifecycle.register(Registration::JobSeeker(body)).await?;
  let mut out = reply("account created; check your email for the verification code", issued)?;
  out.0["nextStep"] = Value::String("verify-email".into());
  Ok((StatusCode::CREATED, out))
}

/// `POST /update-profile-info`
pub async fn update_profile_info<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  JsonBody(body): JsonBody<ProfileInfoUpdate>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let account = state
    .lifecycle
    .update_profile_info(&principal, principal.account_id, body)
    .await?;
  reply("profile updated", json!({ "account": account }))
}

// ─── Skills, languages & certificates ────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SkillBody {
  #[serde(alias = "name")]
  pub skill: Option<String>,
}

/// `POST /add-skill`
pub async fn add_skill<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  JsonBody(body): JsonBody<SkillBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let skills = state
    .lifecycle
    .add_skill(&principal, principal.account_id, body.skill.unwrap_or_default())
    .await?;
  reply("skill saved", json!({ "skills": skills }))
}

#[derive(Debug, Deserialize)]
pub struct LanguageBody {
  pub name:        Option<String>,
  #[serde(alias = "proficiency_level")]
  pub proficiency: Option<String>,
  #[serde(default)]
  pub native:      bool,
}

/// `POST /add-language`
pub async fn add_language<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  JsonBody(body): JsonBody<LanguageBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let language = Language {
    name:        body.name.unwrap_or_default(),
    proficiency: body.proficiency.filter(|p| !p.trim().is_empty()),
    native:      body.native,
  };
  let languages = state
    .lifecycle
    .add_language(&principal, principal.account_id, language)
    .await?;
  reply("language saved", json!({ "languages": languages }))
}

/// `POST /upload-certificate`
///
/// Text fields `name`, `issuer` and `date`; the older `cert_name`,
/// `issuing_authority` and `issue_date` are read as fallbacks.
pub async fn upload_certificate<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let mut form = Form::read(multipart?).await?;
  let name = form.text("name").or_else(|| form.text("cert_name"));
  let Some(name) = name else {
    return Err(Error::missing_fields(vec!["name".into()]).into());
  };

  let stored = match form.take_file("certificate_file") {
    Some(part) => Some(state.files.save(UploadKind::Certificate, &part).await?),
    None => None,
  };
  let certificate = Certificate {
    name,
    issuer: form.text("issuer").or_else(|| form.text("issuing_authority")),
    date: form.text("date").or_else(|| form.text("issue_date")),
    file_url: stored.as_ref().map(|f| f.url.clone()),
  };

  match state
    .lifecycle
    .add_certificate(&principal, principal.account_id, certificate)
    .await
  {
    Ok(certificates) => reply("certificate saved", json!({ "certificates": certificates })),
    Err(e) => {
      if let Some(file) = &stored {
        state.files.discard(file).await;
      }
      Err(e.into())
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct CertificateQuery {
  pub name: Option<String>,
}

/// `DELETE /delete-certificate?name=`
pub async fn delete_certificate<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  QueryParams(query): QueryParams<CertificateQuery>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let Some(name) = query.name.filter(|n| !n.trim().is_empty()) else {
    return Err(Error::missing_fields(vec!["name".into()]).into());
  };
  let certificates = state
    .lifecycle
    .remove_certificate(&principal, principal.account_id, name)
    .await?;
  reply("certificate removed", json!({ "certificates": certificates }))
}

// ─── Documents ───────────────────────────────────────────────────────────────

fn no_file(field: &str) -> ApiError {
  ApiError::BadRequest(format!("no file was uploaded in `{field}`"))
}

/// `POST /upload-avatar`
pub async fn upload_avatar<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let mut form = Form::read(multipart?).await?;
  let part = form.take_file("avatar").ok_or_else(|| no_file("avatar"))?;
  let stored = state.files.save(UploadKind::Avatar, &part).await?;

  match state
    .lifecycle
    .set_avatar(&principal, principal.account_id, stored.url.clone())
    .await
  {
    Ok(account) => reply("avatar uploaded", json!({ "avatar": stored.url, "account": account })),
    Err(e) => {
      state.files.discard(&stored).await;
      Err(e.into())
    }
  }
}

/// `POST /upload-id-card`
pub async fn upload_id_card<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let mut form = Form::read(multipart?).await?;
  let part = form.take_file("idCard").ok_or_else(|| no_file("idCard"))?;
  let stored = state.files.save(UploadKind::IdCard, &part).await?;

  let card = IdCard {
    file_name:   stored.original_name.clone(),
    file_url:    stored.url.clone(),
    uploaded_at: Utc::now(),
  };
  match state
    .lifecycle
    .set_id_card(
      &principal,
      principal.account_id,
      card,
      form.text("nationalId"),
      form.text("governorate"),
    )
    .await
  {
    Ok(account) => reply("ID card uploaded", json!({ "account": account })),
    Err(e) => {
      state.files.discard(&stored).await;
      Err(e.into())
    }
  }
}

// ─── Friends ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendBody {
  pub friend_id: Option<Uuid>,
}

/// `POST /add-friend`
pub async fn add_friend<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  JsonBody(body): JsonBody<FriendBody>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let friend_id = body
    .friend_id
    .ok_or_else(|| Error::missing_fields(vec!["friendId".into()]))?;
  let friends = state.lifecycle.add_friend(&principal, friend_id).await?;
  reply("friend added", json!({ "friends": friends }))
}

/// `GET /friends`
pub async fn friends<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let friends = state.lifecycle.friends(&principal).await?;
  reply("friends", json!({ "friends": friends }))
}
