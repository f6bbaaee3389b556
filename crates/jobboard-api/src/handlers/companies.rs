//! Company routes, mounted at `/api/companies`.
//!
//! Besides the routes in [`super::accounts`]:
//!
//! | Method | Path | Auth | Notes |
//! |--------|------|------|-------|
//! | `POST` | `/register` | – | `201` with the new account id |
//! | `GET`  | `/profile-data/{id}` | ✓ | the fields of the edit form |
//! | `POST` | `/update-company-info` | ✓ | absent fields are kept |
//! | `POST` | `/upload-commercial-register` | ✓ | multipart, one PDF in `file` |
//! | `POST` | `/upload-licenses` | ✓ | multipart, up to five PDFs in `files` |

use axum::{
  Extension, Json, Router,
  extract::{Multipart, State, multipart::MultipartRejection},
  http::StatusCode,
  routing::{get, post},
};
use chrono::Utc;
use jobboard_core::{
  Error,
  account::{AccountKind, StoredDocument},
  lifecycle::{CompanyInfo, CompanyRegistration, MAX_LICENSE_UPLOADS, Registration},
  mail::Mailer,
  store::AccountStore,
};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{accounts, reply};
use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  extract::{JsonBody, PathParam},
  uploads::{Form, StoredFile, UploadKind},
};

pub fn routes<S, M>() -> Router<AppState<S, M>>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  Router::new()
    .route("/register", post(register::<S, M>))
    .route("/profile-data/{id}", get(profile_data::<S, M>))
    .route("/update-company-info", post(update_company_info::<S, M>))
    .route("/upload-commercial-register", post(upload_commercial_register::<S, M>))
    .route("/upload-licenses", post(upload_licenses::<S, M>))
    .merge(accounts::routes::<S, M>())
    .layer(Extension(AccountKind::Company))
}

fn document(file: &StoredFile) -> StoredDocument {
  StoredDocument {
    filename:    file.original_name.clone(),
    filepath:    file.url.clone(),
    uploaded_at: Utc::now(),
  }
}

/// `POST /register`
pub async fn register<S, M>(
  State(state): State<AppState<S, M>>,
  JsonBody(body): JsonBody<CompanyRegistration>,
) -> Result<(StatusCode, Json<Value>), ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let issued = state.lifecycle.register(Registration::Company(body)).await?;
  let mut out = reply("company registered; check your email for the verification code", issued)?;
  out.0["nextStep"] = Value::String("verify-email".into());
  Ok((StatusCode::CREATED, out))
}

/// `GET /profile-data/{id}`
pub async fn profile_data<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let data = state.lifecycle.company_profile_data(&principal, id).await?;
  reply("company profile", json!({ "company": data }))
}

/// `POST /update-company-info`
pub async fn update_company_info<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  JsonBody(body): JsonBody<CompanyInfo>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let account = state.lifecycle.update_company_info(&principal, body).await?;
  reply("company information updated", json!({ "account": account }))
}

/// `POST /upload-commercial-register`
pub async fn upload_commercial_register<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let mut form = Form::read(multipart?).await?;
  let part = form
    .take_file("file")
    .ok_or_else(|| ApiError::BadRequest("no file was uploaded in `file`".into()))?;
  let stored = state.files.save(UploadKind::CommercialRegister, &part).await?;

  match state
    .lifecycle
    .set_commercial_register_pdf(&principal, document(&stored))
    .await
  {
    Ok(account) => {
      let pdf = account.company().and_then(|c| c.commercial_register_pdf.clone());
      reply("commercial register uploaded", json!({ "commercialRegisterPdf": pdf }))
    }
    Err(e) => {
      state.files.discard(&stored).await;
      Err(e.into())
    }
  }
}

/// `POST /upload-licenses`
pub async fn upload_licenses<S, M>(
  State(state): State<AppState<S, M>>,
  Authenticated(principal): Authenticated,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let mut form = Form::read(multipart?).await?;
  let parts = form.take_files("files");
  if parts.is_empty() {
    return Err(ApiError::BadRequest("no files were uploaded in `files`".into()));
  }
  if parts.len() > MAX_LICENSE_UPLOADS {
    return Err(
      Error::validation(format!("at most {MAX_LICENSE_UPLOADS} license files may be uploaded at once"))
        .into(),
    );
  }

  let mut stored = Vec::with_capacity(parts.len());
  for part in &parts {
    match state.files.save(UploadKind::License, part).await {
      Ok(file) => stored.push(file),
      Err(e) => {
        for file in &stored {
          state.files.discard(file).await;
        }
        return Err(e);
      }
    }
  }

  let documents = stored.iter().map(document).collect();
  match state.lifecycle.add_license_pdfs(&principal, documents).await {
    Ok(licenses) => reply("licenses uploaded", json!({ "licensesPdfs": licenses })),
    Err(e) => {
      for file in &stored {
        state.files.discard(file).await;
      }
      Err(e.into())
    }
  }
}
