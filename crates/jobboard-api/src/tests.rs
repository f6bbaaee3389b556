use std::sync::Arc;

use axum::{
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use jobboard_core::lifecycle::Lifecycle;
use jobboard_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt as _;

use super::*;
use crate::{mail::LogMailer, session::HmacSessions};

type State = AppState<SqliteStore, LogMailer>;

async fn make_state() -> (State, TempDir) {
  let uploads = tempfile::tempdir().unwrap();
  let config = ServerConfig {
    host:             "127.0.0.1".to_string(),
    port:             5000,
    store_path:       PathBuf::from(":memory:"),
    upload_dir:       uploads.path().to_path_buf(),
    session_secret:   "test-secret".to_string(),
    environment:      Environment::Development,
    code_ttl_minutes: 10,
    mail:             MailConfig::default(),
  };
  let lifecycle = Lifecycle::new(
    Arc::new(SqliteStore::open_in_memory().await.unwrap()),
    Arc::new(LogMailer),
    Arc::new(HmacSessions::new(config.session_secret.clone())),
    config.policy(),
  );
  let state = AppState {
    lifecycle: Arc::new(lifecycle),
    files:     Arc::new(FileStore::new(uploads.path())),
    config:    Arc::new(config),
  };
  (state, uploads)
}

async fn send(state: &State, req: Request<Body>) -> (StatusCode, Value) {
  let resp = router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, json)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
  let mut builder = Request::builder()
    .method(method)
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json");
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
  let mut builder = Request::builder().method(Method::GET).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  builder.body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "jobboard-test-boundary";

/// `(field, Some((file name, content type)), bytes)` per part; `None` makes a
/// text field.
fn multipart(
  uri: &str,
  token: &str,
  parts: &[(&str, Option<(&str, &str)>, &[u8])],
) -> Request<Body> {
  let mut body = Vec::new();
  for (field, file, bytes) in parts {
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match file {
      Some((name, content_type)) => body.extend_from_slice(
        format!(
          "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
           Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
      ),
      None => body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
      ),
    }
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

  Request::builder()
    .method(Method::POST)
    .uri(uri)
    .header(header::AUTHORIZATION, format!("Bearer {token}"))
    .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
    .body(Body::from(body))
    .unwrap()
}

fn ali(email: &str) -> Value {
  json!({ "name": "Ali", "email": email, "phone": "01000000000", "password": "secret1" })
}

fn acme() -> Value {
  json!({
    "companyName": "Acme",
    "email": "hr@acme.com",
    "phone": "0220000000",
    "password": "secret1",
    "governorate": "Cairo",
    "field": "Software",
    "employeesCount": "11-50",
  })
}

/// Register and verify under `prefix`, returning `(token, account id)`.
async fn onboard(state: &State, prefix: &str, registration: Value) -> (String, String) {
  let email = registration["email"].clone();
  let (status, body) =
    send(state, json_request(Method::POST, &format!("{prefix}/register"), None, registration)).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let code = body["verificationCode"].as_str().unwrap().to_owned();

  let (status, body) = send(
    state,
    json_request(
      Method::POST,
      &format!("{prefix}/verify-code"),
      None,
      json!({ "email": email, "code": code }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  (
    body["token"].as_str().unwrap().to_owned(),
    body["account"]["id"].as_str().unwrap().to_owned(),
  )
}

// ── Registration & login ─────────────────────────────────────────────────────

#[tokio::test]
async fn job_seeker_registers_verifies_and_fills_a_step() {
  let (state, _dir) = make_state().await;

  let (status, body) =
    send(&state, json_request(Method::POST, "/api/users/register", None, ali("ali@x.com"))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["success"], true);
  assert_eq!(body["nextStep"], "verify-email");
  assert_eq!(body["userType"], "jobseeker");
  assert_eq!(body["emailSent"], false);
  let code: u32 = body["verificationCode"].as_str().unwrap().parse().unwrap();

  // Codes may be sent as numbers.
  let (status, body) = send(
    &state,
    json_request(
      Method::POST,
      "/api/users/verify-code",
      None,
      json!({ "email": "ali@x.com", "code": code }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let token = body["token"].as_str().unwrap().to_owned();
  assert_eq!(body["account"]["isVerified"], true);
  assert!(body["account"].get("passwordHash").is_none());

  let (status, body) = send(
    &state,
    json_request(
      Method::POST,
      "/api/users/update-profile",
      Some(&token),
      json!({ "step": "1", "data": { "college": "Cairo University", "governorate": "Giza" } }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["profileCompletion"]["step"], 2);
  assert_eq!(body["profileCompletion"]["isProfileCompleted"], false);

  let (status, body) = send(&state, get("/api/users/profile-by-token", Some(&token))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["account"]["college"], "Cairo University");
  assert_eq!(body["account"]["profileCompletion"]["step"], 2);
}

#[tokio::test]
async fn login_asks_for_a_code_and_never_returns_a_token() {
  let (state, _dir) = make_state().await;
  onboard(&state, "/api/users", ali("ali@x.com")).await;

  let (status, body) = send(
    &state,
    json_request(
      Method::POST,
      "/api/users/login",
      None,
      json!({ "email": "ali@x.com", "password": "secret1" }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["requiresVerification"], true);
  assert!(body.get("token").is_none());
  // Even in development the login code only goes out by email.
  assert!(body.get("verificationCode").is_none());

  let (status, _) = send(
    &state,
    json_request(
      Method::POST,
      "/api/users/login",
      None,
      json!({ "email": "ali@x.com", "password": "wrong-password" }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test]
fn unset_environment_means_production() {
  let config: ServerConfig = serde_json::from_value(json!({})).unwrap();
  assert_eq!(config.environment, Environment::Production);
  assert!(!config.policy().expose_codes);

  let config: ServerConfig =
    serde_json::from_value(json!({ "environment": "development" })).unwrap();
  assert!(config.policy().expose_codes);
}

#[tokio::test]
async fn a_taken_national_id_is_a_conflict() {
  let (state, _dir) = make_state().await;
  let mut first = ali("ali@x.com");
  first["nationalId"] = json!("29801011234567");
  first["skills"] = json!(["rust", " rust ", "sql"]);
  let (token, _) = onboard(&state, "/api/users", first).await;

  let (status, body) = send(&state, get("/api/users/profile-by-token", Some(&token))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["account"]["nationalId"], "29801011234567");
  assert_eq!(body["account"]["skills"], json!(["rust", "sql"]));

  let mut second = ali("omar@x.com");
  second["nationalId"] = json!("29801011234567");
  let (status, body) =
    send(&state, json_request(Method::POST, "/api/users/register", None, second)).await;
  assert_eq!(status, StatusCode::CONFLICT, "{body}");
  assert_eq!(body["success"], false);
}

#[tokio::test]
async fn missing_registration_fields_are_listed() {
  let (state, _dir) = make_state().await;
  let (status, body) = send(
    &state,
    json_request(Method::POST, "/api/users/register", None, json!({ "email": "ali@x.com" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
  assert_eq!(body["missingFields"], json!(["name", "phone", "password"]));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
  let (state, _dir) = make_state().await;
  onboard(&state, "/api/users", ali("ali@x.com")).await;
  let (status, _) =
    send(&state, json_request(Method::POST, "/api/users/register", None, ali("ALI@x.com"))).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
  let (state, _dir) = make_state().await;
  let req = Request::builder()
    .method(Method::POST)
    .uri("/api/users/login")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from("{not json"))
    .unwrap();
  let (status, body) = send(&state, req).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);
}

// ── Authorisation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn protected_routes_require_a_token() {
  let (state, _dir) = make_state().await;
  let (status, body) = send(&state, get("/api/users/profile-by-token", None)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["success"], false);

  let (status, _) = send(&state, get("/api/users/profile-by-token", Some("forged.token"))).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn another_accounts_profile_is_forbidden() {
  let (state, _dir) = make_state().await;
  let (token, id) = onboard(&state, "/api/users", ali("ali@x.com")).await;
  let (_, other) = onboard(&state, "/api/users", ali("sara@x.com")).await;

  let (status, _) = send(&state, get(&format!("/api/users/profile/{id}"), Some(&token))).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(&state, get(&format!("/api/users/profile/{other}"), Some(&token))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) =
    send(&state, get(&format!("/api/users/profile-status/{other}"), Some(&token))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = send(&state, get("/api/users/profile/not-a-uuid", Some(&token))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn company_tokens_do_not_open_job_seeker_routes() {
  let (state, _dir) = make_state().await;
  let (token, _) = onboard(&state, "/api/companies", acme()).await;

  let (status, _) = send(&state, get("/api/users/profile-by-token", Some(&token))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send(&state, get("/api/companies/profile-by-token", Some(&token))).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleted_accounts_lose_their_sessions() {
  let (state, _dir) = make_state().await;
  let (token, _) = onboard(&state, "/api/users", ali("ali@x.com")).await;

  let req = Request::builder()
    .method(Method::DELETE)
    .uri("/api/users/me")
    .header(header::AUTHORIZATION, format!("Bearer {token}"))
    .body(Body::empty())
    .unwrap();
  let (status, _) = send(&state, req).await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = send(&state, get("/api/users/profile-by-token", Some(&token))).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Wizard ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_steps_are_rejected() {
  let (state, _dir) = make_state().await;
  let (token, _) = onboard(&state, "/api/users", ali("ali@x.com")).await;

  let (status, _) = send(
    &state,
    json_request(Method::POST, "/api/users/update-profile", Some(&token), json!({ "step": 9, "data": {} })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send(
    &state,
    json_request(
      Method::POST,
      "/api/users/update-profile",
      Some(&token),
      json!({ "step": 1, "data": { "isVerified": true } }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn company_profile_status_lists_missing_fields() {
  let (state, _dir) = make_state().await;
  let (token, id) = onboard(&state, "/api/companies", acme()).await;

  let (status, body) =
    send(&state, get(&format!("/api/companies/profile-status/{id}"), Some(&token))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["isComplete"], false);
  let missing = body["missingFields"].as_array().unwrap();
  assert!(missing.contains(&json!("address")));
  assert!(!missing.contains(&json!("companyName")));

  let (status, body) = send(
    &state,
    json_request(
      Method::POST,
      "/api/companies/update-company-info",
      Some(&token),
      json!({ "taxNumber": "TX-1", "website": "https://acme.example" }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  let (status, body) =
    send(&state, get(&format!("/api/companies/profile-data/{id}"), Some(&token))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["company"]["taxNumber"], "TX-1");
  assert_eq!(body["company"]["industry"], "Software");
}

// ── Skills & friends ─────────────────────────────────────────────────────────

#[tokio::test]
async fn skills_are_a_set_and_certificates_can_be_removed() {
  let (state, _dir) = make_state().await;
  let (token, _) = onboard(&state, "/api/users", ali("ali@x.com")).await;

  for _ in 0..2 {
    let (status, body) = send(
      &state,
      json_request(Method::POST, "/api/users/add-skill", Some(&token), json!({ "skill": "Rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["skills"], json!(["Rust"]));
  }

  let req = multipart(
    "/api/users/upload-certificate",
    &token,
    &[("name", None, b"AWS"), ("issuer", None, b"Amazon")],
  );
  let (status, body) = send(&state, req).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["certificates"][0]["name"], "AWS");
  assert!(body["certificates"][0]["fileUrl"].is_null());

  let req = Request::builder()
    .method(Method::DELETE)
    .uri("/api/users/delete-certificate?name=AWS")
    .header(header::AUTHORIZATION, format!("Bearer {token}"))
    .body(Body::empty())
    .unwrap();
  let (status, body) = send(&state, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["certificates"], json!([]));
}

#[tokio::test]
async fn friends_are_added_and_listed() {
  let (state, _dir) = make_state().await;
  let (token, id) = onboard(&state, "/api/users", ali("ali@x.com")).await;
  let (_, sara) = onboard(&state, "/api/users", ali("sara@x.com")).await;

  let add = |friend: &str| {
    json_request(Method::POST, "/api/users/add-friend", Some(&token), json!({ "friendId": friend }))
  };
  let (status, _) = send(&state, add(&sara)).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = send(&state, add(&sara)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  let (status, _) = send(&state, add(&id)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send(&state, get("/api/users/friends", Some(&token))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["friends"][0]["email"], "sara@x.com");
}

// ── Uploads ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn licenses_are_stored_and_served() {
  let (state, dir) = make_state().await;
  let (token, _) = onboard(&state, "/api/companies", acme()).await;

  let req = multipart(
    "/api/companies/upload-licenses",
    &token,
    &[
      ("files", Some(("one.pdf", "application/pdf")), b"%PDF-one"),
      ("files", Some(("two.pdf", "application/pdf")), b"%PDF-two"),
    ],
  );
  let (status, body) = send(&state, req).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let licenses = body["licensesPdfs"].as_array().unwrap();
  assert_eq!(licenses.len(), 2);
  assert_eq!(licenses[0]["filename"], "one.pdf");

  let url = licenses[1]["filepath"].as_str().unwrap();
  assert!(url.starts_with("/uploads/companies/"));
  assert!(dir.path().join(url.trim_start_matches("/uploads/")).exists());

  let resp = router(state.clone()).oneshot(get(url, None)).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert_eq!(&bytes[..], b"%PDF-two");
}

#[tokio::test]
async fn too_many_licenses_are_rejected() {
  let (state, dir) = make_state().await;
  let (token, _) = onboard(&state, "/api/companies", acme()).await;

  let parts: Vec<(&str, Option<(&str, &str)>, &[u8])> =
    (0..6).map(|_| ("files", Some(("l.pdf", "application/pdf")), &b"%PDF"[..])).collect();
  let (status, _) = send(&state, multipart("/api/companies/upload-licenses", &token, &parts)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(!dir.path().join("companies").exists());
}

#[tokio::test]
async fn avatar_uploads_only_accept_images() {
  let (state, _dir) = make_state().await;
  let (token, _) = onboard(&state, "/api/users", ali("ali@x.com")).await;

  let req = multipart(
    "/api/users/upload-avatar",
    &token,
    &[("avatar", Some(("cv.pdf", "application/pdf")), b"%PDF")],
  );
  let (status, _) = send(&state, req).await;
  assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

  let req = multipart(
    "/api/users/upload-avatar",
    &token,
    &[("avatar", Some(("me.png", "image/png")), b"\x89PNG")],
  );
  let (status, body) = send(&state, req).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let avatar = body["avatar"].as_str().unwrap();
  assert!(avatar.starts_with("/uploads/avatars/") && avatar.ends_with(".png"));
  assert_eq!(body["account"]["avatar"], avatar);
}

#[tokio::test]
async fn id_card_upload_fills_the_national_id() {
  let (state, _dir) = make_state().await;
  let (token, _) = onboard(&state, "/api/users", ali("ali@x.com")).await;

  let req = multipart(
    "/api/users/upload-id-card",
    &token,
    &[
      ("idCard", Some(("card.jpg", "image/jpeg")), b"\xff\xd8\xff"),
      ("nationalId", None, b"29001011234567"),
    ],
  );
  let (status, body) = send(&state, req).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["account"]["nationalId"], "29001011234567");
  assert_eq!(body["account"]["idCard"]["fileName"], "card.jpg");
}
