//! Uploaded files: multipart parsing and on-disk storage.
//!
//! Files are written under the configured upload directory, one
//! subdirectory per category, with a generated name. Only the public URL
//! (`/uploads/<category>/<name>`) is recorded on the account.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use axum::extract::Multipart;
use bytes::Bytes;
use chrono::Utc;
use rand::Rng as _;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Per-file ceiling.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const IMAGES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];
const IMAGES_AND_PDF: &[&str] =
  &["image/jpeg", "image/png", "image/webp", "image/gif", "application/pdf"];
const PDF: &[&str] = &["application/pdf"];

/// What is being uploaded; decides the directory and accepted types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
  Avatar,
  IdCard,
  Certificate,
  CommercialRegister,
  License,
}

impl UploadKind {
  fn category(self) -> &'static str {
    match self {
      Self::Avatar => "avatars",
      Self::IdCard => "id-cards",
      Self::Certificate => "certificates",
      Self::CommercialRegister | Self::License => "companies",
    }
  }

  fn accepts(self) -> &'static [&'static str] {
    match self {
      Self::Avatar => IMAGES,
      Self::IdCard | Self::Certificate => IMAGES_AND_PDF,
      Self::CommercialRegister | Self::License => PDF,
    }
  }
}

// ─── Multipart ───────────────────────────────────────────────────────────────

/// One file part of a multipart form.
#[derive(Debug, Clone)]
pub struct FilePart {
  pub field:        String,
  pub file_name:    String,
  pub content_type: String,
  pub bytes:        Bytes,
}

/// A multipart form read fully into memory.
#[derive(Debug, Default)]
pub struct Form {
  pub fields: HashMap<String, String>,
  pub files:  Vec<FilePart>,
}

impl Form {
  pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
    let mut form = Form::default();
    while let Some(field) = multipart.next_field().await? {
      let name = field.name().unwrap_or_default().to_owned();
      match field.file_name().map(str::to_owned) {
        Some(file_name) => {
          let content_type = field.content_type().unwrap_or("application/octet-stream").to_owned();
          let bytes = field.bytes().await?;
          form.files.push(FilePart { field: name, file_name, content_type, bytes });
        }
        None => {
          let value = field.text().await?;
          form.fields.insert(name, value);
        }
      }
    }
    Ok(form)
  }

  /// A text field, trimmed; blank counts as absent.
  pub fn text(&self, name: &str) -> Option<String> {
    self
      .fields
      .get(name)
      .map(|v| v.trim().to_owned())
      .filter(|v| !v.is_empty())
  }

  /// Take the single file sent as `field`.
  pub fn take_file(&mut self, field: &str) -> Option<FilePart> {
    let index = self.files.iter().position(|f| f.field == field)?;
    Some(self.files.remove(index))
  }

  /// Take every file sent as `field`.
  pub fn take_files(&mut self, field: &str) -> Vec<FilePart> {
    let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
      .into_iter()
      .partition(|f| f.field == field);
    self.files = rest;
    taken
  }
}

// ─── Storage ─────────────────────────────────────────────────────────────────

/// A file written to disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
  /// The name the client sent.
  pub original_name: String,
  /// Public URL, relative to the server root.
  pub url:           String,
  pub path:          PathBuf,
}

pub struct FileStore {
  root: PathBuf,
}

impl FileStore {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Validate and persist one uploaded file.
  pub async fn save(&self, kind: UploadKind, part: &FilePart) -> Result<StoredFile, ApiError> {
    if !kind.accepts().contains(&part.content_type.as_str()) {
      return Err(ApiError::UnsupportedMediaType(format!(
        "{} is not an accepted file type here (accepted: {})",
        part.content_type,
        kind.accepts().join(", ")
      )));
    }
    if part.bytes.is_empty() {
      return Err(ApiError::BadRequest("uploaded file is empty".into()));
    }
    if part.bytes.len() > MAX_UPLOAD_BYTES {
      return Err(ApiError::PayloadTooLarge(format!(
        "files may be at most {} MB",
        MAX_UPLOAD_BYTES / (1024 * 1024)
      )));
    }

    let dir = self.root.join(kind.category());
    tokio::fs::create_dir_all(&dir).await?;

    let name = format!(
      "{}-{}{}",
      Utc::now().timestamp_millis(),
      rand::thread_rng().gen_range(0..1_000_000_000u32),
      extension(&part.file_name)
    );
    let path = dir.join(&name);
    tokio::fs::write(&path, &part.bytes).await?;
    debug!(path = %path.display(), bytes = part.bytes.len(), "upload stored");

    Ok(StoredFile {
      original_name: part.file_name.clone(),
      url: format!("/uploads/{}/{name}", kind.category()),
      path,
    })
  }

  /// Delete a stored file whose record could not be saved.
  pub async fn discard(&self, file: &StoredFile) {
    if let Err(e) = tokio::fs::remove_file(&file.path).await {
      warn!(path = %file.path.display(), error = %e, "could not remove orphaned upload");
    }
  }
}

/// `.ext` of `file_name`, lower-cased, if it is short and alphanumeric.
fn extension(file_name: &str) -> String {
  Path::new(file_name)
    .extension()
    .and_then(|e| e.to_str())
    .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
    .map(|e| format!(".{}", e.to_ascii_lowercase()))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn part(content_type: &str, bytes: &'static [u8]) -> FilePart {
    FilePart {
      field:        "file".into(),
      file_name:    "scan.PDF".into(),
      content_type: content_type.into(),
      bytes:        Bytes::from_static(bytes),
    }
  }

  #[test]
  fn extensions_are_sanitised() {
    assert_eq!(extension("cv.PDF"), ".pdf");
    assert_eq!(extension("photo.tar.gz"), ".gz");
    assert_eq!(extension("noext"), "");
    assert_eq!(extension("bad.p/df"), "");
    assert_eq!(extension("evil.ph p"), "");
  }

  #[tokio::test]
  async fn saves_under_the_category_directory() {
    let dir = tempfile::tempdir().unwrap();
    let files = FileStore::new(dir.path());
    let stored = files
      .save(UploadKind::CommercialRegister, &part("application/pdf", b"%PDF-1.4"))
      .await
      .unwrap();
    assert!(stored.url.starts_with("/uploads/companies/"));
    assert!(stored.url.ends_with(".pdf"));
    assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"%PDF-1.4");

    files.discard(&stored).await;
    assert!(!stored.path.exists());
  }

  #[tokio::test]
  async fn rejects_disallowed_types() {
    let dir = tempfile::tempdir().unwrap();
    let files = FileStore::new(dir.path());
    let err = files.save(UploadKind::License, &part("image/png", b"png")).await.unwrap_err();
    assert!(matches!(err, ApiError::UnsupportedMediaType(_)));
    let err = files.save(UploadKind::Avatar, &part("application/pdf", b"pdf")).await.unwrap_err();
    assert!(matches!(err, ApiError::UnsupportedMediaType(_)));
  }

  #[tokio::test]
  async fn rejects_oversized_files() {
    let dir = tempfile::tempdir().unwrap();
    let files = FileStore::new(dir.path());
    let big = FilePart {
      bytes: Bytes::from(vec![0u8; MAX_UPLOAD_BYTES + 1]),
      ..part("application/pdf", b"")
    };
    let err = files.save(UploadKind::License, &big).await.unwrap_err();
    assert!(matches!(err, ApiError::PayloadTooLarge(_)));
  }
}
