//! Accounts: the identity, credential and profile record for both account
//! kinds.
//!
//! A single [`Account`] type carries the fields every kind shares
//! (identity, verification state, completion state, timestamps). The
//! kind-specific profile lives in the [`Profile`] enum; per-kind behaviour
//! (completeness checklist, step table) hangs off [`AccountKind`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use uuid::Uuid;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Which collection an account belongs to. Emails are unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
  JobSeeker,
  Company,
}

impl AccountKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::JobSeeker => "jobseeker",
      Self::Company => "company",
    }
  }

  /// Human-readable noun used in error messages.
  pub fn noun(self) -> &'static str {
    match self {
      Self::JobSeeker => "user",
      Self::Company => "company",
    }
  }
}

// ─── Shared state ────────────────────────────────────────────────────────────

/// Progress through the profile wizard. `trust_score` is a cached copy of
/// [`crate::trust::compute`]; readers recompute it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompletion {
  pub step:        u8,
  pub is_complete: bool,
  pub trust_score: u8,
}

impl Default for ProfileCompletion {
  fn default() -> Self { Self { step: 1, is_complete: false, trust_score: 0 } }
}

/// A one-time code waiting to be confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
  pub code:       String,
  pub expires_at: DateTime<Utc>,
}

// ─── Job seeker ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  #[default]
  Male,
  Female,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
  pub name:        String,
  #[serde(default, alias = "proficiency_level")]
  pub proficiency: Option<String>,
  #[serde(default)]
  pub native:      bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
  pub name:     String,
  #[serde(default)]
  pub issuer:   Option<String>,
  #[serde(default)]
  pub date:     Option<String>,
  #[serde(default)]
  pub file_url: Option<String>,
}

/// A scanned national ID card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCard {
  pub file_name:   String,
  pub file_url:    String,
  pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSeekerProfile {
  pub name:                 String,
  pub national_id:          Option<String>,
  pub phone:                Option<String>,
  pub gender:               Gender,
  pub postal_code:          Option<String>,
  pub college:              Option<String>,
  pub high_school:          Option<String>,
  pub governorate:          Option<String>,
  pub residence:            Option<String>,
  pub education_level:      Option<String>,
  pub field_of_study:       Option<String>,
  #[serde(deserialize_with = "lenient_amount")]
  pub desired_salary:       Option<f64>,
  pub work_from:            Option<String>,
  pub work_to:              Option<String>,
  pub work_hours:           Option<f64>,
  pub skills:               Vec<String>,
  pub languages:            Vec<Language>,
  pub certificates:         Vec<Certificate>,
  pub avatar:               Option<String>,
  pub id_card:              Option<IdCard>,
  pub is_profile_completed: bool,
  /// Weak references to other job seekers; targets may no longer exist.
  pub friends:              Vec<Uuid>,
}

impl JobSeekerProfile {
  /// Add a skill unless an equal one is already present.
  pub fn add_skill(&mut self, skill: &str) -> bool {
    let skill = skill.trim();
    if skill.is_empty() || self.skills.iter().any(|s| s == skill) {
      return false;
    }
    self.skills.push(skill.to_owned());
    true
  }

  /// Drop blank and repeated skills, keeping first occurrences in order.
  pub fn dedup_skills(&mut self) {
    let mut seen: Vec<String> = Vec::with_capacity(self.skills.len());
    for skill in self.skills.drain(..) {
      let skill = skill.trim().to_owned();
      if !skill.is_empty() && !seen.contains(&skill) {
        seen.push(skill);
      }
    }
    self.skills = seen;
  }
}

/// Hours between two `HH:MM` clock times on the same day.
pub fn work_hours_between(from: &str, to: &str) -> Option<f64> {
  fn parse(t: &str) -> Option<f64> {
    let (h, m) = t.trim().split_once(':')?;
    let h: f64 = h.parse().ok()?;
    let m: f64 = m.parse().ok()?;
    Some(h + m / 60.0)
  }
  let hours = parse(to)? - parse(from)?;
  (hours > 0.0).then_some(hours)
}

// ─── Company ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLocation {
  pub latitude:  f64,
  pub longitude: f64,
}

/// An uploaded document kept on disk; only the reference is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
  pub filename:    String,
  pub filepath:    String,
  pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Employee {
  pub job_title:     String,
  pub salary:        String,
  pub work_duration: String,
  pub work_hours:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manager {
  pub name:     String,
  pub position: String,
  pub phone:    String,
  pub email:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyProfile {
  pub company_name:            String,
  pub phone:                   Option<String>,
  pub tax_number:              Option<String>,
  pub commercial_register:     Option<String>,
  pub address:                 Option<String>,
  pub governorate:             Option<String>,
  pub industry:                Option<String>,
  pub employees_count:         Option<String>,
  pub logo:                    Option<String>,
  pub website:                 Option<String>,
  #[serde(deserialize_with = "lenient_date")]
  pub start_date:              Option<NaiveDate>,
  pub map_location:            Option<MapLocation>,
  pub business_nature:         Option<String>,
  pub working_hours:           Option<String>,
  pub working_days:            Option<String>,
  pub description:             Option<String>,
  pub additional_social:       Option<String>,
  #[serde(deserialize_with = "one_or_many")]
  pub licenses:                Vec<String>,
  pub commercial_register_pdf: Option<StoredDocument>,
  pub licenses_pdfs:           Vec<StoredDocument>,
  pub employees:               Vec<Employee>,
  pub managers:                Vec<Manager>,
}

/// Accept either a list of strings or a single (possibly empty) string.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum OneOrMany {
    One(String),
    Many(Vec<String>),
    Null(()),
  }

  Ok(match OneOrMany::deserialize(deserializer)? {
    OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
    OneOrMany::One(s) => vec![s.trim().to_owned()],
    OneOrMany::Many(v) => v,
    OneOrMany::Null(()) => Vec::new(),
  })
}

/// Accept a plain `YYYY-MM-DD` date or a full ISO 8601 timestamp, keeping
/// only the calendar date. Blank means unset.
pub(crate) fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
  D: Deserializer<'de>,
{
  let Some(raw) = Option::<String>::deserialize(deserializer)? else {
    return Ok(None);
  };
  let raw = raw.trim();
  if raw.is_empty() {
    return Ok(None);
  }
  raw
    .parse::<NaiveDate>()
    .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|t| t.date_naive()))
    .or_else(|_| raw.parse::<NaiveDateTime>().map(|t| t.date()))
    .map(Some)
    .map_err(|_| de::Error::custom(format!("`{raw}` is not a date")))
}

/// Accept a number or a numeric string. Blank means unset.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Amount {
    Number(f64),
    Text(String),
  }

  match Option::<Amount>::deserialize(deserializer)? {
    None => Ok(None),
    Some(Amount::Number(n)) => Ok(Some(n)),
    Some(Amount::Text(s)) if s.trim().is_empty() => Ok(None),
    Some(Amount::Text(s)) => s
      .trim()
      .parse()
      .map(Some)
      .map_err(|_| de::Error::custom(format!("`{s}` is not a number"))),
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// Kind-specific profile data, tagged with `userType` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "userType", rename_all = "lowercase")]
pub enum Profile {
  JobSeeker(JobSeekerProfile),
  Company(CompanyProfile),
}

// ─── Account ─────────────────────────────────────────────────────────────────

/// A registered job seeker or company.
///
/// Serialises to the public view: the password hash and any pending
/// verification code are never emitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  #[serde(rename = "id")]
  pub account_id:     Uuid,
  pub email:          String,
  #[serde(skip)]
  pub password_hash:  String,
  pub is_verified:    bool,
  #[serde(skip)]
  pub pending_code:   Option<PendingCode>,
  #[serde(rename = "profileCompletion")]
  pub completion:     ProfileCompletion,
  pub created_at:     DateTime<Utc>,
  pub last_login_at:  Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub profile:        Profile,
}

impl Account {
  /// A freshly registered, unverified account at step 1.
  pub fn new(
    email: &str,
    password_hash: String,
    profile: Profile,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      account_id: Uuid::new_v4(),
      email: normalize_email(email),
      password_hash,
      is_verified: false,
      pending_code: None,
      completion: ProfileCompletion::default(),
      created_at: now,
      last_login_at: None,
      profile,
    }
  }

  pub fn kind(&self) -> AccountKind {
    match self.profile {
      Profile::JobSeeker(_) => AccountKind::JobSeeker,
      Profile::Company(_) => AccountKind::Company,
    }
  }

  pub fn display_name(&self) -> &str {
    match &self.profile {
      Profile::JobSeeker(p) => &p.name,
      Profile::Company(p) => &p.company_name,
    }
  }

  pub fn job_seeker(&self) -> Option<&JobSeekerProfile> {
    match &self.profile {
      Profile::JobSeeker(p) => Some(p),
      Profile::Company(_) => None,
    }
  }

  pub fn job_seeker_mut(&mut self) -> Option<&mut JobSeekerProfile> {
    match &mut self.profile {
      Profile::JobSeeker(p) => Some(p),
      Profile::Company(_) => None,
    }
  }

  pub fn company(&self) -> Option<&CompanyProfile> {
    match &self.profile {
      Profile::Company(p) => Some(p),
      Profile::JobSeeker(_) => None,
    }
  }

  pub fn company_mut(&mut self) -> Option<&mut CompanyProfile> {
    match &mut self.profile {
      Profile::Company(p) => Some(p),
      Profile::JobSeeker(_) => None,
    }
  }
}

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn public_view_hides_secrets() {
    let mut account = Account::new(
      "  Ali@X.com ",
      "$argon2id$secret".into(),
      Profile::JobSeeker(JobSeekerProfile { name: "Ali".into(), ..Default::default() }),
      Utc::now(),
    );
    account.pending_code = Some(PendingCode {
      code:       "123456".into(),
      expires_at: Utc::now(),
    });

    let json = serde_json::to_value(&account).unwrap();
    assert_eq!(json["email"], "ali@x.com");
    assert_eq!(json["userType"], "jobseeker");
    assert_eq!(json["profileCompletion"]["step"], 1);
    let text = json.to_string();
    assert!(!text.contains("argon2"));
    assert!(!text.contains("123456"));
  }

  #[test]
  fn skills_are_a_set() {
    let mut p = JobSeekerProfile::default();
    assert!(p.add_skill("rust"));
    assert!(!p.add_skill(" rust "));
    p.skills.extend(["sql".into(), "rust".into(), "".into(), "sql".into()]);
    p.dedup_skills();
    assert_eq!(p.skills, vec!["rust", "sql"]);
  }

  #[test]
  fn licenses_accept_a_single_string() {
    let p: CompanyProfile =
      serde_json::from_value(serde_json::json!({ "licenses": "L-42" })).unwrap();
    assert_eq!(p.licenses, vec!["L-42"]);
    let p: CompanyProfile =
      serde_json::from_value(serde_json::json!({ "licenses": ["a", "b"] })).unwrap();
    assert_eq!(p.licenses.len(), 2);
  }

  #[test]
  fn work_hours_from_clock_times() {
    assert_eq!(work_hours_between("09:00", "17:30"), Some(8.5));
    assert_eq!(work_hours_between("17:00", "09:00"), None);
    assert_eq!(work_hours_between("nine", "17:00"), None);
  }

  #[test]
  fn start_date_accepts_a_timestamp() {
    let p: CompanyProfile =
      serde_json::from_value(serde_json::json!({ "startDate": "2015-03-01T00:00:00.000Z" })).unwrap();
    assert_eq!(p.start_date, NaiveDate::from_ymd_opt(2015, 3, 1));
    let p: CompanyProfile =
      serde_json::from_value(serde_json::json!({ "startDate": "2015-03-01" })).unwrap();
    assert_eq!(p.start_date, NaiveDate::from_ymd_opt(2015, 3, 1));
    let p: CompanyProfile = serde_json::from_value(serde_json::json!({ "startDate": "" })).unwrap();
    assert_eq!(p.start_date, None);
    assert!(
      serde_json::from_value::<CompanyProfile>(serde_json::json!({ "startDate": "soon" })).is_err()
    );
  }

  #[test]
  fn desired_salary_accepts_a_numeric_string() {
    let p: JobSeekerProfile =
      serde_json::from_value(serde_json::json!({ "desiredSalary": "9000" })).unwrap();
    assert_eq!(p.desired_salary, Some(9000.0));
    let p: JobSeekerProfile =
      serde_json::from_value(serde_json::json!({ "desiredSalary": 7500.5 })).unwrap();
    assert_eq!(p.desired_salary, Some(7500.5));
    let p: JobSeekerProfile =
      serde_json::from_value(serde_json::json!({ "desiredSalary": null })).unwrap();
    assert_eq!(p.desired_salary, None);
    assert!(
      serde_json::from_value::<JobSeekerProfile>(serde_json::json!({ "desiredSalary": "lots" }))
        .is_err()
    );
  }
}
