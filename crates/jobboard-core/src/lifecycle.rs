//! Account lifecycle: registration, verification, login and every
//! owner-scoped mutation of an account.
//!
//! ```text
//! Unregistered ──register──▶ PendingVerification ──verify──▶ Verified
//!                                                               │
//!                          ┌──────────── login (fresh code) ◀───┤
//!                          └──────────── verify ──────────────▶ │
//!                                                               ▼
//!                                        apply_step … ▶ Verified & complete
//! ```
//!
//! Every login issues a new one-time code; a session token is minted only by
//! a successful [`Lifecycle::verify_code`]. All writes go through
//! [`AccountStore::update_account`] so each one is a single atomic
//! read-modify-write.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  account::{
    Account, AccountKind, Certificate, CompanyProfile, Gender, IdCard, JobSeekerProfile, Language,
    MapLocation, Profile, StoredDocument, lenient_amount, lenient_date, normalize_email,
    work_hours_between,
  },
  credentials::{MIN_PASSWORD_LEN, hash_password, verify_password},
  mail::{Mailer, verification_email},
  session::{Principal, SessionIssuer},
  steps::{self, StepOutcome, non_blank},
  store::AccountStore,
  trust, verification,
};

/// Maximum number of license documents accepted in one upload.
pub const MAX_LICENSE_UPLOADS: usize = 5;

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Tunables that differ between deployments.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
  pub code_ttl:     Duration,
  /// Echo issued codes back to the caller. Development only.
  pub expose_codes: bool,
}

impl Default for Policy {
  fn default() -> Self {
    Self {
      code_ttl:     Duration::minutes(verification::DEFAULT_CODE_TTL_MINUTES),
      expose_codes: false,
    }
  }
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Sign-up form for a job seeker. Only the first four fields are required;
/// the rest pre-fill the profile wizard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSeekerRegistration {
  pub name:           Option<String>,
  pub email:          Option<String>,
  pub phone:          Option<String>,
  pub password:       Option<String>,
  pub national_id:    Option<String>,
  pub gender:         Option<Gender>,
  pub postal_code:    Option<String>,
  pub college:        Option<String>,
  pub high_school:    Option<String>,
  pub governorate:    Option<String>,
  #[serde(deserialize_with = "lenient_amount")]
  pub desired_salary: Option<f64>,
  pub work_from:      Option<String>,
  pub work_to:        Option<String>,
  pub skills:         Vec<String>,
  pub languages:      Vec<Language>,
  pub certificates:   Vec<Certificate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyRegistration {
  pub company_name:    Option<String>,
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub password:        Option<String>,
  pub governorate:     Option<String>,
  /// Stored as the company's industry.
  pub field:           Option<String>,
  pub employees_count: Option<String>,
  pub logo:            Option<String>,
}

#[derive(Debug, Clone)]
pub enum Registration {
  JobSeeker(JobSeekerRegistration),
  Company(CompanyRegistration),
}

impl Registration {
  pub fn kind(&self) -> AccountKind {
    match self {
      Self::JobSeeker(_) => AccountKind::JobSeeker,
      Self::Company(_) => AccountKind::Company,
    }
  }
}

/// Name and avatar edits from the job seeker's settings page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfoUpdate {
  pub name:   Option<String>,
  pub avatar: Option<String>,
}

/// The company fields editable after onboarding. Absent fields are left as
/// they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
  pub company_name:        Option<String>,
  pub phone:               Option<String>,
  pub address:             Option<String>,
  pub governorate:         Option<String>,
  pub industry:            Option<String>,
  pub employees_count:     Option<String>,
  pub website:             Option<String>,
  pub description:         Option<String>,
  pub logo:                Option<String>,
  pub tax_number:          Option<String>,
  pub commercial_register: Option<String>,
  pub business_nature:     Option<String>,
  pub working_hours:       Option<String>,
  pub working_days:        Option<String>,
  #[serde(default, deserialize_with = "lenient_date")]
  pub start_date:          Option<chrono::NaiveDate>,
  pub map_location:        Option<MapLocation>,
}

impl CompanyInfo {
  fn of(c: &CompanyProfile) -> Self {
    Self {
      company_name:        Some(c.company_name.clone()),
      phone:               c.phone.clone(),
      address:             c.address.clone(),
      governorate:         c.governorate.clone(),
      industry:            c.industry.clone(),
      employees_count:     c.employees_count.clone(),
      website:             c.website.clone(),
      description:         c.description.clone(),
      logo:                c.logo.clone(),
      tax_number:          c.tax_number.clone(),
      commercial_register: c.commercial_register.clone(),
      business_nature:     c.business_nature.clone(),
      working_hours:       c.working_hours.clone(),
      working_days:        c.working_days.clone(),
      start_date:          c.start_date,
      map_location:        c.map_location.clone(),
    }
  }

  fn apply(self, c: &mut CompanyProfile) -> Result<()> {
    if let Some(name) = self.company_name {
      if name.trim().is_empty() {
        return Err(Error::validation("companyName cannot be empty"));
      }
      c.company_name = name.trim().to_owned();
    }
    keep_or_set(&mut c.phone, self.phone);
    keep_or_set(&mut c.address, self.address);
    keep_or_set(&mut c.governorate, self.governorate);
    keep_or_set(&mut c.industry, self.industry);
    keep_or_set(&mut c.employees_count, self.employees_count);
    keep_or_set(&mut c.website, self.website);
    keep_or_set(&mut c.description, self.description);
    keep_or_set(&mut c.logo, self.logo);
    keep_or_set(&mut c.business_nature, self.business_nature);
    keep_or_set(&mut c.working_hours, self.working_hours);
    keep_or_set(&mut c.working_days, self.working_days);
    keep_or_set(&mut c.start_date, self.start_date);
    keep_or_set(&mut c.map_location, self.map_location);
    if self.tax_number.is_some() {
      c.tax_number = non_blank(self.tax_number);
    }
    if self.commercial_register.is_some() {
      c.commercial_register = non_blank(self.commercial_register);
    }
    Ok(())
  }
}

fn keep_or_set<T>(slot: &mut Option<T>, value: Option<T>) {
  if value.is_some() {
    *slot = value;
  }
}

// ─── Responses ───────────────────────────────────────────────────────────────

/// Result of a registration, a login or a resend: a code is on its way.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeIssued {
  pub account_id:        Uuid,
  pub email:             String,
  pub user_type:         AccountKind,
  pub email_sent:        bool,
  /// Present only when the policy exposes codes.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub verification_code: Option<String>,
}

/// A verified account and its fresh session token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub token:   String,
  pub account: Account,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
  #[serde(flatten)]
  pub outcome:        StepOutcome,
  pub missing_fields: Vec<&'static str>,
}

/// Company fields for the edit form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfileData {
  pub id:    Uuid,
  pub email: String,
  #[serde(flatten)]
  pub info:  CompanyInfo,
}

/// A resolved friend reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
  pub id:     Uuid,
  pub name:   String,
  pub email:  String,
  pub avatar: Option<String>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct Lifecycle<S, M> {
  store:    Arc<S>,
  mailer:   Arc<M>,
  sessions: Arc<dyn SessionIssuer>,
  policy:   Policy,
}

impl<S, M> Lifecycle<S, M>
where
  S: AccountStore,
  M: Mailer,
{
  pub fn new(
    store: Arc<S>,
    mailer: Arc<M>,
    sessions: Arc<dyn SessionIssuer>,
    policy: Policy,
  ) -> Self {
    Self { store, mailer, sessions, policy }
  }

  pub fn policy(&self) -> &Policy { &self.policy }

  pub fn store(&self) -> &S { &self.store }

  // ── Registration & verification ───────────────────────────────────────────

  /// Create an unverified account and send it a verification code.
  pub async fn register(&self, registration: Registration) -> Result<CodeIssued> {
    let kind = registration.kind();
    let (email, password, profile) = match registration {
      Registration::JobSeeker(r) => {
        let [name, email, phone, password] = require([
          ("name", r.name),
          ("email", r.email),
          ("phone", r.phone),
          ("password", r.password),
        ])?;
        let work_from = non_blank(r.work_from);
        let work_to = non_blank(r.work_to);
        let work_hours = match (&work_from, &work_to) {
          (Some(from), Some(to)) => work_hours_between(from, to),
          _ => None,
        };
        let mut profile = JobSeekerProfile {
          name,
          phone: Some(phone),
          national_id: non_blank(r.national_id),
          gender: r.gender.unwrap_or_default(),
          postal_code: non_blank(r.postal_code),
          college: non_blank(r.college),
          high_school: non_blank(r.high_school),
          governorate: non_blank(r.governorate),
          desired_salary: r.desired_salary,
          work_hours,
          work_from,
          work_to,
          skills: r.skills,
          languages: r.languages,
          certificates: r.certificates,
          ..Default::default()
        };
        profile.dedup_skills();
        (email, password, Profile::JobSeeker(profile))
      }
      Registration::Company(r) => {
        let [company_name, email, phone, password, governorate, field, employees_count] =
          require([
            ("companyName", r.company_name),
            ("email", r.email),
            ("phone", r.phone),
            ("password", r.password),
            ("governorate", r.governorate),
            ("field", r.field),
            ("employeesCount", r.employees_count),
          ])?;
        let profile = CompanyProfile {
          company_name,
          phone: Some(phone),
          governorate: Some(governorate),
          industry: Some(field),
          employees_count: Some(employees_count),
          logo: non_blank(r.logo),
          ..Default::default()
        };
        (email, password, Profile::Company(profile))
      }
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
      return Err(Error::validation(format!(
        "password must be at least {MIN_PASSWORD_LEN} characters"
      )));
    }
    let email = normalize_email(&email);
    if !email.contains('@') {
      return Err(Error::validation("email address is not valid"));
    }
    if self.store.find_by_email(kind, &email).await.map_err(store_error)?.is_some() {
      return Err(Error::Conflict(format!("{} already exists", kind.noun())));
    }

    let now = Utc::now();
    let mut account = Account::new(&email, hash_password(&password)?, profile, now);
    steps::refresh(&mut account);
    let code = verification::issue(&mut account, now, self.policy.code_ttl);
    let account = self.store.create_account(account).await.map_err(store_error)?;
    info!(id = %account.account_id, kind = kind.as_str(), "account registered");

    let email_sent = self.send_code(&account, &code).await;
    Ok(self.code_issued(&account, code, email_sent))
  }

  /// Confirm a code and mint a session token.
  pub async fn verify_code(&self, kind: AccountKind, email: &str, code: &str) -> Result<Session> {
    let account = self.by_email(kind, email).await?;
    let submitted = code.to_owned();
    let now = Utc::now();

    let account = self
      .store
      .update_account(kind, account.account_id, move |a| {
        if !verification::verify(a, &submitted, now) {
          return Err(Error::Unauthorized("invalid or expired verification code".into()));
        }
        steps::refresh(a);
        Ok(())
      })
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(kind.noun().into()))?;

    let token = self.sessions.issue(account.account_id)?;
    info!(id = %account.account_id, kind = kind.as_str(), "account verified");
    Ok(Session { token, account })
  }

  /// Check the password and send a fresh login code. Never mints a token.
  pub async fn login(&self, kind: AccountKind, email: &str, password: &str) -> Result<CodeIssued> {
    let account = self.by_email(kind, email).await?;
    if !verify_password(password, &account.password_hash) {
      return Err(Error::Unauthorized("invalid email or password".into()));
    }
    let ttl = self.policy.code_ttl;
    let account = self
      .store
      .update_account(kind, account.account_id, move |a| {
        verification::issue(a, Utc::now(), ttl);
        Ok(())
      })
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(kind.noun().into()))?;
    debug!(id = %account.account_id, "login code issued");
    // Login codes only ever travel by email.
    let mut issued = self.deliver(account).await?;
    issued.verification_code = None;
    Ok(issued)
  }

  /// Re-send a registration code to an account that is still unverified.
  pub async fn resend_code(&self, kind: AccountKind, email: &str) -> Result<CodeIssued> {
    let account = self.by_email(kind, email).await?;
    let ttl = self.policy.code_ttl;
    let account = self
      .store
      .update_account(kind, account.account_id, move |a| {
        verification::resend(a, Utc::now(), ttl).map(drop)
      })
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(kind.noun().into()))?;
    self.deliver(account).await
  }

  /// Resolve a bearer token to a verified principal.
  pub async fn authenticate(&self, token: &str) -> Result<Principal> {
    let id = self.sessions.verify(token)?;
    let account = self
      .store
      .find_account(id)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::Unauthorized("account no longer exists".into()))?;
    if !account.is_verified {
      return Err(Error::Unauthorized("account is not verified".into()));
    }
    Ok(Principal::of(&account))
  }

  // ── Profile wizard ────────────────────────────────────────────────────────

  /// Apply one wizard step to the principal's own account.
  pub async fn apply_step(
    &self,
    principal: &Principal,
    kind: AccountKind,
    id: Uuid,
    step: Option<i64>,
    data: Option<Map<String, Value>>,
  ) -> Result<StepOutcome> {
    let step = steps::validate_request(kind, step, data.as_ref())?;
    owned(principal, kind, id)?;
    let data = data.unwrap_or_default();

    let account = self
      .store
      .update_account(kind, id, move |a| steps::apply_step(a, step, &data).map(drop))
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(kind.noun().into()))?;

    let outcome = StepOutcome::of(&account);
    info!(
      id = %id,
      step = outcome.step,
      trust_score = outcome.trust_score,
      complete = outcome.is_complete,
      "profile step applied"
    );
    Ok(outcome)
  }

  /// Recompute and report completion, with the fields still missing.
  pub async fn profile_status(
    &self,
    principal: &Principal,
    kind: AccountKind,
    id: Uuid,
  ) -> Result<ProfileStatus> {
    owned(principal, kind, id)?;
    let account = self
      .store
      .update_account(kind, id, |a| {
        steps::refresh(a);
        Ok(())
      })
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(kind.noun().into()))?;

    Ok(ProfileStatus {
      outcome:        StepOutcome::of(&account),
      missing_fields: trust::missing_fields(&account),
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// The public view of the principal's own account.
  pub async fn profile(&self, principal: &Principal, kind: AccountKind, id: Uuid) -> Result<Account> {
    owned(principal, kind, id)?;
    self.load(kind, id).await
  }

  /// The public view of whoever holds the token.
  pub async fn me(&self, principal: &Principal) -> Result<Account> {
    self.load(principal.kind, principal.account_id).await
  }

  pub async fn company_profile_data(
    &self,
    principal: &Principal,
    id: Uuid,
  ) -> Result<CompanyProfileData> {
    owned(principal, AccountKind::Company, id)?;
    let account = self.load(AccountKind::Company, id).await?;
    let company = account.company().ok_or_else(|| Error::NotFound("company".into()))?;
    Ok(CompanyProfileData {
      id:    account.account_id,
      email: account.email.clone(),
      info:  CompanyInfo::of(company),
    })
  }

  // ── Job seeker edits ──────────────────────────────────────────────────────

  pub async fn update_profile_info(
    &self,
    principal: &Principal,
    id: Uuid,
    update: ProfileInfoUpdate,
  ) -> Result<Account> {
    self
      .edit_job_seeker(principal, id, move |p| {
        if let Some(name) = update.name {
          if name.trim().is_empty() {
            return Err(Error::validation("name cannot be empty"));
          }
          p.name = name.trim().to_owned();
        }
        if let Some(avatar) = update.avatar {
          p.avatar = non_blank(Some(avatar));
        }
        Ok(())
      })
      .await
  }

  /// Add a skill; adding one that is already present is a no-op.
  pub async fn add_skill(&self, principal: &Principal, id: Uuid, skill: String) -> Result<Vec<String>> {
    if skill.trim().is_empty() {
      return Err(Error::missing_fields(vec!["skill".into()]));
    }
    let account = self
      .edit_job_seeker(principal, id, move |p| {
        p.add_skill(&skill);
        Ok(())
      })
      .await?;
    Ok(account.job_seeker().map(|p| p.skills.clone()).unwrap_or_default())
  }

  pub async fn add_language(
    &self,
    principal: &Principal,
    id: Uuid,
    language: Language,
  ) -> Result<Vec<Language>> {
    if language.name.trim().is_empty() {
      return Err(Error::missing_fields(vec!["name".into()]));
    }
    let account = self
      .edit_job_seeker(principal, id, move |p| {
        p.languages.push(Language { name: language.name.trim().to_owned(), ..language });
        Ok(())
      })
      .await?;
    Ok(account.job_seeker().map(|p| p.languages.clone()).unwrap_or_default())
  }

  pub async fn add_certificate(
    &self,
    principal: &Principal,
    id: Uuid,
    certificate: Certificate,
  ) -> Result<Vec<Certificate>> {
    if certificate.name.trim().is_empty() {
      return Err(Error::missing_fields(vec!["name".into()]));
    }
    let account = self
      .edit_job_seeker(principal, id, move |p| {
        p.certificates.push(certificate);
        Ok(())
      })
      .await?;
    Ok(account.job_seeker().map(|p| p.certificates.clone()).unwrap_or_default())
  }

  /// Remove every certificate called `name`.
  pub async fn remove_certificate(
    &self,
    principal: &Principal,
    id: Uuid,
    name: String,
  ) -> Result<Vec<Certificate>> {
    let account = self
      .edit_job_seeker(principal, id, move |p| {
        let before = p.certificates.len();
        p.certificates.retain(|c| c.name != name);
        if p.certificates.len() == before {
          return Err(Error::NotFound("certificate".into()));
        }
        Ok(())
      })
      .await?;
    Ok(account.job_seeker().map(|p| p.certificates.clone()).unwrap_or_default())
  }

  pub async fn set_avatar(&self, principal: &Principal, id: Uuid, url: String) -> Result<Account> {
    self
      .edit_job_seeker(principal, id, move |p| {
        p.avatar = Some(url);
        Ok(())
      })
      .await
  }

  /// Attach a scanned ID card, optionally filling in the national ID and
  /// governorate read from it.
  pub async fn set_id_card(
    &self,
    principal: &Principal,
    id: Uuid,
    card: IdCard,
    national_id: Option<String>,
    governorate: Option<String>,
  ) -> Result<Account> {
    self
      .edit_job_seeker(principal, id, move |p| {
        p.id_card = Some(card);
        if let Some(national_id) = non_blank(national_id) {
          p.national_id = Some(national_id);
        }
        if let Some(governorate) = non_blank(governorate) {
          p.governorate = Some(governorate);
        }
        Ok(())
      })
      .await
  }

  // ── Company edits ─────────────────────────────────────────────────────────

  /// Merge the present fields of `info` into the principal's company.
  pub async fn update_company_info(&self, principal: &Principal, info: CompanyInfo) -> Result<Account> {
    let account = self
      .edit_company(principal, move |c| info.apply(c))
      .await?;
    debug!(id = %account.account_id, "company info updated");
    Ok(account)
  }

  /// Replace the commercial register document.
  pub async fn set_commercial_register_pdf(
    &self,
    principal: &Principal,
    document: StoredDocument,
  ) -> Result<Account> {
    self
      .edit_company(principal, move |c| {
        c.commercial_register_pdf = Some(document);
        Ok(())
      })
      .await
  }

  /// Append license documents.
  pub async fn add_license_pdfs(
    &self,
    principal: &Principal,
    documents: Vec<StoredDocument>,
  ) -> Result<Vec<StoredDocument>> {
    if documents.is_empty() {
      return Err(Error::validation("no license files were uploaded"));
    }
    if documents.len() > MAX_LICENSE_UPLOADS {
      return Err(Error::validation(format!(
        "at most {MAX_LICENSE_UPLOADS} license files may be uploaded at once"
      )));
    }
    let account = self
      .edit_company(principal, move |c| {
        c.licenses_pdfs.extend(documents);
        Ok(())
      })
      .await?;
    Ok(account.company().map(|c| c.licenses_pdfs.clone()).unwrap_or_default())
  }

  // ── Friends ───────────────────────────────────────────────────────────────

  /// Link another job seeker as a friend. The link is one-directional.
  pub async fn add_friend(&self, principal: &Principal, friend_id: Uuid) -> Result<Vec<Uuid>> {
    if principal.kind != AccountKind::JobSeeker {
      return Err(Error::Forbidden);
    }
    if friend_id == principal.account_id {
      return Err(Error::validation("you cannot add yourself as a friend"));
    }
    if self
      .store
      .get_account(AccountKind::JobSeeker, friend_id)
      .await
      .map_err(store_error)?
      .is_none()
    {
      return Err(Error::NotFound("user".into()));
    }

    let account = self
      .edit_job_seeker(principal, principal.account_id, move |p| {
        if p.friends.contains(&friend_id) {
          return Err(Error::Conflict("already friends".into()));
        }
        p.friends.push(friend_id);
        Ok(())
      })
      .await?;
    Ok(account.job_seeker().map(|p| p.friends.clone()).unwrap_or_default())
  }

  /// Resolve the principal's friends, skipping accounts that no longer exist.
  pub async fn friends(&self, principal: &Principal) -> Result<Vec<Friend>> {
    let account = self.me(principal).await?;
    let ids = account.job_seeker().map(|p| p.friends.clone()).unwrap_or_default();

    let mut friends = Vec::with_capacity(ids.len());
    for id in ids {
      let Some(friend) = self
        .store
        .get_account(AccountKind::JobSeeker, id)
        .await
        .map_err(store_error)?
      else {
        debug!(%id, "skipping dangling friend reference");
        continue;
      };
      let avatar = friend.job_seeker().and_then(|p| p.avatar.clone());
      friends.push(Friend {
        id: friend.account_id,
        name: friend.display_name().to_owned(),
        email: friend.email,
        avatar,
      });
    }
    Ok(friends)
  }

  // ── Deletion ──────────────────────────────────────────────────────────────

  /// Delete the principal's account. References to it elsewhere are left
  /// in place.
  pub async fn delete_account(&self, principal: &Principal) -> Result<()> {
    let deleted = self
      .store
      .delete_account(principal.kind, principal.account_id)
      .await
      .map_err(store_error)?;
    if !deleted {
      return Err(Error::NotFound(principal.kind.noun().into()));
    }
    info!(id = %principal.account_id, kind = principal.kind.as_str(), "account deleted");
    Ok(())
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn by_email(&self, kind: AccountKind, email: &str) -> Result<Account> {
    let email = normalize_email(email);
    if email.is_empty() {
      return Err(Error::missing_fields(vec!["email".into()]));
    }
    self
      .store
      .find_by_email(kind, &email)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(kind.noun().into()))
  }

  async fn load(&self, kind: AccountKind, id: Uuid) -> Result<Account> {
    self
      .store
      .get_account(kind, id)
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound(kind.noun().into()))
  }

  async fn edit_job_seeker<F>(&self, principal: &Principal, id: Uuid, edit: F) -> Result<Account>
  where
    F: FnOnce(&mut JobSeekerProfile) -> Result<()> + Send + 'static,
  {
    owned(principal, AccountKind::JobSeeker, id)?;
    self
      .store
      .update_account(AccountKind::JobSeeker, id, move |a| {
        let profile = a.job_seeker_mut().ok_or_else(|| Error::NotFound("user".into()))?;
        edit(profile)?;
        steps::refresh(a);
        Ok(())
      })
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound("user".into()))
  }

  async fn edit_company<F>(&self, principal: &Principal, edit: F) -> Result<Account>
  where
    F: FnOnce(&mut CompanyProfile) -> Result<()> + Send + 'static,
  {
    owned(principal, AccountKind::Company, principal.account_id)?;
    self
      .store
      .update_account(AccountKind::Company, principal.account_id, move |a| {
        let profile = a.company_mut().ok_or_else(|| Error::NotFound("company".into()))?;
        edit(profile)?;
        steps::refresh(a);
        Ok(())
      })
      .await
      .map_err(store_error)?
      .ok_or_else(|| Error::NotFound("company".into()))
  }

  /// Email the pending code on `account` and describe what was sent.
  async fn deliver(&self, account: Account) -> Result<CodeIssued> {
    let code = account
      .pending_code
      .as_ref()
      .map(|p| p.code.clone())
      .ok_or_else(|| Error::Internal("no verification code was issued".into()))?;
    let email_sent = self.send_code(&account, &code).await;
    Ok(self.code_issued(&account, code, email_sent))
  }

  async fn send_code(&self, account: &Account, code: &str) -> bool {
    let email = verification_email(
      &account.email,
      account.display_name(),
      code,
      account.kind(),
      self.policy.code_ttl.num_minutes(),
    );
    let sent = self.mailer.send(email).await;
    if !sent {
      warn!(id = %account.account_id, "verification email was not delivered");
    }
    sent
  }

  fn code_issued(&self, account: &Account, code: String, email_sent: bool) -> CodeIssued {
    CodeIssued {
      account_id: account.account_id,
      email: account.email.clone(),
      user_type: account.kind(),
      email_sent,
      verification_code: self.policy.expose_codes.then_some(code),
    }
  }
}

/// The principal may only touch its own account, and only through the
/// routes for its own kind.
fn owned(principal: &Principal, kind: AccountKind, id: Uuid) -> Result<()> {
  principal.ensure_owner(id)?;
  if principal.kind != kind {
    return Err(Error::NotFound(kind.noun().into()));
  }
  Ok(())
}

fn store_error<E: Into<Error>>(e: E) -> Error { e.into() }

/// Unwrap required fields, collecting every blank or absent one.
fn require<const N: usize>(fields: [(&str, Option<String>); N]) -> Result<[String; N]> {
  let mut missing = Vec::new();
  let values = fields.map(|(name, value)| match value.map(|v| v.trim().to_owned()) {
    Some(v) if !v.is_empty() => v,
    _ => {
      missing.push(name.to_owned());
      String::new()
    }
  });
  if missing.is_empty() {
    Ok(values)
  } else {
    Err(Error::missing_fields(missing))
  }
}
