//! Profile wizard: per-kind step tables and the step state machine.
//!
//! Each step of the wizard has an explicit allowlist of the wire fields it
//! may write. Keys outside the allowlist are rejected rather than copied onto
//! the account. After the payload is applied the step counter advances, the
//! trust score is recomputed and completeness is derived from it.
//!
//! States are `step ∈ 1..=max_step` × `is_complete`. The counter never moves
//! backwards; once complete it is pinned to `max_step`.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  account::{Account, AccountKind, Profile, work_hours_between},
  trust,
};

// ─── Step tables ─────────────────────────────────────────────────────────────

/// What a single wizard step may write.
#[derive(Debug)]
pub struct StepSchema {
  /// Assigned wholesale: a field missing from the payload is cleared.
  pub assign: &'static [&'static str],
  /// Copied only when present in the payload.
  pub merge:  &'static [&'static str],
}

impl StepSchema {
  pub fn allows(&self, field: &str) -> bool {
    self.assign.contains(&field) || self.merge.contains(&field)
  }
}

/// Per-kind parameters of the wizard.
#[derive(Debug)]
pub struct KindDescriptor {
  pub kind:     AccountKind,
  pub max_step: u8,
  /// Indexed by `step - 1`.
  pub steps:    &'static [StepSchema],
}

impl KindDescriptor {
  pub fn schema(&self, step: u8) -> Option<&'static StepSchema> {
    let index = usize::from(step).checked_sub(1)?;
    self.steps.get(index)
  }
}

const JOB_SEEKER_FIELDS: &[&str] = &[
  "name",
  "nationalId",
  "phone",
  "gender",
  "postalCode",
  "college",
  "highSchool",
  "governorate",
  "residence",
  "educationLevel",
  "fieldOfStudy",
  "desiredSalary",
  "workFrom",
  "workTo",
  "workHours",
  "skills",
  "languages",
  "certificates",
];

const COMPANY_BASICS: &[&str] = &[
  "logo",
  "startDate",
  "businessNature",
  "website",
  "phone",
  "address",
  "workingHours",
  "workingDays",
  "description",
];

const COMPANY_BASICS_EXTRA: &[&str] = &["commercialRegister", "licenses", "additionalSocial"];

const COMPANY_FIELDS: &[&str] = &[
  "companyName",
  "phone",
  "taxNumber",
  "commercialRegister",
  "address",
  "governorate",
  "industry",
  "employeesCount",
  "logo",
  "website",
  "startDate",
  "mapLocation",
  "businessNature",
  "workingHours",
  "workingDays",
  "description",
  "additionalSocial",
  "licenses",
  "employees",
  "managers",
];

const JOB_SEEKER_STEP: StepSchema = StepSchema { assign: &[], merge: JOB_SEEKER_FIELDS };

static JOB_SEEKER: KindDescriptor = KindDescriptor {
  kind:     AccountKind::JobSeeker,
  max_step: 5,
  steps:    &[JOB_SEEKER_STEP, JOB_SEEKER_STEP, JOB_SEEKER_STEP, JOB_SEEKER_STEP, JOB_SEEKER_STEP],
};

static COMPANY: KindDescriptor = KindDescriptor {
  kind:     AccountKind::Company,
  max_step: 5,
  steps:    &[
    StepSchema { assign: COMPANY_BASICS, merge: COMPANY_BASICS_EXTRA },
    StepSchema { assign: &["employees"], merge: &[] },
    StepSchema { assign: &["managers"], merge: &[] },
    StepSchema { assign: &[], merge: COMPANY_FIELDS },
    StepSchema { assign: &[], merge: COMPANY_FIELDS },
  ],
};

impl AccountKind {
  pub fn descriptor(self) -> &'static KindDescriptor {
    match self {
      Self::JobSeeker => &JOB_SEEKER,
      Self::Company => &COMPANY,
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Completion state after a step has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
  pub step:                 u8,
  pub trust_score:          u8,
  pub is_complete:          bool,
  /// Job seekers only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_profile_completed: Option<bool>,
}

impl StepOutcome {
  /// Read the cached completion state off `account`.
  pub fn of(account: &Account) -> Self {
    Self {
      step:                 account.completion.step,
      trust_score:          account.completion.trust_score,
      is_complete:          account.completion.is_complete,
      is_profile_completed: account.job_seeker().map(|p| p.is_profile_completed),
    }
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Check the request envelope and resolve the step number.
pub fn validate_request(
  kind: AccountKind,
  step: Option<i64>,
  data: Option<&Map<String, Value>>,
) -> Result<u8> {
  let mut missing = Vec::new();
  if step.is_none() {
    missing.push("step".to_owned());
  }
  if data.is_none_or(Map::is_empty) {
    missing.push("data".to_owned());
  }
  if !missing.is_empty() {
    return Err(Error::missing_fields(missing));
  }

  let step = step.unwrap_or_default();
  let max = i64::from(kind.descriptor().max_step);
  if !(1..=max).contains(&step) {
    return Err(Error::InvalidStep(step));
  }
  Ok(step as u8)
}

// ─── Application ─────────────────────────────────────────────────────────────

/// Apply one step's payload to `account` and advance the wizard.
pub fn apply_step(
  account: &mut Account,
  step: u8,
  data: &Map<String, Value>,
) -> Result<StepOutcome> {
  let descriptor = account.kind().descriptor();
  let schema = descriptor.schema(step).ok_or(Error::InvalidStep(i64::from(step)))?;

  let unknown: Vec<&str> = data
    .keys()
    .map(String::as_str)
    .filter(|k| !schema.allows(k))
    .collect();
  if !unknown.is_empty() {
    return Err(Error::validation(format!(
      "step {step} does not accept field(s): {}",
      unknown.join(", ")
    )));
  }

  let mut patch = Map::new();
  for &field in schema.assign {
    patch.insert(field.to_owned(), data.get(field).cloned().unwrap_or(Value::Null));
  }
  for &field in schema.merge {
    if let Some(value) = data.get(field) {
      patch.insert(field.to_owned(), value.clone());
    }
  }

  match &mut account.profile {
    Profile::JobSeeker(p) => {
      *p = patched(p, patch)?;
      if p.name.trim().is_empty() {
        return Err(Error::validation("name cannot be empty"));
      }
      p.dedup_skills();
      p.national_id = non_blank(p.national_id.take());
      if !data.contains_key("workHours")
        && let (Some(from), Some(to)) = (&p.work_from, &p.work_to)
        && let Some(hours) = work_hours_between(from, to)
      {
        p.work_hours = Some(hours);
      }
    }
    Profile::Company(c) => {
      *c = patched(c, patch)?;
      if c.company_name.trim().is_empty() {
        return Err(Error::validation("companyName cannot be empty"));
      }
      c.tax_number = non_blank(c.tax_number.take());
      c.commercial_register = non_blank(c.commercial_register.take());
    }
  }

  Ok(advance(account, step))
}

/// Move the step counter forward and refresh the derived completion state.
pub fn advance(account: &mut Account, submitted: u8) -> StepOutcome {
  let max_step = account.kind().descriptor().max_step;
  let next = submitted.saturating_add(1).min(max_step);
  account.completion.step = account.completion.step.max(next).clamp(1, max_step);

  let outcome = refresh(account);
  if outcome.is_complete {
    account.completion.step = max_step;
    if let Some(p) = account.job_seeker_mut() {
      p.is_profile_completed = true;
    }
  }
  StepOutcome::of(account)
}

/// Recompute the trust score and completeness flag, updating the cached
/// copy on `account`.
pub fn refresh(account: &mut Account) -> StepOutcome {
  let score = trust::compute(account);
  account.completion.trust_score = score;
  account.completion.is_complete = score == 100;
  StepOutcome::of(account)
}

/// Overlay `patch` on the serialised form of `current` and read it back,
/// type-checking every patched field.
fn patched<T>(current: &T, patch: Map<String, Value>) -> Result<T>
where
  T: Serialize + DeserializeOwned,
{
  let mut value = serde_json::to_value(current)?;
  if let Value::Object(fields) = &mut value {
    fields.extend(patch);
  }
  serde_json::from_value(value).map_err(|e| Error::validation(format!("invalid step data: {e}")))
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}
