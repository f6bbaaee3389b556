//! Trust score: the percentage of a fixed per-kind checklist that is filled
//! in on an account.
//!
//! The score is a pure function of the account's fields. The value cached in
//! [`ProfileCompletion::trust_score`](crate::account::ProfileCompletion) is a
//! convenience copy and is never authoritative.

use chrono::NaiveDate;
use serde::Serialize;

use crate::account::{Account, CompanyProfile, JobSeekerProfile, Profile};

/// Whether a field counts as filled in.
pub trait Presence {
  fn is_present(&self) -> bool;
}

impl Presence for str {
  fn is_present(&self) -> bool { !self.is_empty() }
}

impl Presence for String {
  fn is_present(&self) -> bool { !self.is_empty() }
}

impl Presence for f64 {
  fn is_present(&self) -> bool { *self != 0.0 && !self.is_nan() }
}

impl Presence for NaiveDate {
  fn is_present(&self) -> bool { true }
}

impl<T: Presence> Presence for Option<T> {
  fn is_present(&self) -> bool { self.as_ref().is_some_and(Presence::is_present) }
}

impl<T> Presence for Vec<T> {
  fn is_present(&self) -> bool { !self.is_empty() }
}

/// One checklist entry, named by its wire field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldCheck {
  pub field:   &'static str,
  pub present: bool,
}

fn check(field: &'static str, value: &(impl Presence + ?Sized)) -> FieldCheck {
  FieldCheck { field, present: value.is_present() }
}

fn job_seeker_checklist(email: &str, p: &JobSeekerProfile) -> Vec<FieldCheck> {
  vec![
    check("name", &p.name),
    check("email", email),
    check("nationalId", &p.national_id),
    check("phone", &p.phone),
    check("college", &p.college),
    check("highSchool", &p.high_school),
    check("governorate", &p.governorate),
    check("residence", &p.residence),
    check("educationLevel", &p.education_level),
    check("fieldOfStudy", &p.field_of_study),
    check("desiredSalary", &p.desired_salary),
    check("workHours", &p.work_hours),
    check("skills", &p.skills),
    check("languages", &p.languages),
    check("certificates", &p.certificates),
  ]
}

fn company_checklist(email: &str, p: &CompanyProfile) -> Vec<FieldCheck> {
  vec![
    check("companyName", &p.company_name),
    check("email", email),
    check("phone", &p.phone),
    check("address", &p.address),
    check("governorate", &p.governorate),
    check("industry", &p.industry),
    check("logo", &p.logo),
    check("website", &p.website),
    check("startDate", &p.start_date),
    check("businessNature", &p.business_nature),
    check("workingHours", &p.working_hours),
    check("workingDays", &p.working_days),
    check("description", &p.description),
    check("employees", &p.employees),
    check("managers", &p.managers),
  ]
}

/// Every checklist entry for `account`, in checklist order.
pub fn breakdown(account: &Account) -> Vec<FieldCheck> {
  match &account.profile {
    Profile::JobSeeker(p) => job_seeker_checklist(&account.email, p),
    Profile::Company(p) => company_checklist(&account.email, p),
  }
}

/// Names of checklist fields that are still empty.
pub fn missing_fields(account: &Account) -> Vec<&'static str> {
  breakdown(account)
    .into_iter()
    .filter(|c| !c.present)
    .map(|c| c.field)
    .collect()
}

/// `round(present / total * 100)`, rounding halves up.
pub fn compute(account: &Account) -> u8 {
  let checks = breakdown(account);
  let total = checks.len() as u32;
  let present = checks.iter().filter(|c| c.present).count() as u32;
  percentage(present, total)
}

fn percentage(present: u32, total: u32) -> u8 {
  if total == 0 {
    return 0;
  }
  ((present * 200 + total) / (total * 2)) as u8
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::account::{Employee, Language, Manager};

  fn seeker(profile: JobSeekerProfile) -> Account {
    Account::new("ali@x.com", String::new(), Profile::JobSeeker(profile), Utc::now())
  }

  fn company(profile: CompanyProfile) -> Account {
    Account::new("hr@acme.com", String::new(), Profile::Company(profile), Utc::now())
  }

  #[test]
  fn rounding_matches_half_up() {
    assert_eq!(percentage(0, 15), 0);
    assert_eq!(percentage(1, 15), 7);
    assert_eq!(percentage(3, 15), 20);
    assert_eq!(percentage(1, 8), 13);
    assert_eq!(percentage(15, 15), 100);
  }

  #[test]
  fn fresh_job_seeker_scores_low() {
    let account = seeker(JobSeekerProfile {
      name: "Ali".into(),
      phone: Some("01000000000".into()),
      ..Default::default()
    });
    assert_eq!(compute(&account), 20);
    assert_eq!(missing_fields(&account).len(), 12);
  }

  #[test]
  fn zero_and_empty_values_are_absent() {
    let account = seeker(JobSeekerProfile {
      name: "Ali".into(),
      desired_salary: Some(0.0),
      work_hours: Some(0.0),
      college: Some(String::new()),
      skills: vec![],
      ..Default::default()
    });
    let missing = missing_fields(&account);
    assert!(missing.contains(&"desiredSalary"));
    assert!(missing.contains(&"workHours"));
    assert!(missing.contains(&"college"));
    assert!(missing.contains(&"skills"));
  }

  #[test]
  fn full_job_seeker_scores_100() {
    let account = seeker(JobSeekerProfile {
      name: "Ali".into(),
      national_id: Some("29801011234567".into()),
      phone: Some("0100".into()),
      college: Some("Engineering".into()),
      high_school: Some("HS".into()),
      governorate: Some("Cairo".into()),
      residence: Some("Nasr City".into()),
      education_level: Some("bachelor".into()),
      field_of_study: Some("CS".into()),
      desired_salary: Some(9000.0),
      work_hours: Some(8.0),
      skills: vec!["rust".into()],
      languages: vec![Language { name: "Arabic".into(), proficiency: None, native: true }],
      certificates: vec![crate::account::Certificate {
        name:     "AWS".into(),
        issuer:   None,
        date:     None,
        file_url: None,
      }],
      ..Default::default()
    });
    assert_eq!(compute(&account), 100);
    assert!(missing_fields(&account).is_empty());
  }

  #[test]
  fn company_lists_count_as_one_field_each() {
    let mut account = company(CompanyProfile {
      company_name: "Acme".into(),
      ..Default::default()
    });
    let before = compute(&account);
    let p = account.company_mut().unwrap();
    p.employees = vec![Employee::default(), Employee::default()];
    p.managers = vec![Manager::default()];
    // 2 → 4 of 15
    assert_eq!(before, 13);
    assert_eq!(compute(&account), 27);
  }

  #[test]
  fn compute_is_deterministic() {
    let account = company(CompanyProfile {
      company_name: "Acme".into(),
      website: Some("https://acme.example".into()),
      ..Default::default()
    });
    assert_eq!(compute(&account), compute(&account));
    assert_eq!(breakdown(&account), breakdown(&account));
  }
}
