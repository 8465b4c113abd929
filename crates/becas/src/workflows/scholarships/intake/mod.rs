//! Application intake: entry checks, validation, pre-classification, and persistence.
//!
//! The duplicate and limit checks read the applicant's applications and then write; two
//! sessions submitting at once can both pass them.

mod eligibility;

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::records::{Collection, ListQuery, RecordStore, RecordStoreExt};

use super::domain::{
    fields, AcademicDetails, Application, ApplicationId, PersonalDetails, Scholarship,
    ScholarshipId, SocioeconomicDetails,
};
use super::error::{PortalError, RuleViolation, ValidationError};
use super::policy::PortalPolicy;
use super::session::Session;

pub use eligibility::{parse_income, pre_classify};

/// Fields collected across the multi-step application form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub scholarship_id: ScholarshipId,
    pub full_name: String,
    pub national_id: String,
    pub age: u32,
    pub education_level: String,
    pub declared_income: String,
    pub household_size: u32,
    pub motivation: String,
}

impl ApplicationForm {
    fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("scholarship", self.scholarship_id.as_str()),
            ("full name", self.full_name.as_str()),
            ("national id", self.national_id.as_str()),
            ("education level", self.education_level.as_str()),
            ("declared income", self.declared_income.as_str()),
            ("motivation", self.motivation.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ValidationError::MissingField(*field));
        }
        if self.household_size == 0 {
            return Err(ValidationError::InvalidHouseholdSize);
        }
        Ok(())
    }
}

/// Result of the entry check performed when an applicant opens the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeEntry {
    pub applications_held: usize,
    pub remaining: usize,
    pub open_scholarships: Vec<Scholarship>,
}

/// Applicant-facing submission workflow.
pub struct ApplicationIntake<S: ?Sized> {
    store: Arc<S>,
    policy: PortalPolicy,
}

impl<S: ?Sized> Clone for ApplicationIntake<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
        }
    }
}

impl<S> ApplicationIntake<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>, policy: PortalPolicy) -> Self {
        Self { store, policy }
    }

    /// Refuse to open the form once the applicant holds the maximum number of applications.
    pub fn check_entry(&self, session: &Session) -> Result<IntakeEntry, PortalError> {
        session.require_applicant("apply for scholarships")?;
        let held = self.applications_of(&session.email)?.len();
        if held >= self.policy.max_applications {
            return Err(RuleViolation::ApplicationLimit {
                limit: self.policy.max_applications,
            }
            .into());
        }

        let open_scholarships: Vec<Scholarship> = self
            .store
            .list_as::<Scholarship>(Collection::Scholarships, &ListQuery::new())?
            .into_iter()
            .filter(Scholarship::is_open)
            .collect();

        Ok(IntakeEntry {
            applications_held: held,
            remaining: self.policy.max_applications - held,
            open_scholarships,
        })
    }

    pub fn submit(
        &self,
        session: &Session,
        form: &ApplicationForm,
    ) -> Result<Application, PortalError> {
        session.require_applicant("apply for scholarships")?;
        form.validate()?;

        let existing = self.applications_of(&session.email)?;
        if existing
            .iter()
            .any(|application| application.scholarship_id == form.scholarship_id)
        {
            warn!(email = %session.email, scholarship_id = %form.scholarship_id, "rejected duplicate application");
            return Err(RuleViolation::DuplicateApplication {
                scholarship: form.scholarship_id.to_string(),
            }
            .into());
        }
        if existing.len() >= self.policy.max_applications {
            warn!(email = %session.email, held = existing.len(), "rejected application over limit");
            return Err(RuleViolation::ApplicationLimit {
                limit: self.policy.max_applications,
            }
            .into());
        }

        let scholarship: Scholarship = self
            .store
            .get_as(Collection::Scholarships, form.scholarship_id.as_str())?
            .ok_or_else(|| PortalError::not_found("scholarship", form.scholarship_id.as_str()))?;
        if !scholarship.is_open() {
            return Err(RuleViolation::ScholarshipClosed {
                name: scholarship.name,
            }
            .into());
        }

        let income = parse_income(&form.declared_income);
        let status = pre_classify(form.age, income, &self.policy);

        let application = Application {
            id: ApplicationId::default(),
            applicant_email: session.email.clone(),
            applicant_name: session.name.clone(),
            scholarship_id: scholarship.id.clone(),
            scholarship_name: scholarship.name.clone(),
            personal: PersonalDetails {
                full_name: form.full_name.trim().to_string(),
                national_id: form.national_id.trim().to_string(),
                age: form.age,
            },
            academic: AcademicDetails {
                education_level: form.education_level.trim().to_string(),
            },
            socioeconomic: SocioeconomicDetails {
                declared_income: form.declared_income.trim().to_string(),
                income,
                household_size: form.household_size,
            },
            motivation: form.motivation.trim().to_string(),
            status,
            evaluation: None,
            submitted_at: Utc::now(),
        };

        let stored: Application = self
            .store
            .create_as(Collection::Applications, &application)?;
        info!(
            application_id = %stored.id,
            email = %stored.applicant_email,
            scholarship_id = %stored.scholarship_id,
            status = stored.status.label(),
            "application submitted"
        );
        Ok(stored)
    }

    /// The applicant's own applications, newest first.
    pub fn history(&self, session: &Session) -> Result<Vec<Application>, PortalError> {
        session.require_applicant("view application history")?;
        let mut applications = self.applications_of(&session.email)?;
        applications.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(applications)
    }

    fn applications_of(&self, email: &str) -> Result<Vec<Application>, PortalError> {
        let query = ListQuery::new().filter(fields::APPLICANT_EMAIL, email);
        Ok(self.store.list_as(Collection::Applications, &query)?)
    }
}
