use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::records::{encode, Collection, ListQuery, RecordStore, RecordStoreExt, StoreOperation};

use super::domain::{
    fields, Application, Role, Scholarship, ScholarshipDraft, ScholarshipId, ScholarshipStatus,
};
use super::error::{PortalError, ValidationError};
use super::policy::PortalPolicy;
use super::session::Session;

/// Whether the signed-in account may start an application for a scholarship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Closed,
    AlreadyApplied,
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub scholarship: Scholarship,
    pub availability: Availability,
}

fn validate_draft(draft: &ScholarshipDraft) -> Result<ScholarshipDraft, ValidationError> {
    let name = draft.name.trim();
    let description = draft.description.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if description.is_empty() {
        return Err(ValidationError::MissingField("description"));
    }

    Ok(ScholarshipDraft {
        name: name.to_string(),
        description: description.to_string(),
        requirements: draft.requirements.trim().to_string(),
        status: draft.status,
        image: draft
            .image
            .as_ref()
            .map(|image| image.trim().to_string())
            .filter(|image| !image.is_empty()),
    })
}

/// Administrator-managed scholarship listings and the applicant catalog view.
pub struct ScholarshipCatalog<S: ?Sized> {
    store: Arc<S>,
    policy: PortalPolicy,
}

impl<S: ?Sized> Clone for ScholarshipCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
        }
    }
}

impl<S> ScholarshipCatalog<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>, policy: PortalPolicy) -> Self {
        Self { store, policy }
    }

    pub fn list(&self) -> Result<Vec<Scholarship>, PortalError> {
        Ok(self
            .store
            .list_as(Collection::Scholarships, &ListQuery::new())?)
    }

    pub fn list_open(&self) -> Result<Vec<Scholarship>, PortalError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(Scholarship::is_open)
            .collect())
    }

    pub fn get(&self, id: &ScholarshipId) -> Result<Scholarship, PortalError> {
        self.store
            .get_as(Collection::Scholarships, id.as_str())?
            .ok_or_else(|| PortalError::not_found("scholarship", id.as_str()))
    }

    pub fn create(
        &self,
        session: &Session,
        draft: &ScholarshipDraft,
    ) -> Result<Scholarship, PortalError> {
        session.require_admin("publish scholarships")?;
        let draft = validate_draft(draft)?;
        let scholarship = Scholarship {
            id: ScholarshipId::default(),
            name: draft.name,
            description: draft.description,
            requirements: draft.requirements,
            status: draft.status,
            image: draft.image,
        };

        let stored: Scholarship = self
            .store
            .create_as(Collection::Scholarships, &scholarship)?;
        info!(scholarship_id = %stored.id, name = %stored.name, "published scholarship");
        Ok(stored)
    }

    /// Replace every editable field; no history is kept.
    pub fn update(
        &self,
        session: &Session,
        id: &ScholarshipId,
        draft: &ScholarshipDraft,
    ) -> Result<Scholarship, PortalError> {
        session.require_admin("edit scholarships")?;
        let draft = validate_draft(draft)?;
        self.get(id)?;

        let changes = encode(StoreOperation::Update, Collection::Scholarships, &draft)?;
        let stored: Scholarship =
            self.store
                .patch_as(Collection::Scholarships, id.as_str(), changes)?;
        info!(scholarship_id = %stored.id, "updated scholarship");
        Ok(stored)
    }

    pub fn toggle_status(
        &self,
        session: &Session,
        id: &ScholarshipId,
    ) -> Result<Scholarship, PortalError> {
        session.require_admin("open or close scholarships")?;
        let current = self.get(id)?;
        let status = current.status.toggled();
        let changes = serde_json::json!({ "status": status });

        let stored: Scholarship =
            self.store
                .patch_as(Collection::Scholarships, id.as_str(), changes)?;
        info!(scholarship_id = %stored.id, status = stored.status.label(), "toggled scholarship");
        Ok(stored)
    }

    /// Existing applications keep their scholarship snapshot.
    pub fn delete(&self, session: &Session, id: &ScholarshipId) -> Result<(), PortalError> {
        session.require_admin("delete scholarships")?;
        self.store
            .delete(Collection::Scholarships, id.as_str())
            .map_err(|err| {
                if err.is_not_found() {
                    PortalError::not_found("scholarship", id.as_str())
                } else {
                    err.into()
                }
            })?;
        info!(scholarship_id = %id, deleted_by = %session.email, "deleted scholarship");
        Ok(())
    }

    /// Every scholarship annotated with whether this session may apply to it.
    pub fn catalog_for(&self, session: &Session) -> Result<Vec<CatalogEntry>, PortalError> {
        let scholarships = self.list()?;

        let applications: Vec<Application> = match session.role {
            Role::Applicant => {
                let query = ListQuery::new().filter(fields::APPLICANT_EMAIL, session.email.clone());
                self.store.list_as(Collection::Applications, &query)?
            }
            Role::Evaluator | Role::Admin => Vec::new(),
        };
        let limit_reached = session.role == Role::Applicant
            && applications.len() >= self.policy.max_applications;

        Ok(scholarships
            .into_iter()
            .map(|scholarship| {
                let availability = if scholarship.status == ScholarshipStatus::Closed {
                    Availability::Closed
                } else if applications
                    .iter()
                    .any(|application| application.scholarship_id == scholarship.id)
                {
                    Availability::AlreadyApplied
                } else if limit_reached {
                    Availability::LimitReached
                } else {
                    Availability::Available
                };
                CatalogEntry {
                    scholarship,
                    availability,
                }
            })
            .collect())
    }
}
