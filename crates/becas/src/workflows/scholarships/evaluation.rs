//! Evaluator gate: one-way transition of an application to Aprobada or Rechazada.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::records::{Collection, ListQuery, Precondition, RecordStore, RecordStoreExt};

use super::domain::{
    fields, Application, ApplicationId, ApplicationStatus, Evaluation, NotificationCategory,
    ScoreBreakdown,
};
use super::error::{PortalError, RuleViolation, ScoreCriterion, ValidationError};
use super::notifications::NotificationCenter;
use super::policy::PortalPolicy;
use super::session::Session;

/// What an evaluator sees when opening an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewView {
    /// Already decided; scoring is not offered.
    Locked {
        application: Application,
        message: String,
    },
    Open { application: Application },
}

impl ReviewView {
    pub fn application(&self) -> &Application {
        match self {
            ReviewView::Locked { application, .. } | ReviewView::Open { application } => {
                application
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, ReviewView::Locked { .. })
    }
}

/// Scores and observations entered by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub economic: u8,
    pub academic: u8,
    pub social: u8,
    #[serde(default)]
    pub observations: String,
}

impl ScoreSheet {
    pub fn validate(&self) -> Result<ScoreBreakdown, ValidationError> {
        let checks = [
            (ScoreCriterion::Economic, self.economic, ScoreBreakdown::ECONOMIC_MAX),
            (ScoreCriterion::Academic, self.academic, ScoreBreakdown::ACADEMIC_MAX),
            (ScoreCriterion::Social, self.social, ScoreBreakdown::SOCIAL_MAX),
        ];
        for (criterion, found, max) in checks {
            if found > max {
                return Err(ValidationError::ScoreOutOfRange {
                    criterion,
                    max,
                    found,
                });
            }
        }

        Ok(ScoreBreakdown {
            economic: self.economic,
            academic: self.academic,
            social: self.social,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub const fn status(self) -> ApplicationStatus {
        match self {
            Decision::Approve => ApplicationStatus::Approved,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

/// Evaluator queue filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueFilter {
    #[default]
    All,
    /// Pendiente or Apta.
    Pending,
    Approved,
    /// Rechazada or No apta.
    Rejected,
}

impl QueueFilter {
    pub fn admits(self, status: ApplicationStatus) -> bool {
        match self {
            QueueFilter::All => true,
            QueueFilter::Pending => matches!(
                status,
                ApplicationStatus::Pending | ApplicationStatus::Eligible
            ),
            QueueFilter::Approved => status == ApplicationStatus::Approved,
            QueueFilter::Rejected => matches!(
                status,
                ApplicationStatus::Rejected | ApplicationStatus::Ineligible
            ),
        }
    }
}

fn still_open() -> Precondition {
    Precondition::FieldNotIn {
        field: fields::STATUS.to_string(),
        values: ApplicationStatus::TERMINAL
            .iter()
            .map(|status| json!(status))
            .collect(),
    }
}

pub struct EvaluationGate<S: ?Sized> {
    store: Arc<S>,
    notifications: NotificationCenter<S>,
    policy: PortalPolicy,
}

impl<S: ?Sized> Clone for EvaluationGate<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifications: self.notifications.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S> EvaluationGate<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>, policy: PortalPolicy) -> Self {
        Self {
            notifications: NotificationCenter::new(Arc::clone(&store)),
            store,
            policy,
        }
    }

    pub fn open(&self, session: &Session, id: &ApplicationId) -> Result<ReviewView, PortalError> {
        session.require_staff("review applications")?;
        let application = self.fetch(id)?;

        if application.status.is_terminal() {
            let message = RuleViolation::AlreadyDecided {
                status: application.status,
            }
            .to_string();
            return Ok(ReviewView::Locked {
                application,
                message,
            });
        }
        Ok(ReviewView::Open { application })
    }

    /// Record the decision with a conditional write that only applies while the stored
    /// status is still non-terminal.
    pub fn decide(
        &self,
        session: &Session,
        id: &ApplicationId,
        decision: Decision,
        sheet: &ScoreSheet,
    ) -> Result<Application, PortalError> {
        session.require_staff("evaluate applications")?;
        let scores = sheet.validate()?;

        let evaluation = Evaluation {
            scores,
            total: scores.total(),
            observations: sheet.observations.trim().to_string(),
            evaluator: session.name.clone(),
            evaluated_at: Utc::now(),
        };
        let changes = json!({
            "status": decision.status(),
            "evaluation": evaluation,
        });

        let decided: Application = match self.store.patch_if_as(
            Collection::Applications,
            id.as_str(),
            &still_open(),
            changes,
        ) {
            Ok(application) => application,
            Err(err) if err.is_precondition_failed() => {
                let current = self.fetch(id)?;
                warn!(application_id = %id, status = current.status.label(), "rejected evaluation of decided application");
                return Err(RuleViolation::AlreadyDecided {
                    status: current.status,
                }
                .into());
            }
            Err(err) if err.is_not_found() => {
                return Err(PortalError::not_found("application", id.as_str()))
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            application_id = %decided.id,
            status = decided.status.label(),
            total = evaluation.total,
            evaluator = %session.email,
            "application decided"
        );

        if self.policy.notify_on_decision {
            self.announce(&decided);
        }
        Ok(decided)
    }

    /// Applications visible to evaluators, newest first.
    pub fn queue(
        &self,
        session: &Session,
        filter: QueueFilter,
    ) -> Result<Vec<Application>, PortalError> {
        session.require_staff("list applications")?;
        let mut applications: Vec<Application> = self
            .store
            .list_as::<Application>(Collection::Applications, &ListQuery::new())?
            .into_iter()
            .filter(|application| filter.admits(application.status))
            .collect();
        applications.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(applications)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Application, PortalError> {
        self.store
            .get_as(Collection::Applications, id.as_str())?
            .ok_or_else(|| PortalError::not_found("application", id.as_str()))
    }

    /// Best effort; a failed notification never undoes the decision.
    fn announce(&self, application: &Application) {
        let (title, category) = match application.status {
            ApplicationStatus::Approved => ("Application approved", NotificationCategory::Success),
            _ => ("Application rejected", NotificationCategory::Warning),
        };
        let message = format!(
            "Your application for {} is now {}.",
            application.scholarship_name,
            application.status.label()
        );

        if let Err(err) = self.notifications.notify(
            &application.applicant_email,
            title,
            &message,
            category,
        ) {
            warn!(application_id = %application.id, error = %err, "decision notification failed");
        }
    }
}
