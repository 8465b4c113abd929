//! Scholarship portal workflows: accounts, catalog, intake, evaluation, notifications, and
//! reporting over a shared [`RecordStore`](crate::records::RecordStore).

pub mod accounts;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod intake;
pub mod notifications;
pub mod policy;
pub mod reports;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use accounts::{check_password, AccountDirectory, Registration};
pub use catalog::{Availability, CatalogEntry, ScholarshipCatalog};
pub use domain::{
    AcademicDetails, Account, AccountId, AccountView, Application, ApplicationId,
    ApplicationStatus, Evaluation, Notification, NotificationCategory, NotificationId,
    PersonalDetails, Role, Scholarship, ScholarshipDraft, ScholarshipId, ScholarshipStatus,
    ScoreBreakdown, SocioeconomicDetails,
};
pub use error::{PasswordRule, PortalError, RuleViolation, ScoreCriterion, ValidationError};
pub use evaluation::{Decision, EvaluationGate, QueueFilter, ReviewView, ScoreSheet};
pub use intake::{parse_income, pre_classify, ApplicationForm, ApplicationIntake, IntakeEntry};
pub use notifications::{spawn_inbox_poller, InboxPoller, InboxSnapshot, NotificationCenter};
pub use policy::PortalPolicy;
pub use reports::{DashboardSummary, ExportError, ReportingDashboard, StatusDistribution};
pub use router::{portal_router, SESSION_HEADER};
pub use service::ScholarshipPortal;
pub use session::{AccessDenied, Session};
