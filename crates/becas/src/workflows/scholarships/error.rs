use std::fmt;

use crate::records::StoreError;

use super::domain::ApplicationStatus;
use super::session::AccessDenied;

/// Password requirements enforced at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinimumLength,
    Uppercase,
    Digit,
    SpecialCharacter,
}

impl PasswordRule {
    pub const fn describe(self) -> &'static str {
        match self {
            PasswordRule::MinimumLength => "at least 8 characters",
            PasswordRule::Uppercase => "an uppercase letter",
            PasswordRule::Digit => "a number",
            PasswordRule::SpecialCharacter => "a special character (e.g. !@#$%)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreCriterion {
    Economic,
    Academic,
    Social,
}

impl fmt::Display for ScoreCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScoreCriterion::Economic => "economic",
            ScoreCriterion::Academic => "academic",
            ScoreCriterion::Social => "social",
        })
    }
}

/// Input rejected before any store call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("password must contain {}", describe_rules(.0))]
    WeakPassword(Vec<PasswordRule>),
    #[error("{criterion} score must be between 0 and {max}, found {found}")]
    ScoreOutOfRange {
        criterion: ScoreCriterion,
        max: u8,
        found: u8,
    },
    #[error("household size must be at least 1")]
    InvalidHouseholdSize,
}

fn describe_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(|rule| rule.describe())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Request refused by a portal business rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("the email {0} is already registered")]
    DuplicateEmail(String),
    #[error("no account is registered for {0}")]
    UnknownAccount(String),
    #[error("incorrect password")]
    WrongPassword,
    #[error("you cannot apply twice to the same scholarship ({scholarship})")]
    DuplicateApplication { scholarship: String },
    #[error("you have reached the maximum of {limit} applications")]
    ApplicationLimit { limit: usize },
    #[error("the scholarship {name} is closed to new applications")]
    ScholarshipClosed { name: String },
    #[error("this application has already been {} and cannot be modified", decided_verb(.status))]
    AlreadyDecided { status: ApplicationStatus },
    #[error("account {0} is not an evaluator")]
    NotAnEvaluator(String),
}

pub(crate) fn decided_verb(status: &ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Approved => "approved",
        ApplicationStatus::Rejected => "rejected",
        ApplicationStatus::Pending
        | ApplicationStatus::Eligible
        | ApplicationStatus::Ineligible => "processed",
    }
}

/// Error raised by the portal services.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Rejected(#[from] RuleViolation),
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PortalError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        PortalError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
