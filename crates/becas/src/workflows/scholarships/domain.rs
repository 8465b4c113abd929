use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Accepts ids stored either as JSON strings or numbers.
fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(#[serde(deserialize_with = "flexible_id")] pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Not yet issued by the record store.
            pub fn is_unassigned(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a published scholarship.
    ScholarshipId
);
record_id!(
    /// Identifier of a portal account.
    AccountId
);
record_id!(
    /// Identifier of a submitted application.
    ApplicationId
);
record_id!(NotificationId);

/// Field names used when filtering store listings.
pub(crate) mod fields {
    pub const APPLICANT_EMAIL: &str = "applicant_email";
    pub const STATUS: &str = "status";
    pub const SUBMITTED_AT: &str = "submitted_at";
    pub const ROLE: &str = "role";
    pub const RECIPIENT_EMAIL: &str = "recipient_email";
    pub const READ: &str = "read";
    pub const CREATED_AT: &str = "created_at";
}

/// Publication state of a scholarship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScholarshipStatus {
    Open,
    Closed,
}

impl ScholarshipStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ScholarshipStatus::Open => "Open",
            ScholarshipStatus::Closed => "Closed",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            ScholarshipStatus::Open => ScholarshipStatus::Closed,
            ScholarshipStatus::Closed => ScholarshipStatus::Open,
        }
    }
}

/// Scholarship offer published by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scholarship {
    #[serde(default, skip_serializing_if = "ScholarshipId::is_unassigned")]
    pub id: ScholarshipId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    pub status: ScholarshipStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Scholarship {
    pub fn is_open(&self) -> bool {
        self.status == ScholarshipStatus::Open
    }
}

/// Editable scholarship fields supplied by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScholarshipDraft {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    #[serde(default = "default_open")]
    pub status: ScholarshipStatus,
    #[serde(default)]
    pub image: Option<String>,
}

fn default_open() -> ScholarshipStatus {
    ScholarshipStatus::Open
}

/// Role attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Applicant,
    Evaluator,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Applicant => "applicant",
            Role::Evaluator => "evaluator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stored account. The credential is kept and compared in plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "AccountId::is_unassigned")]
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            registered_at: self.registered_at,
        }
    }
}

/// Account without its credential, safe to return to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of an application.
///
/// `Pendiente`, `Apta`, and `No apta` precede evaluation; `Aprobada` and `Rechazada` are
/// terminal and set only by an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "Apta")]
    Eligible,
    #[serde(rename = "No apta")]
    Ineligible,
    #[serde(rename = "Aprobada")]
    Approved,
    #[serde(rename = "Rechazada")]
    Rejected,
}

impl ApplicationStatus {
    pub const TERMINAL: [ApplicationStatus; 2] =
        [ApplicationStatus::Approved, ApplicationStatus::Rejected];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pendiente",
            ApplicationStatus::Eligible => "Apta",
            ApplicationStatus::Ineligible => "No apta",
            ApplicationStatus::Approved => "Aprobada",
            ApplicationStatus::Rejected => "Rechazada",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub full_name: String,
    pub national_id: String,
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicDetails {
    pub education_level: String,
}

/// Household situation. `declared_income` keeps the text as typed by the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocioeconomicDetails {
    pub declared_income: String,
    pub income: u64,
    pub household_size: u32,
}

/// Application submitted by an applicant against one scholarship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default, skip_serializing_if = "ApplicationId::is_unassigned")]
    pub id: ApplicationId,
    pub applicant_email: String,
    pub applicant_name: String,
    pub scholarship_id: ScholarshipId,
    pub scholarship_name: String,
    pub personal: PersonalDetails,
    pub academic: AcademicDetails,
    pub socioeconomic: SocioeconomicDetails,
    pub motivation: String,
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    pub submitted_at: DateTime<Utc>,
}

impl Application {
    /// Display name shown to evaluators.
    pub fn display_name(&self) -> &str {
        if self.personal.full_name.trim().is_empty() {
            &self.applicant_name
        } else {
            &self.personal.full_name
        }
    }
}

/// Scores awarded per criterion. Caps: economic 40, academic 30, social 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub economic: u8,
    pub academic: u8,
    pub social: u8,
}

impl ScoreBreakdown {
    pub const ECONOMIC_MAX: u8 = 40;
    pub const ACADEMIC_MAX: u8 = 30;
    pub const SOCIAL_MAX: u8 = 30;

    pub fn total(&self) -> u16 {
        u16::from(self.economic) + u16::from(self.academic) + u16::from(self.social)
    }
}

/// Evaluator decision record attached once to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scores: ScoreBreakdown,
    pub total: u16,
    pub observations: String,
    pub evaluator: String,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Info,
    Success,
    Warning,
    Error,
}

/// Mailbox entry addressed to one account email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, skip_serializing_if = "NotificationId::is_unassigned")]
    pub id: NotificationId,
    pub recipient_email: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub category: NotificationCategory,
}
