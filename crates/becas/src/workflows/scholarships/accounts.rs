use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::records::{Collection, ListQuery, RecordStore, RecordStoreExt};

use super::domain::{fields, Account, AccountId, AccountView, Role};
use super::error::{PasswordRule, PortalError, RuleViolation, ValidationError};
use super::session::Session;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";
const MINIMUM_PASSWORD_LENGTH: usize = 8;

/// Sign-up payload shared by applicant registration and evaluator provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Collect every password rule the candidate fails.
pub fn check_password(password: &str) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if password.chars().count() < MINIMUM_PASSWORD_LENGTH {
        missing.push(PasswordRule::MinimumLength);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push(PasswordRule::Uppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push(PasswordRule::Digit);
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        missing.push(PasswordRule::SpecialCharacter);
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword(missing))
    }
}

fn validate_registration(registration: &Registration) -> Result<Registration, ValidationError> {
    let name = registration.name.trim();
    let email = registration.email.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if email.is_empty() {
        return Err(ValidationError::MissingField("email"));
    }
    if registration.password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err(ValidationError::InvalidEmail(email.to_string())),
    }

    check_password(&registration.password)?;

    Ok(Registration {
        name: name.to_string(),
        email: email.to_string(),
        password: registration.password.clone(),
    })
}

/// Account registration, sign-in, and evaluator administration.
pub struct AccountDirectory<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for AccountDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> AccountDirectory<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Self-service sign-up; the new account is always an applicant.
    pub fn register(&self, registration: &Registration) -> Result<Session, PortalError> {
        let account = self.insert(registration, Role::Applicant, None)?;
        info!(email = %account.email, "registered applicant account");
        Ok(Session::for_account(&account))
    }

    /// Plaintext credential check.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, PortalError> {
        if email.trim().is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let account = self
            .find_by_email(email)?
            .ok_or_else(|| RuleViolation::UnknownAccount(email.trim().to_string()))?;

        if account.password != password {
            warn!(email = %account.email, "rejected login with wrong password");
            return Err(RuleViolation::WrongPassword.into());
        }

        Ok(Session::for_account(&account))
    }

    /// Rebuild the session for an already signed-in email.
    pub fn resolve(&self, email: &str) -> Result<Session, PortalError> {
        let account = self
            .find_by_email(email)?
            .ok_or_else(|| RuleViolation::UnknownAccount(email.trim().to_string()))?;
        Ok(Session::for_account(&account))
    }

    pub fn create_evaluator(
        &self,
        session: &Session,
        registration: &Registration,
    ) -> Result<AccountView, PortalError> {
        session.require_admin("create evaluator accounts")?;
        let account = self.insert(registration, Role::Evaluator, Some(Utc::now()))?;
        info!(email = %account.email, created_by = %session.email, "created evaluator account");
        Ok(account.view())
    }

    pub fn list_evaluators(&self, session: &Session) -> Result<Vec<AccountView>, PortalError> {
        session.require_admin("list evaluator accounts")?;
        let query = ListQuery::new().filter(fields::ROLE, Role::Evaluator.label());
        let accounts: Vec<Account> = self.store.list_as(Collection::Accounts, &query)?;
        Ok(accounts.iter().map(Account::view).collect())
    }

    pub fn delete_evaluator(&self, session: &Session, id: &AccountId) -> Result<(), PortalError> {
        session.require_admin("delete evaluator accounts")?;
        let account: Account = self
            .store
            .get_as(Collection::Accounts, id.as_str())?
            .ok_or_else(|| PortalError::not_found("account", id.as_str()))?;

        if account.role != Role::Evaluator {
            return Err(RuleViolation::NotAnEvaluator(id.to_string()).into());
        }

        self.store.delete(Collection::Accounts, id.as_str())?;
        info!(email = %account.email, deleted_by = %session.email, "deleted evaluator account");
        Ok(())
    }

    /// Case-insensitive scan; uniqueness is only as strong as this read.
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, PortalError> {
        let wanted = email.trim();
        let accounts: Vec<Account> = self.store.list_as(Collection::Accounts, &ListQuery::new())?;
        Ok(accounts
            .into_iter()
            .find(|account| account.email.eq_ignore_ascii_case(wanted)))
    }

    fn insert(
        &self,
        registration: &Registration,
        role: Role,
        registered_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<Account, PortalError> {
        let registration = validate_registration(registration)?;

        if self.find_by_email(&registration.email)?.is_some() {
            return Err(RuleViolation::DuplicateEmail(registration.email).into());
        }

        let account = Account {
            id: AccountId::default(),
            name: registration.name,
            email: registration.email,
            password: registration.password,
            role,
            registered_at,
        };

        Ok(self.store.create_as(Collection::Accounts, &account)?)
    }
}
