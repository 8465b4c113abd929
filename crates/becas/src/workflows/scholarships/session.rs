use serde::{Deserialize, Serialize};

use super::domain::{Account, AccountId, Role};

/// Signed-in account context passed explicitly into every portal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn for_account(account: &Account) -> Self {
        Self {
            account_id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
        }
    }

    /// Single authorization check: the session's role must be one of `allowed`.
    pub fn authorize(&self, action: &'static str, allowed: &[Role]) -> Result<Role, AccessDenied> {
        if allowed.contains(&self.role) {
            Ok(self.role)
        } else {
            Err(AccessDenied {
                role: self.role,
                action,
            })
        }
    }

    pub fn require_applicant(&self, action: &'static str) -> Result<(), AccessDenied> {
        self.authorize(action, &[Role::Applicant]).map(|_| ())
    }

    pub fn require_staff(&self, action: &'static str) -> Result<Role, AccessDenied> {
        self.authorize(action, &[Role::Evaluator, Role::Admin])
    }

    pub fn require_admin(&self, action: &'static str) -> Result<(), AccessDenied> {
        self.authorize(action, &[Role::Admin]).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{role} accounts may not {action}")]
pub struct AccessDenied {
    pub role: Role,
    pub action: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            account_id: AccountId::new("1"),
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            role,
        }
    }

    #[test]
    fn authorize_returns_the_matching_role() {
        let evaluator = session(Role::Evaluator);
        assert_eq!(
            evaluator.require_staff("review applications"),
            Ok(Role::Evaluator)
        );
    }

    #[test]
    fn authorize_names_the_denied_action() {
        let applicant = session(Role::Applicant);
        let denied = applicant
            .require_admin("manage scholarships")
            .expect_err("applicants are not admins");
        assert_eq!(denied.role, Role::Applicant);
        assert_eq!(
            denied.to_string(),
            "applicant accounts may not manage scholarships"
        );
    }
}
