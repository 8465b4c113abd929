use std::sync::Arc;

use crate::records::RecordStore;

use super::accounts::AccountDirectory;
use super::catalog::ScholarshipCatalog;
use super::evaluation::EvaluationGate;
use super::intake::ApplicationIntake;
use super::notifications::NotificationCenter;
use super::policy::PortalPolicy;
use super::reports::ReportingDashboard;

/// Service composing every portal workflow over one shared record store.
pub struct ScholarshipPortal<S: ?Sized> {
    store: Arc<S>,
    policy: PortalPolicy,
    accounts: AccountDirectory<S>,
    catalog: ScholarshipCatalog<S>,
    intake: ApplicationIntake<S>,
    gate: EvaluationGate<S>,
    notifications: NotificationCenter<S>,
    reports: ReportingDashboard<S>,
}

impl<S: ?Sized> Clone for ScholarshipPortal<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
            accounts: self.accounts.clone(),
            catalog: self.catalog.clone(),
            intake: self.intake.clone(),
            gate: self.gate.clone(),
            notifications: self.notifications.clone(),
            reports: self.reports.clone(),
        }
    }
}

impl<S> ScholarshipPortal<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>, policy: PortalPolicy) -> Self {
        Self {
            accounts: AccountDirectory::new(Arc::clone(&store)),
            catalog: ScholarshipCatalog::new(Arc::clone(&store), policy.clone()),
            intake: ApplicationIntake::new(Arc::clone(&store), policy.clone()),
            gate: EvaluationGate::new(Arc::clone(&store), policy.clone()),
            notifications: NotificationCenter::new(Arc::clone(&store)),
            reports: ReportingDashboard::new(Arc::clone(&store)),
            store,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> &PortalPolicy {
        &self.policy
    }

    pub fn accounts(&self) -> &AccountDirectory<S> {
        &self.accounts
    }

    pub fn catalog(&self) -> &ScholarshipCatalog<S> {
        &self.catalog
    }

    pub fn intake(&self) -> &ApplicationIntake<S> {
        &self.intake
    }

    pub fn gate(&self) -> &EvaluationGate<S> {
        &self.gate
    }

    pub fn notifications(&self) -> &NotificationCenter<S> {
        &self.notifications
    }

    pub fn reports(&self) -> &ReportingDashboard<S> {
        &self.reports
    }
}
