use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::records::{Collection, ListQuery, RecordStore, RecordStoreExt};

use super::domain::{Application, ApplicationStatus, Scholarship};
use super::error::PortalError;
use super::session::Session;

const EXPORT_HEADER: [&str; 7] = [
    "id",
    "applicant_email",
    "scholarship",
    "status",
    "submitted_at",
    "total_score",
    "evaluator",
];

/// Decided versus undecided applications. `pending` counts every non-terminal status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_applications: usize,
    pub open_scholarships: usize,
    pub pending: usize,
    pub approved: usize,
    pub status_distribution: StatusDistribution,
    pub applications_per_scholarship: BTreeMap<String, usize>,
    pub generated_at: DateTime<Utc>,
}

impl DashboardSummary {
    pub fn from_records(scholarships: &[Scholarship], applications: &[Application]) -> Self {
        let mut distribution = StatusDistribution::default();
        let mut per_scholarship: BTreeMap<String, usize> = BTreeMap::new();

        for application in applications {
            match application.status {
                ApplicationStatus::Approved => distribution.approved += 1,
                ApplicationStatus::Rejected => distribution.rejected += 1,
                ApplicationStatus::Pending
                | ApplicationStatus::Eligible
                | ApplicationStatus::Ineligible => distribution.pending += 1,
            }
            *per_scholarship
                .entry(application.scholarship_name.clone())
                .or_default() += 1;
        }

        Self {
            total_applications: applications.len(),
            open_scholarships: scholarships.iter().filter(|s| s.is_open()).count(),
            pending: distribution.pending,
            approved: distribution.approved,
            status_distribution: distribution,
            applications_per_scholarship: per_scholarship,
            generated_at: Utc::now(),
        }
    }
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total applications: {}", self.total_applications)?;
        writeln!(f, "Open scholarships:  {}", self.open_scholarships)?;
        writeln!(f, "Pending:            {}", self.pending)?;
        writeln!(f, "Approved:           {}", self.approved)?;
        writeln!(
            f,
            "Status: {} approved, {} rejected, {} pending",
            self.status_distribution.approved,
            self.status_distribution.rejected,
            self.status_distribution.pending
        )?;
        writeln!(f, "Applications per scholarship:")?;
        for (name, count) in &self.applications_per_scholarship {
            writeln!(f, "  {name}: {count}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ExportError {
    Portal(PortalError),
    Csv(csv::Error),
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Portal(err) => write!(f, "could not load applications: {err}"),
            ExportError::Csv(err) => write!(f, "failed to write CSV export: {err}"),
            ExportError::Io(err) => write!(f, "failed to flush CSV export: {err}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Portal(err) => Some(err),
            ExportError::Csv(err) => Some(err),
            ExportError::Io(err) => Some(err),
        }
    }
}

impl From<PortalError> for ExportError {
    fn from(err: PortalError) -> Self {
        Self::Portal(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Administrator dashboard and history export.
pub struct ReportingDashboard<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ReportingDashboard<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> ReportingDashboard<S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn dashboard(&self, session: &Session) -> Result<DashboardSummary, PortalError> {
        session.require_admin("view the dashboard")?;
        let scholarships: Vec<Scholarship> = self
            .store
            .list_as(Collection::Scholarships, &ListQuery::new())?;
        let applications = self.applications()?;
        Ok(DashboardSummary::from_records(&scholarships, &applications))
    }

    /// Write one CSV row per application, oldest first. Returns the number of rows written.
    pub fn export_csv<W: Write>(&self, session: &Session, writer: W) -> Result<usize, ExportError> {
        session
            .require_admin("export application history")
            .map_err(PortalError::from)?;
        let mut applications = self.applications()?;
        applications.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(EXPORT_HEADER)?;
        for application in &applications {
            let (total, evaluator) = match &application.evaluation {
                Some(evaluation) => (evaluation.total.to_string(), evaluation.evaluator.clone()),
                None => (String::new(), String::new()),
            };
            csv_writer.write_record([
                application.id.as_str(),
                application.applicant_email.as_str(),
                application.scholarship_name.as_str(),
                application.status.label(),
                application.submitted_at.to_rfc3339().as_str(),
                total.as_str(),
                evaluator.as_str(),
            ])?;
        }
        csv_writer.flush()?;

        info!(rows = applications.len(), exported_by = %session.email, "exported application history");
        Ok(applications.len())
    }

    fn applications(&self) -> Result<Vec<Application>, PortalError> {
        Ok(self
            .store
            .list_as(Collection::Applications, &ListQuery::new())?)
    }
}
