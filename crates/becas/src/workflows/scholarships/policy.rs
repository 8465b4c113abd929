use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Business limits applied by the portal workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalPolicy {
    /// Applications an applicant may hold at once.
    pub max_applications: usize,
    /// Youngest age pre-classified as eligible.
    pub minimum_age: u32,
    /// Highest household income pre-classified as eligible.
    pub income_ceiling: u64,
    /// Alert the applicant when an evaluator decides.
    pub notify_on_decision: bool,
    pub inbox_poll_interval: Duration,
}

impl Default for PortalPolicy {
    fn default() -> Self {
        Self {
            max_applications: 3,
            minimum_age: 15,
            income_ceiling: 1_000_000,
            notify_on_decision: false,
            inbox_poll_interval: Duration::from_secs(30),
        }
    }
}
