use super::super::domain::ApplicationStatus;
use super::super::policy::PortalPolicy;

/// Advisory status shown to evaluators; it never blocks a submission.
pub fn pre_classify(age: u32, income: u64, policy: &PortalPolicy) -> ApplicationStatus {
    if age < policy.minimum_age || income > policy.income_ceiling {
        ApplicationStatus::Ineligible
    } else {
        ApplicationStatus::Eligible
    }
}

/// Numeric value of a declared income such as `"₡850.000"`.
///
/// Only ASCII digits are kept; text without digits reads as zero and oversized values
/// saturate.
pub fn parse_income(raw: &str) -> u64 {
    raw.chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0u64, |total, digit| {
            total.saturating_mul(10).saturating_add(u64::from(digit))
        })
}
