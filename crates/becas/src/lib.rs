//! Scholarship portal workflows built on a generic REST record store.
//!
//! Applicants apply through [`workflows::scholarships::ApplicationIntake`], evaluators decide
//! through [`workflows::scholarships::EvaluationGate`], and administrators manage the catalog,
//! evaluator accounts, and reporting. Every operation receives an explicit
//! [`workflows::scholarships::Session`].

pub mod config;
pub mod error;
pub mod records;
pub mod telemetry;
pub mod workflows;
