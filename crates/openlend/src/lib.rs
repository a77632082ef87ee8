//! Scoring and lifecycle engine behind the OpenLend borrower experience.
//!
//! The [`loans`] module holds the domain: intake validation, the credibility score, the
//! terms calculator, follow-up action tracking, and the lifecycle service that moves a
//! loan request from `reviewing` to its evaluated status.

pub mod config;
pub mod error;
pub mod loans;
pub mod telemetry;
