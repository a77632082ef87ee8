use serde::{Deserialize, Serialize};

/// Scoring and pricing dials. `Default` carries the production constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub base_score: i16,
    pub min_score: u8,
    pub max_score: u8,
    /// Scores strictly above this are approved outright.
    pub auto_approve_above: u8,
    /// Scores strictly above this (and at most `auto_approve_above`) receive a soft approval.
    pub soft_approve_above: u8,
    /// Scores strictly below this are flagged as a risk in the explanation.
    pub below_average_under: u8,
    pub auto_approve_rate: f64,
    pub soft_approve_rate: f64,
    pub flat_fee_rate: f64,
    pub detailed_plan_chars: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            base_score: 50,
            min_score: 30,
            max_score: 95,
            auto_approve_above: 80,
            soft_approve_above: 70,
            below_average_under: 70,
            auto_approve_rate: 3.8,
            soft_approve_rate: 4.5,
            flat_fee_rate: 0.04,
            detailed_plan_chars: 200,
        }
    }
}
