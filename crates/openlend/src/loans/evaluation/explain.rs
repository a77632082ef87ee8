use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicationInput, EmploymentStatus};
use super::config::EvaluationConfig;
use super::rules::{plan_length, Financials};

/// Human-readable strengths and risks, in rule declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub strengths: Vec<String>,
    pub risks: Vec<String>,
}

pub(crate) fn explain_application(
    input: &ApplicationInput,
    score: u8,
    config: &EvaluationConfig,
) -> Explanation {
    let financials = Financials::from_input(input);
    let mut strengths = Vec::new();
    let mut risks = Vec::new();

    if financials.income > financials.expenses * 1.5 {
        strengths.push("Strong positive cash flow".to_string());
    }
    if input.employment == EmploymentStatus::FullTime {
        strengths.push("Stable employment status".to_string());
    }
    if financials.assets > financials.amount {
        strengths.push("Sufficient asset coverage".to_string());
    }
    if plan_length(input) > config.detailed_plan_chars {
        strengths.push("Detailed business plan provided".to_string());
    }

    // Zero expenses means an unbounded margin.
    if financials.expenses > 0.0 && financials.income / financials.expenses < 1.2 {
        risks.push("Tight budget margins".to_string());
    }
    if input.employment == EmploymentStatus::Unemployed {
        risks.push("Unemployment risk".to_string());
    }
    if financials.assets < financials.amount * 0.5 {
        risks.push("Limited asset coverage".to_string());
    }
    if score < config.below_average_under {
        risks.push("Below average credibility score".to_string());
    }

    Explanation { strengths, risks }
}
