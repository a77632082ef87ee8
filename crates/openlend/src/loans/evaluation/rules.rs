use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicationInput, EmploymentStatus};
use super::config::EvaluationConfig;

/// Signals contributing to the credibility score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    LoanToIncome,
    ExpenseToIncome,
    Employment,
    AssetCoverage,
    BusinessPlan,
}

/// Discrete contribution to a score, kept on the record for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: i16,
    pub notes: String,
}

/// Sanitized numeric view of an application.
///
/// Non-finite and negative figures count as zero so a malformed field can never push a
/// ratio into a better band.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Financials {
    pub amount: f64,
    pub income: f64,
    pub expenses: f64,
    pub assets: f64,
}

impl Financials {
    pub fn from_input(input: &ApplicationInput) -> Self {
        Self {
            amount: non_negative(input.amount),
            income: non_negative(input.monthly_income),
            expenses: non_negative(input.monthly_expenses),
            assets: non_negative(input.total_assets),
        }
    }

    /// Loan amount over annual income; `None` when income is zero.
    pub fn loan_to_income(&self) -> Option<f64> {
        (self.income > 0.0).then(|| self.amount / (self.income * 12.0))
    }

    /// Monthly expenses over monthly income; `None` when income is zero.
    pub fn expense_to_income(&self) -> Option<f64> {
        (self.income > 0.0).then(|| self.expenses / self.income)
    }
}

pub(crate) fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub(crate) fn plan_length(input: &ApplicationInput) -> usize {
    input.business_plan.chars().count()
}

fn ratio_band(ratio: Option<f64>, bands: [(f64, i16); 3]) -> i16 {
    let Some(ratio) = ratio else {
        return 0;
    };
    bands
        .iter()
        .find(|(limit, _)| ratio < *limit)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

pub(crate) fn score_application(
    input: &ApplicationInput,
    config: &EvaluationConfig,
) -> (Vec<ScoreComponent>, u8) {
    let financials = Financials::from_input(input);
    let mut components = Vec::with_capacity(5);

    let loan_ratio = financials.loan_to_income();
    let points = ratio_band(loan_ratio, [(0.2, 15), (0.4, 10), (0.6, 5)]);
    components.push(ScoreComponent {
        factor: ScoreFactor::LoanToIncome,
        points,
        notes: match loan_ratio {
            Some(ratio) => format!("loan is {:.2}x annual income", ratio),
            None => "no declared income".to_string(),
        },
    });

    let expense_ratio = financials.expense_to_income();
    let points = ratio_band(expense_ratio, [(0.3, 15), (0.5, 10), (0.7, 5)]);
    components.push(ScoreComponent {
        factor: ScoreFactor::ExpenseToIncome,
        points,
        notes: match expense_ratio {
            Some(ratio) => format!("expenses consume {:.0}% of income", ratio * 100.0),
            None => "no declared income".to_string(),
        },
    });

    let points = match input.employment {
        EmploymentStatus::FullTime => 10,
        EmploymentStatus::SelfEmployed => 5,
        _ => 0,
    };
    components.push(ScoreComponent {
        factor: ScoreFactor::Employment,
        points,
        notes: format!("employment {}", input.employment.label()),
    });

    let (points, notes) = if financials.assets > financials.amount * 2.0 {
        (10, "assets exceed twice the loan amount")
    } else if financials.assets > financials.amount {
        (5, "assets exceed the loan amount")
    } else {
        (0, "assets do not cover the loan amount")
    };
    components.push(ScoreComponent {
        factor: ScoreFactor::AssetCoverage,
        points,
        notes: notes.to_string(),
    });

    let length = plan_length(input);
    let points = if length > config.detailed_plan_chars { 5 } else { 0 };
    components.push(ScoreComponent {
        factor: ScoreFactor::BusinessPlan,
        points,
        notes: format!("business plan of {length} characters"),
    });

    let raw = components
        .iter()
        .fold(config.base_score, |total, component| total + component.points);
    let score = raw.clamp(i16::from(config.min_score), i16::from(config.max_score)) as u8;

    (components, score)
}
