mod config;
mod explain;
mod policy;
mod rules;
mod terms;

pub use config::EvaluationConfig;
pub use explain::Explanation;
pub use policy::EvaluationDecision;
pub use rules::{ScoreComponent, ScoreFactor};

use super::domain::{ApplicationInput, LoanDuration, LoanTerms};
use serde::{Deserialize, Serialize};

/// Stateless evaluator applying the scoring rubric and pricing tiers.
#[derive(Debug, Clone, Default)]
pub struct EvaluationEngine {
    config: EvaluationConfig,
}

impl EvaluationEngine {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Score and explain an application. Runs synchronously at submission.
    pub fn assess(&self, input: &ApplicationInput) -> Assessment {
        let (components, score) = rules::score_application(input, &self.config);
        let explanation = explain::explain_application(input, score, &self.config);

        Assessment {
            score,
            components,
            explanation,
        }
    }

    /// Map a score onto the lifecycle decision for the requested amount and duration.
    pub fn decide(&self, score: u8, amount: f64, duration: LoanDuration) -> EvaluationDecision {
        policy::decide_outcome(score, amount, duration, &self.config)
    }

    /// Full evaluation in one pass, used for previews that never touch a store.
    pub fn evaluate(&self, input: &ApplicationInput) -> EvaluationOutcome {
        let assessment = self.assess(input);
        let decision = self.decide(assessment.score, input.amount, input.duration);
        EvaluationOutcome {
            assessment,
            decision,
        }
    }
}

/// Synchronous scoring output stored on the record at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub score: u8,
    pub components: Vec<ScoreComponent>,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    #[serde(flatten)]
    pub assessment: Assessment,
    #[serde(flatten)]
    pub decision: EvaluationDecision,
}

/// Credibility score in `30..=95` using the default rubric.
pub fn score(input: &ApplicationInput) -> u8 {
    rules::score_application(input, &EvaluationConfig::default()).1
}

/// Strength and risk factors for an application and its score using the default rubric.
pub fn explain(input: &ApplicationInput, score: u8) -> Explanation {
    explain::explain_application(input, score, &EvaluationConfig::default())
}

/// Quoted terms for a score, or `None` when the score does not qualify.
pub fn terms(score: u8, amount: f64, duration: LoanDuration) -> Option<LoanTerms> {
    terms::quote(score, amount, duration, &EvaluationConfig::default())
}
