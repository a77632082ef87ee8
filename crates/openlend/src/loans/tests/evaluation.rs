use super::common::*;
use crate::loans::domain::{EmploymentStatus, LoanDuration, LoanStatus};
use crate::loans::evaluation::{self, EvaluationConfig, EvaluationDecision, EvaluationEngine};
use crate::loans::ScoreFactor;

#[test]
fn scenario_a_scores_85_and_is_approved_at_lowest_rate() {
    let input = scenario_a_input();
    let engine = EvaluationEngine::default();

    let outcome = engine.evaluate(&input);

    assert_eq!(outcome.assessment.score, 85);
    assert_eq!(outcome.decision.status(), LoanStatus::Approved);
    let terms = outcome.decision.terms().expect("approved requests carry terms");
    assert_eq!(terms.rate, 3.8);
    assert_eq!(terms.monthly_payment, 433);
    assert_eq!(terms.total_interest, 200);
}

#[test]
fn scenario_b_scores_50_and_requests_documents() {
    let input = scenario_b_input();

    assert_eq!(evaluation::score(&input), 50);
    let decision = EvaluationEngine::default().decide(50, input.amount, input.duration);
    assert_eq!(decision, EvaluationDecision::RequestDocuments);
    assert_eq!(decision.status(), LoanStatus::ActionRequired);
    assert!(decision.terms().is_none());
}

#[test]
fn components_itemise_every_signal() {
    let assessment = EvaluationEngine::default().assess(&scenario_a_input());

    let points: Vec<(ScoreFactor, i16)> = assessment
        .components
        .iter()
        .map(|component| (component.factor, component.points))
        .collect();
    assert_eq!(
        points,
        vec![
            (ScoreFactor::LoanToIncome, 15),
            (ScoreFactor::ExpenseToIncome, 10),
            (ScoreFactor::Employment, 10),
            (ScoreFactor::AssetCoverage, 0),
            (ScoreFactor::BusinessPlan, 0),
        ]
    );
}

#[test]
fn score_is_capped_at_95() {
    let mut input = scenario_a_input();
    input.monthly_income = 100_000.0;
    input.monthly_expenses = 0.0;
    input.amount = 1_000.0;
    input.total_assets = 10_000.0;
    input.business_plan = "x".repeat(250);

    assert_eq!(evaluation::score(&input), 95);
}

#[test]
fn score_never_drops_below_floor() {
    let engine = EvaluationEngine::new(EvaluationConfig {
        base_score: -40,
        ..EvaluationConfig::default()
    });

    let assessment = engine.assess(&scenario_b_input());

    assert_eq!(assessment.score, 30);
}

#[test]
fn extreme_inputs_stay_within_bounds() {
    let mut input = scenario_b_input();
    for (income, expenses, amount, assets) in [
        (0.0, 0.0, 1e15, 0.0),
        (f64::NAN, 10.0, 5_000.0, f64::INFINITY),
        (-500.0, -200.0, -1.0, -9.0),
        (1e12, 0.0, 1e-9, 1e12),
    ] {
        input.monthly_income = income;
        input.monthly_expenses = expenses;
        input.amount = amount;
        input.total_assets = assets;
        let score = evaluation::score(&input);
        assert!((30..=95).contains(&score), "score {score} out of range");
    }
}

#[test]
fn zero_income_lands_in_worst_ratio_bands() {
    let mut input = scenario_a_input();
    input.monthly_income = 0.0;

    let assessment = EvaluationEngine::default().assess(&input);

    assert!(assessment
        .components
        .iter()
        .filter(|component| matches!(
            component.factor,
            ScoreFactor::LoanToIncome | ScoreFactor::ExpenseToIncome
        ))
        .all(|component| component.points == 0));
    assert_eq!(assessment.score, 60);
}

#[test]
fn scoring_is_deterministic() {
    let input = soft_approve_input();
    let first = EvaluationEngine::default().assess(&input);
    let second = EvaluationEngine::default().assess(&input);
    assert_eq!(first, second);
}

#[test]
fn smaller_loans_never_score_lower() {
    let mut input = scenario_a_input();
    input.total_assets = 12_000.0;
    let mut previous = 0;
    for amount in [60_000.0, 30_000.0, 20_000.0, 12_000.0, 7_000.0, 5_000.0, 1_000.0] {
        input.amount = amount;
        let score = evaluation::score(&input);
        assert!(
            score >= previous,
            "amount {amount} scored {score}, below {previous}"
        );
        previous = score;
    }
}

#[test]
fn employment_bonus_follows_status() {
    let mut input = scenario_b_input();
    let mut scores = Vec::new();
    for employment in [
        EmploymentStatus::FullTime,
        EmploymentStatus::SelfEmployed,
        EmploymentStatus::PartTime,
        EmploymentStatus::Freelancer,
        EmploymentStatus::Student,
    ] {
        input.employment = employment;
        scores.push(evaluation::score(&input));
    }
    assert_eq!(scores, vec![60, 55, 50, 50, 50]);
}

#[test]
fn plan_bonus_counts_characters_not_bytes() {
    let mut input = scenario_b_input();
    input.business_plan = "é".repeat(200);
    assert_eq!(evaluation::score(&input), 50);

    input.business_plan.push('é');
    assert_eq!(evaluation::score(&input), 55);
}

#[test]
fn explanation_for_scenario_a() {
    let input = scenario_a_input();
    let explanation = evaluation::explain(&input, 85);

    assert_eq!(
        explanation.strengths,
        vec!["Strong positive cash flow", "Stable employment status"]
    );
    assert_eq!(explanation.risks, vec!["Limited asset coverage"]);
}

#[test]
fn explanation_for_scenario_b() {
    let input = scenario_b_input();
    let explanation = evaluation::explain(&input, 50);

    assert!(explanation.strengths.is_empty());
    assert_eq!(
        explanation.risks,
        vec![
            "Tight budget margins",
            "Unemployment risk",
            "Limited asset coverage",
            "Below average credibility score",
        ]
    );
}

#[test]
fn below_average_risk_ignores_pricing_tier() {
    let engine = EvaluationEngine::new(EvaluationConfig {
        base_score: 30,
        soft_approve_above: 60,
        ..EvaluationConfig::default()
    });

    let assessment = engine.assess(&scenario_a_input());

    assert_eq!(assessment.score, 65);
    assert!(engine
        .decide(assessment.score, 5000.0, LoanDuration::Months12)
        .terms()
        .is_some());
    assert!(assessment
        .explanation
        .risks
        .iter()
        .any(|risk| risk == "Below average credibility score"));
}

#[test]
fn zero_expenses_are_not_a_tight_budget() {
    let mut input = scenario_b_input();
    input.monthly_expenses = 0.0;
    input.monthly_income = 0.0;

    let explanation = evaluation::explain(&input, 50);

    assert!(!explanation
        .risks
        .iter()
        .any(|risk| risk == "Tight budget margins"));
}

#[test]
fn well_covered_detailed_application_lists_every_strength() {
    let mut input = scenario_a_input();
    input.total_assets = 20_000.0;
    input.business_plan = "Expand the bakery with a second oven. ".repeat(8);

    let explanation = evaluation::explain(&input, 95);

    assert_eq!(
        explanation.strengths,
        vec![
            "Strong positive cash flow",
            "Stable employment status",
            "Sufficient asset coverage",
            "Detailed business plan provided",
        ]
    );
    assert!(explanation.risks.is_empty());
}

#[test]
fn oversized_amounts_saturate_quoted_terms() {
    let terms = evaluation::terms(85, 1e300, LoanDuration::Months12).expect("qualifies");

    assert_eq!(terms.monthly_payment, u64::MAX);
    assert_eq!(terms.total_interest, u64::MAX);
}

#[test]
fn terms_follow_three_tiers() {
    assert_eq!(
        evaluation::terms(81, 5000.0, LoanDuration::Months12).map(|t| t.rate),
        Some(3.8)
    );
    assert_eq!(
        evaluation::terms(80, 5000.0, LoanDuration::Months12).map(|t| t.rate),
        Some(4.5)
    );
    assert_eq!(
        evaluation::terms(71, 5000.0, LoanDuration::Months12).map(|t| t.rate),
        Some(4.5)
    );
    assert!(evaluation::terms(70, 5000.0, LoanDuration::Months12).is_none());
    assert!(evaluation::terms(30, 5000.0, LoanDuration::Months12).is_none());
}

#[test]
fn terms_use_flat_fee_approximation() {
    let terms = evaluation::terms(90, 8000.0, LoanDuration::Months24).expect("qualifies");
    // 8000 / 24 * 1.04 = 346.67; 8000 * 0.04 * 2 = 640
    assert_eq!(terms.monthly_payment, 347);
    assert_eq!(terms.total_interest, 640);

    let terms = evaluation::terms(75, 3000.0, LoanDuration::Months6).expect("qualifies");
    // 3000 / 6 * 1.04 = 520; 3000 * 0.04 * 0.5 = 60
    assert_eq!(terms.monthly_payment, 520);
    assert_eq!(terms.total_interest, 60);
}

#[test]
fn terms_exist_exactly_when_score_exceeds_seventy() {
    let engine = EvaluationEngine::default();
    for score in 30..=95u8 {
        let decision = engine.decide(score, 4000.0, LoanDuration::Months18);
        assert_eq!(decision.terms().is_some(), score > 70, "score {score}");
        assert_eq!(
            decision.status() == LoanStatus::ActionRequired,
            score <= 70,
            "score {score}"
        );
    }
}
