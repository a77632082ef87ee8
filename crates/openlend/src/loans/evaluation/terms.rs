use super::super::domain::{LoanDuration, LoanTerms};
use super::config::EvaluationConfig;

/// Rate tier for a score, or `None` when the score does not qualify for terms.
pub(crate) fn rate_for(score: u8, config: &EvaluationConfig) -> Option<f64> {
    if score > config.auto_approve_above {
        Some(config.auto_approve_rate)
    } else if score > config.soft_approve_above {
        Some(config.soft_approve_rate)
    } else {
        None
    }
}

/// Flat-fee quote: the monthly payment spreads the principal plus the fee evenly and total
/// interest is the fee prorated per year. Kept as-is for compatibility with quoted offers.
pub(crate) fn quote(
    score: u8,
    amount: f64,
    duration: LoanDuration,
    config: &EvaluationConfig,
) -> Option<LoanTerms> {
    let rate = rate_for(score, config)?;
    let months = f64::from(duration.months());
    let amount = super::rules::non_negative(amount);

    let monthly_payment = whole_units(amount / months * (1.0 + config.flat_fee_rate));
    let total_interest = whole_units(amount * config.flat_fee_rate * (months / 12.0));

    Some(LoanTerms {
        rate,
        monthly_payment,
        total_interest,
    })
}

/// Rounds to whole currency units, saturating at `u64::MAX`.
fn whole_units(value: f64) -> u64 {
    value.round() as u64
}
