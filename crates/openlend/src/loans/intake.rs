use super::domain::{ApplicationForm, ApplicationInput, EmploymentStatus, LoanDuration};

/// Validation errors raised before a loan request is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
    #[error("requested amount must be a positive number")]
    InvalidAmount,
    #[error("unsupported loan duration: {0}")]
    InvalidDuration(String),
    #[error("unrecognized employment status: {0}")]
    InvalidEmployment(String),
    #[error("field `{0}` must be a non-negative number")]
    InvalidNumber(&'static str),
    #[error("email address is not valid")]
    InvalidEmail,
}

/// Guard responsible for admitting applications into the lifecycle.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn new() -> Self {
        Self
    }

    /// Check the required fields of a typed application.
    pub fn validate(&self, input: &ApplicationInput) -> Result<(), ValidationError> {
        require("name", &input.name)?;
        require("email", &input.email)?;
        require("phone", &input.phone)?;
        require("location", &input.location)?;
        require("reason", &input.reason)?;

        if !input.email.contains('@') {
            return Err(ValidationError::InvalidEmail);
        }

        if !input.amount.is_finite() || input.amount <= 0.0 {
            return Err(ValidationError::InvalidAmount);
        }

        for (field, value) in [
            ("monthly_income", input.monthly_income),
            ("monthly_expenses", input.monthly_expenses),
            ("total_assets", input.total_assets),
            ("existing_debts", input.existing_debts),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidNumber(field));
            }
        }

        Ok(())
    }

    /// Convert a raw form into a validated [`ApplicationInput`].
    ///
    /// Numeric fields that do not parse count as zero, so a garbled income is scored as no
    /// income rather than rejected. Blank assets and debts default to zero and a blank
    /// duration to twelve months.
    pub fn admit(&self, form: ApplicationForm) -> Result<ApplicationInput, ValidationError> {
        require("name", &form.name)?;
        require("email", &form.email)?;
        require("phone", &form.phone)?;
        require("location", &form.location)?;
        require("amount", &form.amount)?;
        require("reason", &form.reason)?;
        require("employment", &form.employment)?;
        require("income", &form.income)?;
        require("expenses", &form.expenses)?;

        let duration = if form.duration.trim().is_empty() {
            LoanDuration::default()
        } else {
            form.duration
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(|months| LoanDuration::try_from(months).ok())
                .ok_or_else(|| ValidationError::InvalidDuration(form.duration.trim().to_string()))?
        };

        let employment = form
            .employment
            .parse::<EmploymentStatus>()
            .map_err(ValidationError::InvalidEmployment)?;

        let input = ApplicationInput {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            location: form.location.trim().to_string(),
            amount: lenient_number(&form.amount),
            duration,
            reason: form.reason.trim().to_string(),
            employment,
            monthly_income: lenient_number(&form.income),
            monthly_expenses: lenient_number(&form.expenses),
            total_assets: lenient_number(&form.assets),
            existing_debts: lenient_number(&form.debts),
            business_plan: form.business_plan,
        };

        self.validate(&input)?;
        Ok(input)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Parse a form number, tolerating currency symbols and thousands separators.
/// Anything unparseable, negative, or non-finite is zero.
pub(crate) fn lenient_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|ch| *ch != ',' && *ch != '_')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}
