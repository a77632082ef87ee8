use crate::infra::LoggingNotifier;
use chrono::Utc;
use clap::Args;
use openlend::config::LendingConfig;
use openlend::error::AppError;
use openlend::loans::{
    ActionSort, ApplicationForm, ApplicationInput, EmploymentStatus, EvaluationConfig,
    EvaluationEngine, InMemoryLoanRequestStore, IntakeGuard, LoanDuration, LoanLifecycleService,
    LoanRequest, LoanServiceError, LoanStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Delay before each application is evaluated, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub(crate) delay_ms: u64,
    /// Stop after the evaluation step instead of completing the document request.
    #[arg(long)]
    pub(crate) skip_follow_up: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Path to a JSON application form
    #[arg(long)]
    pub(crate) file: PathBuf,
}

const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        delay_ms,
        skip_follow_up,
    } = args;

    let notifier = Arc::new(LoggingNotifier::default());
    let service = Arc::new(LoanLifecycleService::new(
        Arc::new(InMemoryLoanRequestStore::default()),
        notifier.clone(),
        EvaluationConfig::default(),
        LendingConfig {
            evaluation_delay: Duration::from_millis(delay_ms),
            ..LendingConfig::default()
        },
    ));

    println!("OpenLend lifecycle demo (evaluation delay {delay_ms} ms)");

    let mut decided = Vec::new();
    for (label, input) in [
        ("Scenario A: steady income", steady_applicant()),
        ("Scenario B: tight budget", tight_budget_applicant()),
    ] {
        let submitted = service.submit(input)?;
        println!(
            "\n{label}\n- submitted {} | score {} | status {}",
            submitted.id,
            submitted.score.unwrap_or_default(),
            submitted.status
        );
        service.schedule_evaluation(&submitted.id)?;
        decided.push(submitted.id);
    }

    let wait = Duration::from_millis(delay_ms) + POLL_INTERVAL * 40;
    let deadline = tokio::time::Instant::now() + wait;
    for loan_id in &decided {
        loop {
            let request = service.get(loan_id)?;
            if request.status != LoanStatus::Reviewing {
                render_request(&request);
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                println!("- {loan_id} still under review; giving up");
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    if !skip_follow_up {
        for loan_id in &decided {
            for action in service.list_outstanding(loan_id, ActionSort::Priority)? {
                let documents = action.required_documents.clone().unwrap_or_default();
                let name = documents
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "supporting-document.pdf".to_string());
                let request = service.upload_document(loan_id, &action.id, &name)?;
                println!("\nUploaded '{name}' for {}", action.id);
                render_request(&request);
            }
            let summary = service.action_summary(loan_id, Utc::now())?;
            println!(
                "  actions for {loan_id}: {} pending | {} overdue | {} completed",
                summary.pending, summary.overdue, summary.completed
            );
        }
    }

    println!("\nNotifications sent");
    for notification in notifier.drain() {
        println!(
            "- {} -> {} ({})",
            notification.template, notification.borrower, notification.loan_id
        );
    }

    service.shutdown();
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.file)?;
    let form: ApplicationForm = serde_json::from_str(&raw)?;
    let input = IntakeGuard::new()
        .admit(form)
        .map_err(LoanServiceError::from)?;

    let outcome = EvaluationEngine::default().evaluate(&input);
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn render_request(request: &LoanRequest) {
    println!(
        "- {} | {} | score {}",
        request.id,
        request.status,
        request.score.unwrap_or_default()
    );
    match request.terms {
        Some(terms) => println!(
            "  terms: {:.1}% | ${} per month | ${} total interest",
            terms.rate, terms.monthly_payment, terms.total_interest
        ),
        None => println!("  terms: none quoted"),
    }
    if !request.strength_factors.is_empty() {
        println!("  strengths: {}", request.strength_factors.join(", "));
    }
    if !request.risk_factors.is_empty() {
        println!("  risks: {}", request.risk_factors.join(", "));
    }
    for action in &request.pending_actions {
        let state = if action.completed { "done" } else { "open" };
        let due = action
            .due_date
            .map(|due| format!(", due {}", due.format("%Y-%m-%d")))
            .unwrap_or_default();
        println!(
            "  [{state}] {} ({:?} priority{due})",
            action.title, action.priority
        );
    }
    if let Some(feedback) = &request.feedback {
        println!("  feedback: {feedback}");
    }
}

fn steady_applicant() -> ApplicationInput {
    ApplicationInput {
        name: "Amara Okafor".to_string(),
        email: "amara@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        location: "Lagos".to_string(),
        amount: 5000.0,
        duration: LoanDuration::Months12,
        reason: "Small business expansion".to_string(),
        employment: EmploymentStatus::FullTime,
        monthly_income: 3000.0,
        monthly_expenses: 1000.0,
        total_assets: 0.0,
        existing_debts: 0.0,
        business_plan: String::new(),
    }
}

fn tight_budget_applicant() -> ApplicationInput {
    ApplicationInput {
        name: "Diego Ramos".to_string(),
        email: "diego@example.com".to_string(),
        phone: "+1 555 0101".to_string(),
        location: "Quito".to_string(),
        amount: 8000.0,
        duration: LoanDuration::Months24,
        reason: "Medical emergency".to_string(),
        employment: EmploymentStatus::Unemployed,
        monthly_income: 1000.0,
        monthly_expenses: 900.0,
        total_assets: 0.0,
        existing_debts: 0.0,
        business_plan: String::new(),
    }
}
