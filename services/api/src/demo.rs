use becas::config::AppConfig;
use becas::error::AppError;
use becas::records::{Collection, MemoryRecordStore, RecordStore};
use becas::workflows::scholarships::{
    spawn_inbox_poller, ApplicationForm, Decision, InboxSnapshot, PortalError, PortalPolicy,
    Registration, ScholarshipDraft, ScholarshipPortal, ScholarshipStatus, ScoreSheet, Session,
};
use clap::{Args, ValueEnum};
use serde_json::json;
use std::sync::Arc;

const DEMO_PASSWORD: &str = "Becas2026!";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Announce evaluator decisions in the applicant's mailbox.
    #[arg(long)]
    pub(crate) notify_on_decision: bool,
    /// Print the CSV export at the end of the walkthrough.
    #[arg(long)]
    pub(crate) export: bool,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum ReportFormat {
    #[default]
    Text,
    Csv,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Administrator account requesting the report
    #[arg(long)]
    pub(crate) email: String,
    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub(crate) format: ReportFormat,
}

#[derive(Args, Debug)]
pub(crate) struct InboxArgs {
    /// Account whose mailbox is shown
    #[arg(long)]
    pub(crate) email: String,
    /// Keep polling on the configured interval until interrupted
    #[arg(long)]
    pub(crate) watch: bool,
}

/// Walk one applicant through intake, evaluation and notifications on an in-memory store.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        notify_on_decision,
        export,
    } = args;

    let store = Arc::new(MemoryRecordStore::new());
    let policy = PortalPolicy {
        notify_on_decision,
        ..PortalPolicy::default()
    };
    let portal = ScholarshipPortal::new(store.clone(), policy);

    println!("Scholarship portal demo");
    let admin = seed_admin(&portal, store.as_ref())?;
    let evaluator_view = portal.accounts().create_evaluator(
        &admin,
        &Registration {
            name: "Eva Solis".to_string(),
            email: "eva@becas.org".to_string(),
            password: DEMO_PASSWORD.to_string(),
        },
    )?;
    let evaluator = portal
        .accounts()
        .login(&evaluator_view.email, DEMO_PASSWORD)?;
    println!("- admin {} created evaluator {}", admin.email, evaluator.email);

    let mut published = Vec::new();
    for (name, description) in [
        ("STEM Excellence", "Tuition for science and engineering students"),
        ("Rural Access", "Transport and lodging support"),
        ("Arts Fund", "Materials for visual arts programs"),
        ("Language Exchange", "Semester abroad stipend"),
    ] {
        let scholarship = portal.catalog().create(
            &admin,
            &ScholarshipDraft {
                name: name.to_string(),
                description: description.to_string(),
                requirements: "Active enrollment".to_string(),
                status: ScholarshipStatus::Open,
                image: None,
            },
        )?;
        published.push(scholarship);
    }
    println!("- published {} scholarships", published.len());

    let applicant = portal.accounts().register(&Registration {
        name: "Ana Mora".to_string(),
        email: "ana@example.com".to_string(),
        password: DEMO_PASSWORD.to_string(),
    })?;
    println!("- applicant {} registered", applicant.email);

    let profiles = [(19, "₡450.000"), (14, "200000"), (22, "1.500.000")];
    let mut submitted = Vec::new();
    for (scholarship, (age, income)) in published.iter().zip(profiles) {
        let application = portal.intake().submit(
            &applicant,
            &ApplicationForm {
                scholarship_id: scholarship.id.clone(),
                full_name: "Ana Mora".to_string(),
                national_id: "1-1111-1111".to_string(),
                age,
                education_level: "High school".to_string(),
                declared_income: income.to_string(),
                household_size: 4,
                motivation: "Continue my studies".to_string(),
            },
        )?;
        println!(
            "  submitted {} -> {}",
            application.scholarship_name, application.status
        );
        submitted.push(application);
    }

    if let Some(extra) = published.last() {
        let entry = portal.intake().check_entry(&applicant);
        match entry {
            Ok(entry) => println!("  {} applications left", entry.remaining),
            Err(err) => println!("  cannot apply to {}: {err}", extra.name),
        }
    }

    for entry in portal.catalog().catalog_for(&applicant)? {
        println!(
            "  catalog: {} ({:?})",
            entry.scholarship.name, entry.availability
        );
    }

    let decisions = [Decision::Approve, Decision::Reject];
    for (application, decision) in submitted.iter().zip(decisions) {
        let sheet = ScoreSheet {
            economic: 32,
            academic: 25,
            social: 20,
            observations: "Reviewed during demo".to_string(),
        };
        let decided = portal
            .gate()
            .decide(&evaluator, &application.id, decision, &sheet)?;
        println!(
            "- evaluator set {} to {} (score {})",
            decided.scholarship_name,
            decided.status,
            decided.evaluation.as_ref().map_or(0, |e| e.total)
        );
    }
    if let Some(first) = submitted.first() {
        let view = portal.gate().open(&evaluator, &first.id)?;
        println!("  reopening {}: locked = {}", first.id, view.is_locked());
    }

    let inbox = portal.notifications().snapshot(&applicant)?;
    print_inbox(&applicant, &inbox);

    let summary = portal.reports().dashboard(&admin)?;
    println!("\nDashboard\n{summary}");

    if export {
        let rows = portal.reports().export_csv(&admin, std::io::stdout().lock())?;
        println!("({rows} rows exported)");
    }

    Ok(())
}

fn seed_admin(
    portal: &ScholarshipPortal<MemoryRecordStore>,
    store: &MemoryRecordStore,
) -> Result<Session, AppError> {
    store
        .create(
            Collection::Accounts,
            json!({
                "name": "Portal Admin",
                "email": "admin@becas.org",
                "password": DEMO_PASSWORD,
                "role": "admin",
            }),
        )
        .map_err(PortalError::from)?;
    Ok(portal.accounts().login("admin@becas.org", DEMO_PASSWORD)?)
}

/// Render the dashboard or the CSV export for an administrator.
pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    tokio::task::spawn_blocking(move || {
        let store = crate::infra::build_store(&config.store)?;
        let portal = ScholarshipPortal::new(store, config.policy);
        let session = portal.accounts().resolve(&args.email)?;

        match args.format {
            ReportFormat::Text => {
                let summary = portal.reports().dashboard(&session)?;
                print!("{summary}");
                println!("Generated at {}", summary.generated_at.to_rfc3339());
            }
            ReportFormat::Csv => {
                portal
                    .reports()
                    .export_csv(&session, std::io::stdout().lock())?;
            }
        }
        Ok::<(), AppError>(())
    })
    .await?
}

/// Print a mailbox once, or follow it until ctrl-c.
pub(crate) async fn run_inbox(args: InboxArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let interval = config.policy.inbox_poll_interval;
    let store_config = config.store.clone();
    let policy = config.policy.clone();
    let email = args.email.clone();

    let (portal, session) = tokio::task::spawn_blocking(move || {
        let store = crate::infra::build_store(&store_config)?;
        let portal = ScholarshipPortal::new(store, policy);
        let session = portal.accounts().resolve(&email)?;
        Ok::<_, AppError>((portal, session))
    })
    .await??;

    if !args.watch {
        let center = portal.notifications().clone();
        let shown = session.clone();
        let snapshot = tokio::task::spawn_blocking(move || center.snapshot(&shown)).await??;
        print_inbox(&session, &snapshot);
        return Ok(());
    }

    let poller = spawn_inbox_poller(portal.notifications().clone(), session.clone(), interval);
    let mut updates = poller.subscribe();
    println!(
        "watching {} every {}s, ctrl-c to stop",
        session.email,
        interval.as_secs()
    );
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_inbox(&session, &snapshot);
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }
    drop(poller);
    Ok(())
}

fn print_inbox(session: &Session, inbox: &InboxSnapshot) {
    println!("\nMailbox for {} ({} unread)", session.email, inbox.unread);
    for item in &inbox.items {
        let marker = if item.read { " " } else { "*" };
        println!(
            "{marker} [{}] {} - {}",
            item.created_at.format("%Y-%m-%d %H:%M"),
            item.title,
            item.message
        );
    }
}
