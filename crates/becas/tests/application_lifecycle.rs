use std::sync::Arc;

use becas::records::{Collection, MemoryRecordStore, RecordStore, RecordStoreExt};
use becas::workflows::scholarships::{
    AcademicDetails, Application, ApplicationForm, ApplicationId, ApplicationStatus, Decision,
    NotificationCategory, PersonalDetails, PortalError, PortalPolicy, Registration, ReviewView,
    RuleViolation, Scholarship, ScholarshipDraft, ScholarshipId, ScholarshipPortal,
    ScholarshipStatus, ScoreSheet, Session, SocioeconomicDetails,
};

const PASSWORD: &str = "Becas2026!";

struct Fixture {
    portal: ScholarshipPortal<MemoryRecordStore>,
    store: Arc<MemoryRecordStore>,
    admin: Session,
    evaluator: Session,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryRecordStore::new());
    let portal = ScholarshipPortal::new(store.clone(), PortalPolicy::default());

    store
        .create(
            Collection::Accounts,
            serde_json::json!({
                "name": "Admin",
                "email": "admin@becas.org",
                "password": PASSWORD,
                "role": "admin",
            }),
        )
        .expect("seed admin");
    let admin = portal
        .accounts()
        .login("admin@becas.org", PASSWORD)
        .expect("admin logs in");

    let evaluator_view = portal
        .accounts()
        .create_evaluator(
            &admin,
            &Registration {
                name: "Eva Solis".to_string(),
                email: "eva@becas.org".to_string(),
                password: PASSWORD.to_string(),
            },
        )
        .expect("creates evaluator");
    let evaluator = portal
        .accounts()
        .login(&evaluator_view.email, PASSWORD)
        .expect("evaluator logs in");

    Fixture {
        portal,
        store,
        admin,
        evaluator,
    }
}

fn publish(fixture: &Fixture, name: &str) -> Scholarship {
    fixture
        .portal
        .catalog()
        .create(
            &fixture.admin,
            &ScholarshipDraft {
                name: name.to_string(),
                description: format!("{name} tuition support"),
                requirements: "Enrolled student".to_string(),
                status: ScholarshipStatus::Open,
                image: None,
            },
        )
        .expect("publishes scholarship")
}

fn register(fixture: &Fixture, email: &str) -> Session {
    fixture
        .portal
        .accounts()
        .register(&Registration {
            name: "Ana Mora".to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .expect("registers applicant")
}

fn form(scholarship_id: &ScholarshipId, age: u32, income: &str) -> ApplicationForm {
    ApplicationForm {
        scholarship_id: scholarship_id.clone(),
        full_name: "Ana Mora".to_string(),
        national_id: "1-1111-1111".to_string(),
        age,
        education_level: "High school".to_string(),
        declared_income: income.to_string(),
        household_size: 3,
        motivation: "Study medicine".to_string(),
    }
}

#[test]
fn pre_classification_follows_age_and_income() {
    let fixture = fixture();
    let applicant = register(&fixture, "a@x.com");
    let first = publish(&fixture, "First");
    let second = publish(&fixture, "Second");

    let minor = fixture
        .portal
        .intake()
        .submit(&applicant, &form(&first.id, 14, "0"))
        .expect("submits");
    assert_eq!(minor.status, ApplicationStatus::Ineligible);
    assert_eq!(minor.status.label(), "No apta");

    let adult = fixture
        .portal
        .intake()
        .submit(&applicant, &form(&second.id, 20, "500000"))
        .expect("submits");
    assert_eq!(adult.status.label(), "Apta");
}

#[test]
fn evaluator_decides_once_and_the_view_locks() {
    let fixture = fixture();
    let scholarship = publish(&fixture, "STEM");
    let application = Application {
        id: ApplicationId::new("42"),
        applicant_email: "a@x.com".to_string(),
        applicant_name: "Ana Mora".to_string(),
        scholarship_id: scholarship.id.clone(),
        scholarship_name: scholarship.name.clone(),
        personal: PersonalDetails {
            full_name: "Ana Mora".to_string(),
            national_id: "1-1111-1111".to_string(),
            age: 20,
        },
        academic: AcademicDetails {
            education_level: "University".to_string(),
        },
        socioeconomic: SocioeconomicDetails {
            declared_income: "500000".to_string(),
            income: 500_000,
            household_size: 4,
        },
        motivation: "Finish my degree".to_string(),
        status: ApplicationStatus::Eligible,
        evaluation: None,
        submitted_at: chrono::Utc::now(),
    };
    fixture
        .store
        .create_as(Collection::Applications, &application)
        .expect("seeds application 42");

    let id = ApplicationId::new("42");
    let sheet = ScoreSheet {
        economic: 40,
        academic: 30,
        social: 25,
        observations: "Excellent record".to_string(),
    };
    fixture
        .portal
        .gate()
        .decide(&fixture.evaluator, &id, Decision::Approve, &sheet)
        .expect("approves");

    let fetched: Application = fixture
        .store
        .get_as(Collection::Applications, "42")
        .expect("reads")
        .expect("exists");
    assert_eq!(fetched.status.label(), "Aprobada");
    assert_eq!(fetched.evaluation.as_ref().map(|e| e.total), Some(95));

    let view = fixture
        .portal
        .gate()
        .open(&fixture.evaluator, &id)
        .expect("opens");
    assert!(matches!(view, ReviewView::Locked { .. }));

    let second = fixture
        .portal
        .gate()
        .decide(&fixture.evaluator, &id, Decision::Approve, &sheet);
    assert!(matches!(
        second,
        Err(PortalError::Rejected(RuleViolation::AlreadyDecided {
            status: ApplicationStatus::Approved
        }))
    ));
}

#[test]
fn fourth_application_is_refused_with_the_limit_message() {
    let fixture = fixture();
    let applicant = register(&fixture, "a@x.com");
    let scholarships: Vec<_> = ["A", "B", "C", "D"]
        .into_iter()
        .map(|name| publish(&fixture, name))
        .collect();

    for scholarship in &scholarships[..3] {
        fixture
            .portal
            .intake()
            .submit(&applicant, &form(&scholarship.id, 22, "300000"))
            .expect("within the limit");
    }
    let before = fixture.store.len(Collection::Applications);

    let err = fixture
        .portal
        .intake()
        .submit(&applicant, &form(&scholarships[3].id, 22, "300000"))
        .expect_err("limit reached");
    assert_eq!(err.to_string(), "you have reached the maximum of 3 applications");
    assert_eq!(fixture.store.len(Collection::Applications), before);
    assert_eq!(
        fixture
            .portal
            .intake()
            .history(&applicant)
            .expect("history")
            .len(),
        3
    );
}

#[test]
fn mark_all_read_leaves_nothing_unread() {
    let fixture = fixture();
    let applicant = register(&fixture, "a@x.com");
    let notifications = fixture.portal.notifications();
    for title in ["Submitted", "Under review", "Decided"] {
        notifications
            .notify(
                &applicant.email,
                title,
                "Status update",
                NotificationCategory::Info,
            )
            .expect("notifies");
    }
    assert_eq!(notifications.unread_count(&applicant).expect("count"), 3);

    let marked = notifications.mark_all_read(&applicant).expect("marks");
    assert_eq!(marked, 3);
    assert_eq!(notifications.unread_count(&applicant).expect("count"), 0);
}

#[test]
fn full_lifecycle_with_decision_notifications() {
    let store = Arc::new(MemoryRecordStore::new());
    let policy = PortalPolicy {
        notify_on_decision: true,
        ..PortalPolicy::default()
    };
    let portal = ScholarshipPortal::new(store.clone(), policy);
    store
        .create(
            Collection::Accounts,
            serde_json::json!({
                "name": "Eva",
                "email": "eva@becas.org",
                "password": PASSWORD,
                "role": "evaluator",
            }),
        )
        .expect("seed evaluator");
    store
        .create(
            Collection::Scholarships,
            serde_json::json!({
                "name": "STEM",
                "description": "Science",
                "status": "open",
            }),
        )
        .expect("seed scholarship");

    let applicant = portal
        .accounts()
        .register(&Registration {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            password: PASSWORD.to_string(),
        })
        .expect("registers");
    let evaluator = portal
        .accounts()
        .login("eva@becas.org", PASSWORD)
        .expect("logs in");
    let open = portal.catalog().list_open().expect("lists");

    let submitted = portal
        .intake()
        .submit(&applicant, &form(&open[0].id, 19, "₡400.000"))
        .expect("submits");
    portal
        .gate()
        .decide(
            &evaluator,
            &submitted.id,
            Decision::Reject,
            &ScoreSheet {
                economic: 10,
                academic: 10,
                social: 5,
                observations: String::new(),
            },
        )
        .expect("rejects");

    let history = portal.intake().history(&applicant).expect("history");
    assert_eq!(history[0].status, ApplicationStatus::Rejected);
    assert_eq!(
        portal
            .notifications()
            .unread_count(&applicant)
            .expect("count"),
        1
    );
}
