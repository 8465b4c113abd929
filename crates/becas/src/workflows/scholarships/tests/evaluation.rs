use super::common::*;
use std::sync::Arc;
use std::thread;

use crate::records::{Collection, RecordStoreExt};
use crate::workflows::scholarships::{
    Application, ApplicationId, ApplicationStatus, Decision, NotificationCategory, PortalError,
    PortalPolicy, QueueFilter, ReviewView, RuleViolation, ScholarshipPortal, ScholarshipStatus,
    ScoreSheet, ValidationError,
};

fn sheet(economic: u8, academic: u8, social: u8) -> ScoreSheet {
    ScoreSheet {
        economic,
        academic,
        social,
        observations: "  Strong household need  ".to_string(),
    }
}

#[test]
fn approval_attaches_the_evaluation_once() {
    let (portal, store) = build_portal();
    let reviewer = evaluator(store.as_ref());
    let stem = seed_scholarship(store.as_ref(), "STEM", ScholarshipStatus::Open);
    seed_application(
        store.as_ref(),
        "42",
        "a@x.com",
        &stem,
        ApplicationStatus::Eligible,
        at(1, 9),
    );
    let id = ApplicationId::new("42");

    let decided = portal
        .gate()
        .decide(&reviewer, &id, Decision::Approve, &sheet(35, 25, 20))
        .expect("first decision applies");
    assert_eq!(decided.status, ApplicationStatus::Approved);

    let stored: Application = store
        .get_as(Collection::Applications, "42")
        .expect("readable")
        .expect("present");
    assert_eq!(stored.status, ApplicationStatus::Approved);
    let evaluation = stored.evaluation.expect("evaluation attached");
    assert_eq!(evaluation.total, 80);
    assert_eq!(evaluation.evaluator, "Eva Solis");
    assert_eq!(evaluation.observations, "Strong household need");

    match portal.gate().open(&reviewer, &id).expect("opens") {
        ReviewView::Locked { message, .. } => assert_eq!(
            message,
            "this application has already been approved and cannot be modified"
        ),
        other => panic!("expected locked view, got {other:?}"),
    }

    match portal
        .gate()
        .decide(&reviewer, &id, Decision::Reject, &sheet(1, 1, 1))
    {
        Err(PortalError::Rejected(RuleViolation::AlreadyDecided { status })) => {
            assert_eq!(status, ApplicationStatus::Approved)
        }
        other => panic!("expected already decided, got {other:?}"),
    }

    let unchanged: Application = store
        .get_as(Collection::Applications, "42")
        .expect("readable")
        .expect("present");
    assert_eq!(unchanged.status, ApplicationStatus::Approved);
    assert_eq!(unchanged.evaluation.map(|evaluation| evaluation.total), Some(80));
}

#[test]
fn open_applications_are_offered_for_scoring() {
    let (portal, store) = build_portal();
    let reviewer = evaluator(store.as_ref());
    let stem = seed_scholarship(store.as_ref(), "STEM", ScholarshipStatus::Open);
    seed_application(
        store.as_ref(),
        "7",
        "a@x.com",
        &stem,
        ApplicationStatus::Ineligible,
        at(1, 9),
    );

    let view = portal
        .gate()
        .open(&reviewer, &ApplicationId::new("7"))
        .expect("opens");
    assert!(!view.is_locked());
    assert_eq!(view.application().status, ApplicationStatus::Ineligible);
}

#[test]
fn scores_over_the_cap_leave_the_record_untouched() {
    let (portal, store) = build_portal();
    let reviewer = evaluator(store.as_ref());
    let stem = seed_scholarship(store.as_ref(), "STEM", ScholarshipStatus::Open);
    seed_application(
        store.as_ref(),
        "42",
        "a@x.com",
        &stem,
        ApplicationStatus::Eligible,
        at(1, 9),
    );

    let result = portal.gate().decide(
        &reviewer,
        &ApplicationId::new("42"),
        Decision::Approve,
        &sheet(40, 31, 0),
    );
    assert!(matches!(
        result,
        Err(PortalError::Validation(ValidationError::ScoreOutOfRange { max: 30, found: 31, .. }))
    ));

    let stored: Application = store
        .get_as(Collection::Applications, "42")
        .expect("readable")
        .expect("present");
    assert_eq!(stored.status, ApplicationStatus::Eligible);
    assert!(stored.evaluation.is_none());
}

#[test]
fn applicants_cannot_review_or_decide() {
    let (portal, store) = build_portal();
    let session = applicant(store.as_ref());
    let id = ApplicationId::new("42");

    assert!(matches!(
        portal.gate().open(&session, &id),
        Err(PortalError::AccessDenied(_))
    ));
    assert!(matches!(
        portal
            .gate()
            .decide(&session, &id, Decision::Approve, &sheet(1, 1, 1)),
        Err(PortalError::AccessDenied(_))
    ));
}

#[test]
fn missing_applications_are_not_found() {
    let (portal, store) = build_portal();
    let reviewer = admin(store.as_ref());
    let id = ApplicationId::new("404");

    assert!(matches!(
        portal.gate().open(&reviewer, &id),
        Err(PortalError::NotFound { .. })
    ));
    assert!(matches!(
        portal
            .gate()
            .decide(&reviewer, &id, Decision::Reject, &sheet(1, 1, 1)),
        Err(PortalError::NotFound { .. })
    ));
}

#[test]
fn decisions_do_not_notify_by_default() {
    let (portal, store) = build_portal();
    let reviewer = evaluator(store.as_ref());
    let stem = seed_scholarship(store.as_ref(), "STEM", ScholarshipStatus::Open);
    seed_application(
        store.as_ref(),
        "42",
        "a@x.com",
        &stem,
        ApplicationStatus::Eligible,
        at(1, 9),
    );

    portal
        .gate()
        .decide(&reviewer, &ApplicationId::new("42"), Decision::Approve, &sheet(10, 10, 10))
        .expect("decides");
    assert!(store.is_empty(Collection::Notifications));
}

#[test]
fn decisions_notify_the_applicant_when_enabled() {
    let (portal, store) = build_portal_with(PortalPolicy {
        notify_on_decision: true,
        ..PortalPolicy::default()
    });
    let reviewer = evaluator(store.as_ref());
    let session = applicant(store.as_ref());
    let stem = seed_scholarship(store.as_ref(), "STEM", ScholarshipStatus::Open);
    seed_application(
        store.as_ref(),
        "42",
        "a@x.com",
        &stem,
        ApplicationStatus::Eligible,
        at(1, 9),
    );

    portal
        .gate()
        .decide(&reviewer, &ApplicationId::new("42"), Decision::Reject, &sheet(5, 5, 5))
        .expect("decides");

    let inbox = portal.notifications().inbox(&session).expect("inbox");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].category, NotificationCategory::Warning);
    assert!(inbox[0].message.contains("STEM"));
    assert!(inbox[0].message.contains("Rechazada"));
    assert!(!inbox[0].read);
}

#[test]
fn notification_failures_do_not_undo_the_decision() {
    let store = Arc::new(NotificationOutageStore::default());
    let portal = ScholarshipPortal::new(
        store.clone(),
        PortalPolicy {
            notify_on_decision: true,
            ..PortalPolicy::default()
        },
    );
    let reviewer = evaluator(store.as_ref());
    let stem = seed_scholarship(store.as_ref(), "STEM", ScholarshipStatus::Open);
    seed_application(
        store.as_ref(),
        "42",
        "a@x.com",
        &stem,
        ApplicationStatus::Eligible,
        at(1, 9),
    );

    let decided = portal
        .gate()
        .decide(&reviewer, &ApplicationId::new("42"), Decision::Approve, &sheet(10, 10, 10))
        .expect("decision survives notification outage");
    assert_eq!(decided.status, ApplicationStatus::Approved);
}

#[test]
fn concurrent_decisions_apply_exactly_once() {
    let (portal, store) = build_portal();
    let reviewer = evaluator(store.as_ref());
    let stem = seed_scholarship(store.as_ref(), "STEM", ScholarshipStatus::Open);
    seed_application(
        store.as_ref(),
        "42",
        "a@x.com",
        &stem,
        ApplicationStatus::Eligible,
        at(1, 9),
    );
    let id = ApplicationId::new("42");

    let outcomes: Vec<Result<Application, PortalError>> = thread::scope(|scope| {
        let handles: Vec<_> = [Decision::Approve, Decision::Reject]
            .into_iter()
            .cycle()
            .take(8)
            .map(|decision| {
                let portal = &portal;
                let reviewer = &reviewer;
                let id = &id;
                scope.spawn(move || portal.gate().decide(reviewer, id, decision, &sheet(10, 10, 10)))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("decision thread"))
            .collect()
    });

    let applied = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(applied, 1);
    assert!(outcomes.iter().filter_map(|outcome| outcome.as_ref().err()).all(|err| matches!(
        err,
        PortalError::Rejected(RuleViolation::AlreadyDecided { .. })
    )));
}

#[test]
fn queue_groups_statuses_newest_first() {
    let (portal, store) = build_portal();
    let reviewer = evaluator(store.as_ref());
    let stem = seed_scholarship(store.as_ref(), "STEM", ScholarshipStatus::Open);
    let store_ref = store.as_ref();
    seed_application(store_ref, "1", "a@x.com", &stem, ApplicationStatus::Pending, at(1, 9));
    seed_application(store_ref, "2", "b@x.com", &stem, ApplicationStatus::Eligible, at(2, 9));
    seed_application(store_ref, "3", "c@x.com", &stem, ApplicationStatus::Ineligible, at(3, 9));
    seed_application(store_ref, "4", "d@x.com", &stem, ApplicationStatus::Approved, at(4, 9));
    seed_application(store_ref, "5", "e@x.com", &stem, ApplicationStatus::Rejected, at(5, 9));

    let ids = |filter| -> Vec<String> {
        portal
            .gate()
            .queue(&reviewer, filter)
            .expect("queue")
            .into_iter()
            .map(|application| application.id.to_string())
            .collect()
    };

    assert_eq!(ids(QueueFilter::All), vec!["5", "4", "3", "2", "1"]);
    assert_eq!(ids(QueueFilter::Pending), vec!["2", "1"]);
    assert_eq!(ids(QueueFilter::Approved), vec!["4"]);
    assert_eq!(ids(QueueFilter::Rejected), vec!["5", "3"]);
}
