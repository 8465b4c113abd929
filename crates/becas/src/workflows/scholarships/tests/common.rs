use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::records::{
    Collection, ListQuery, MemoryRecordStore, Precondition, RecordStore, RecordStoreExt,
    StoreError, StoreErrorKind, StoreOperation,
};
use crate::workflows::scholarships::{
    portal_router, AcademicDetails, Account, AccountId, Application, ApplicationForm,
    ApplicationId, ApplicationStatus, Notification, NotificationCategory, NotificationId,
    PersonalDetails, PortalPolicy, Role, Scholarship, ScholarshipId, ScholarshipPortal,
    ScholarshipStatus, Session, SocioeconomicDetails, SESSION_HEADER,
};

pub(super) const PASSWORD: &str = "Becas2026!";

pub(super) fn build_portal() -> (ScholarshipPortal<MemoryRecordStore>, Arc<MemoryRecordStore>) {
    build_portal_with(PortalPolicy::default())
}

pub(super) fn build_portal_with(
    policy: PortalPolicy,
) -> (ScholarshipPortal<MemoryRecordStore>, Arc<MemoryRecordStore>) {
    let store = Arc::new(MemoryRecordStore::new());
    let portal = ScholarshipPortal::new(store.clone(), policy);
    (portal, store)
}

pub(super) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn seed_account<S: RecordStore + ?Sized>(
    store: &S,
    name: &str,
    email: &str,
    role: Role,
) -> Session {
    let account = Account {
        id: AccountId::default(),
        name: name.to_string(),
        email: email.to_string(),
        password: PASSWORD.to_string(),
        role,
        registered_at: None,
    };
    let stored: Account = store
        .create_as(Collection::Accounts, &account)
        .expect("seed account");
    Session::for_account(&stored)
}

pub(super) fn applicant<S: RecordStore + ?Sized>(store: &S) -> Session {
    seed_account(store, "Ana Mora", "a@x.com", Role::Applicant)
}

pub(super) fn evaluator<S: RecordStore + ?Sized>(store: &S) -> Session {
    seed_account(store, "Eva Solis", "eva@becas.org", Role::Evaluator)
}

pub(super) fn admin<S: RecordStore + ?Sized>(store: &S) -> Session {
    seed_account(store, "Admin", "admin@becas.org", Role::Admin)
}

pub(super) fn seed_scholarship<S: RecordStore + ?Sized>(
    store: &S,
    name: &str,
    status: ScholarshipStatus,
) -> Scholarship {
    let scholarship = Scholarship {
        id: ScholarshipId::default(),
        name: name.to_string(),
        description: format!("{name} support programme"),
        requirements: "Enrolled student".to_string(),
        status,
        image: None,
    };
    store
        .create_as(Collection::Scholarships, &scholarship)
        .expect("seed scholarship")
}

pub(super) fn form(scholarship: &Scholarship, age: u32, income: &str) -> ApplicationForm {
    ApplicationForm {
        scholarship_id: scholarship.id.clone(),
        full_name: "Ana Mora".to_string(),
        national_id: "1-1111-1111".to_string(),
        age,
        education_level: "University".to_string(),
        declared_income: income.to_string(),
        household_size: 4,
        motivation: "Finish my engineering degree".to_string(),
    }
}

/// Insert an application directly, bypassing intake.
pub(super) fn seed_application<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
    email: &str,
    scholarship: &Scholarship,
    status: ApplicationStatus,
    submitted_at: DateTime<Utc>,
) -> Application {
    let application = Application {
        id: ApplicationId::new(id),
        applicant_email: email.to_string(),
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
        status,
        evaluation: None,
        submitted_at,
    };
    store
        .create_as(Collection::Applications, &application)
        .expect("seed application")
}

pub(super) fn seed_notification<S: RecordStore + ?Sized>(
    store: &S,
    email: &str,
    title: &str,
    read: bool,
    created_at: DateTime<Utc>,
) -> Notification {
    let notification = Notification {
        id: NotificationId::default(),
        recipient_email: email.to_string(),
        title: title.to_string(),
        message: format!("{title} details"),
        read,
        created_at,
        category: NotificationCategory::Info,
    };
    store
        .create_as(Collection::Notifications, &notification)
        .expect("seed notification")
}

pub(super) fn unavailable(operation: StoreOperation, collection: Collection) -> StoreError {
    StoreError::new(
        operation,
        collection,
        StoreErrorKind::Unavailable("record store offline".to_string()),
    )
}

/// Store whose every call fails.
pub(super) struct UnavailableStore;

impl RecordStore for UnavailableStore {
    fn list(&self, collection: Collection, _query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        Err(unavailable(StoreOperation::List, collection))
    }

    fn get(&self, collection: Collection, _id: &str) -> Result<Option<Value>, StoreError> {
        Err(unavailable(StoreOperation::Get, collection))
    }

    fn create(&self, collection: Collection, _record: Value) -> Result<Value, StoreError> {
        Err(unavailable(StoreOperation::Create, collection))
    }

    fn patch(&self, collection: Collection, _id: &str, _changes: Value) -> Result<Value, StoreError> {
        Err(unavailable(StoreOperation::Update, collection))
    }

    fn delete(&self, collection: Collection, _id: &str) -> Result<(), StoreError> {
        Err(unavailable(StoreOperation::Delete, collection))
    }
}

/// Memory store that refuses to create notifications.
#[derive(Default)]
pub(super) struct NotificationOutageStore {
    pub(super) inner: MemoryRecordStore,
}

impl RecordStore for NotificationOutageStore {
    fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        self.inner.list(collection, query)
    }

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(collection, id)
    }

    fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        if collection == Collection::Notifications {
            return Err(unavailable(StoreOperation::Create, collection));
        }
        self.inner.create(collection, record)
    }

    fn patch(&self, collection: Collection, id: &str, changes: Value) -> Result<Value, StoreError> {
        self.inner.patch(collection, id, changes)
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id)
    }

    fn patch_if(
        &self,
        collection: Collection,
        id: &str,
        precondition: &Precondition,
        changes: Value,
    ) -> Result<Value, StoreError> {
        self.inner.patch_if(collection, id, precondition, changes)
    }
}

pub(super) fn router_for<S>(portal: ScholarshipPortal<S>) -> axum::Router
where
    S: RecordStore + ?Sized + 'static,
{
    portal_router(Arc::new(portal))
}

pub(super) fn request(method: Method, uri: &str, email: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(email) = email {
        builder = builder.header(SESSION_HEADER, email);
    }
    match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).expect("json body")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
