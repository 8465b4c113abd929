use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::records::RecordStore;

use super::accounts::Registration;
use super::domain::{AccountId, ApplicationId, NotificationId, ScholarshipDraft, ScholarshipId};
use super::error::{PortalError, RuleViolation};
use super::evaluation::{Decision, QueueFilter, ScoreSheet};
use super::intake::ApplicationForm;
use super::service::ScholarshipPortal;
use super::session::Session;

/// Header carrying the signed-in account email.
pub const SESSION_HEADER: &str = "x-portal-email";

type PortalState<S> = State<Arc<ScholarshipPortal<S>>>;

/// Router builder exposing the portal workflows over HTTP.
pub fn portal_router<S>(portal: Arc<ScholarshipPortal<S>>) -> Router
where
    S: RecordStore + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/accounts", post(register_handler::<S>))
        .route("/api/v1/sessions", post(login_handler::<S>))
        .route(
            "/api/v1/evaluators",
            get(list_evaluators_handler::<S>).post(create_evaluator_handler::<S>),
        )
        .route(
            "/api/v1/evaluators/:account_id",
            axum::routing::delete(delete_evaluator_handler::<S>),
        )
        .route(
            "/api/v1/scholarships",
            get(list_scholarships_handler::<S>).post(create_scholarship_handler::<S>),
        )
        .route("/api/v1/scholarships/catalog", get(catalog_handler::<S>))
        .route(
            "/api/v1/scholarships/:scholarship_id",
            get(get_scholarship_handler::<S>)
                .put(update_scholarship_handler::<S>)
                .delete(delete_scholarship_handler::<S>),
        )
        .route(
            "/api/v1/scholarships/:scholarship_id/toggle",
            post(toggle_scholarship_handler::<S>),
        )
        .route(
            "/api/v1/applications",
            get(queue_handler::<S>).post(submit_handler::<S>),
        )
        .route("/api/v1/applications/eligibility", get(eligibility_handler::<S>))
        .route("/api/v1/applications/mine", get(history_handler::<S>))
        .route(
            "/api/v1/applications/:application_id/review",
            get(review_handler::<S>),
        )
        .route(
            "/api/v1/applications/:application_id/decision",
            post(decision_handler::<S>),
        )
        .route("/api/v1/notifications", get(inbox_handler::<S>))
        .route(
            "/api/v1/notifications/read-all",
            post(mark_all_read_handler::<S>),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<S>),
        )
        .route("/api/v1/reports/dashboard", get(dashboard_handler::<S>))
        .with_state(portal)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueParams {
    #[serde(default)]
    pub filter: QueueFilter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    #[serde(flatten)]
    pub scores: ScoreSheet,
}

/// Failure surfaced by a portal handler.
#[derive(Debug)]
pub enum ApiError {
    MissingSession,
    Portal(PortalError),
    Internal(String),
}

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        ApiError::Portal(err)
    }
}

pub fn status_for(err: &PortalError) -> StatusCode {
    match err {
        PortalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PortalError::Rejected(RuleViolation::UnknownAccount(_))
        | PortalError::Rejected(RuleViolation::WrongPassword) => StatusCode::UNAUTHORIZED,
        PortalError::Rejected(_) => StatusCode::CONFLICT,
        PortalError::AccessDenied(_) => StatusCode::FORBIDDEN,
        PortalError::NotFound { .. } => StatusCode::NOT_FOUND,
        PortalError::Store(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingSession => (
                StatusCode::UNAUTHORIZED,
                format!("missing {SESSION_HEADER} header"),
            ),
            ApiError::Portal(err) => {
                let status = status_for(&err);
                if status == StatusCode::BAD_GATEWAY {
                    error!(error = %err, "record store request failed");
                }
                (status, err.to_string())
            }
            ApiError::Internal(message) => {
                error!(error = %message, "portal handler failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        let payload = json!({
            "error": message,
        });
        (status, Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ApiError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn session_email(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingSession)
}

/// Run a workflow call on the blocking pool; the record client blocks on network I/O.
async fn run_blocking<S, T, F>(portal: Arc<ScholarshipPortal<S>>, call: F) -> Result<T, ApiError>
where
    S: RecordStore + ?Sized + 'static,
    T: Send + 'static,
    F: FnOnce(&ScholarshipPortal<S>) -> Result<T, PortalError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&portal))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .map_err(ApiError::from)
}

/// Resolve the caller's session, then run `call` with it on the blocking pool.
async fn with_session<S, T, F>(
    portal: Arc<ScholarshipPortal<S>>,
    headers: &HeaderMap,
    call: F,
) -> Result<T, ApiError>
where
    S: RecordStore + ?Sized + 'static,
    T: Send + 'static,
    F: FnOnce(&ScholarshipPortal<S>, &Session) -> Result<T, PortalError> + Send + 'static,
{
    let email = session_email(headers)?;
    run_blocking(portal, move |portal| {
        let session = portal.accounts().resolve(&email)?;
        call(portal, &session)
    })
    .await
}

pub(crate) async fn register_handler<S>(
    State(portal): PortalState<S>,
    Json(registration): Json<Registration>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = run_blocking(portal, move |portal| {
        portal.accounts().register(&registration)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn login_handler<S>(
    State(portal): PortalState<S>,
    Json(credentials): Json<Credentials>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = run_blocking(portal, move |portal| {
        portal
            .accounts()
            .login(&credentials.email, &credentials.password)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn list_evaluators_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, |portal, session| {
        portal.accounts().list_evaluators(session)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_evaluator_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Json(registration): Json<Registration>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, move |portal, session| {
        portal.accounts().create_evaluator(session, &registration)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn delete_evaluator_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Path(account_id): Path<String>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let id = AccountId::new(account_id);
    match with_session(portal, &headers, move |portal, session| {
        portal.accounts().delete_evaluator(session, &id)
    })
    .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_scholarships_handler<S>(State(portal): PortalState<S>) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = run_blocking(portal, |portal| portal.catalog().list()).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn create_scholarship_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Json(draft): Json<ScholarshipDraft>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, move |portal, session| {
        portal.catalog().create(session, &draft)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn catalog_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, |portal, session| {
        portal.catalog().catalog_for(session)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn get_scholarship_handler<S>(
    State(portal): PortalState<S>,
    Path(scholarship_id): Path<String>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let id = ScholarshipId::new(scholarship_id);
    let result = run_blocking(portal, move |portal| portal.catalog().get(&id)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn update_scholarship_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
    Json(draft): Json<ScholarshipDraft>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let id = ScholarshipId::new(scholarship_id);
    let result = with_session(portal, &headers, move |portal, session| {
        portal.catalog().update(session, &id, &draft)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn delete_scholarship_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let id = ScholarshipId::new(scholarship_id);
    match with_session(portal, &headers, move |portal, session| {
        portal.catalog().delete(session, &id)
    })
    .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn toggle_scholarship_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Path(scholarship_id): Path<String>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let id = ScholarshipId::new(scholarship_id);
    let result = with_session(portal, &headers, move |portal, session| {
        portal.catalog().toggle_status(session, &id)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn eligibility_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, |portal, session| {
        portal.intake().check_entry(session)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn submit_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Json(form): Json<ApplicationForm>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, move |portal, session| {
        portal.intake().submit(session, &form)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn history_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, |portal, session| {
        portal.intake().history(session)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn queue_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Query(params): Query<QueueParams>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, move |portal, session| {
        portal.gate().queue(session, params.filter)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn review_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let id = ApplicationId::new(application_id);
    let result = with_session(portal, &headers, move |portal, session| {
        portal.gate().open(session, &id)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn decision_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let id = ApplicationId::new(application_id);
    let result = with_session(portal, &headers, move |portal, session| {
        portal
            .gate()
            .decide(session, &id, request.decision, &request.scores)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn inbox_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, |portal, session| {
        portal.notifications().snapshot(session)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn mark_read_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
    Path(notification_id): Path<String>,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let id = NotificationId::new(notification_id);
    let result = with_session(portal, &headers, move |portal, session| {
        portal.notifications().mark_read(session, &id)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn mark_all_read_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, |portal, session| {
        portal
            .notifications()
            .mark_all_read(session)
            .map(|marked| json!({ "marked": marked }))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn dashboard_handler<S>(
    State(portal): PortalState<S>,
    headers: HeaderMap,
) -> Response
where
    S: RecordStore + ?Sized + 'static,
{
    let result = with_session(portal, &headers, |portal, session| {
        portal.reports().dashboard(session)
    })
    .await;
    respond(StatusCode::OK, result)
}
