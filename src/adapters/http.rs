use {
    super::{
        api_errors::{ApiError, ReadError},
        context::RequestContext,
    },
    crate::{
        AppState,
        domain::{
            account::{AccountRole, AccountSummary, AdminAccount},
            audit::{AuditAction, ResourceType, Severity},
            error::ActivityError,
            filter::{AuditLogFilter, Page, PageRequest},
            id::AccountId,
            location::LocationScope,
            suspension::{LoginDecision, SuspensionRecord},
        },
        services::{activity::ActivityFeed, stats::ActivityStats},
    },
    axum::{
        Json, Router,
        extract::{DefaultBodyLimit, Path, Query, Request, State, rejection::QueryRejection},
        http::StatusCode,
        middleware::{self, Next},
        response::{IntoResponse, Response},
        routing::{get, post, put},
    },
    chrono::{DateTime, Utc},
    serde::Deserialize,
    serde_json::{Value, json},
    std::time::Duration,
    tower::ServiceBuilder,
    tower_http::timeout::TimeoutLayer,
};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// The router as served: bounded request bodies and a per-request timeout.
pub fn service(state: AppState, request_timeout: Duration) -> Router {
    router(state).layer(
        ServiceBuilder::new()
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                request_timeout,
            )),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/activity", get(list_activity))
        .route("/activity/stats", get(activity_stats))
        .route("/setup/audit-log", post(setup_audit_log))
        .route("/admins/{admin_id}/accounts", get(list_visible_accounts))
        .route("/admins/{admin_id}/promote", post(promote_admin))
        .route("/admins/{admin_id}/location", put(reassign_location))
        .route("/admins/{admin_id}/demote", post(demote_admin))
        .route("/accounts/{account_id}/login-status", get(login_status))
        .route("/accounts/{account_id}/suspend", post(suspend_account))
        .route("/accounts/{account_id}/unsuspend", post(unsuspend_account))
        .layer(middleware::from_fn_with_state(state.clone(), session_gate))
        .with_state(state)
}

/// Re-checks suspension on every authenticated request, since an account
/// can be suspended while a session is open.
async fn session_gate(
    State(state): State<AppState>,
    ctx: RequestContext,
    request: Request,
    next: Next,
) -> Response {
    if let Some(actor) = &ctx.actor {
        let decision = state.gate.validate_session(&actor.id).await;
        if !decision.allowed {
            let body = json!({
                "error_code": "account_suspended",
                "message": decision.reason,
            });
            return (StatusCode::FORBIDDEN, Json(body)).into_response();
        }
    }
    next.run(request).await
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Paging {
    fn request(&self) -> Result<PageRequest, ActivityError> {
        PageRequest::new(self.page, self.page_size)
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub severity: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

impl ActivityParams {
    fn filter(&self) -> Result<AuditLogFilter, ActivityError> {
        Ok(AuditLogFilter {
            actor_id: self.actor_id.as_deref().map(AccountId::new).transpose()?,
            action: self
                .action
                .as_deref()
                .map(AuditAction::try_from)
                .transpose()?,
            resource_type: self
                .resource_type
                .as_deref()
                .map(ResourceType::try_from)
                .transpose()?,
            severity: self
                .severity
                .as_deref()
                .map(Severity::try_from)
                .transpose()?,
            start_date: self.start_date,
            end_date: self.end_date,
            search_term: self.search.clone(),
        })
    }
}

/// A query string that does not deserialize is a validation failure like any
/// other, so read endpoints still answer with an empty result.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ActivityError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ActivityError::Validation(rejection.body_text()))
}

async fn list_activity(
    State(state): State<AppState>,
    params: Result<Query<ActivityParams>, QueryRejection>,
) -> Result<Json<ActivityFeed>, ReadError> {
    let params = query_params(params)?;
    let filter = params.filter()?;
    let page = PageRequest::new(params.page, params.page_size)?;
    Ok(Json(state.activity.query(filter, page).await?))
}

async fn activity_stats(State(state): State<AppState>) -> Json<ActivityStats> {
    Json(state.stats.stats().await)
}

async fn setup_audit_log(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let actor = ctx.require_actor()?;
    let outcome = state.provisioner.initialize(actor, &ctx.origin).await?;
    Ok(Json(json!({ "status": outcome.as_str() })))
}

async fn list_visible_accounts(
    State(state): State<AppState>,
    Path(admin_id): Path<String>,
    paging: Result<Query<Paging>, QueryRejection>,
) -> Result<Json<Page<AccountSummary>>, ReadError> {
    let paging = query_params(paging)?;
    let admin_id = AccountId::new(admin_id)?;
    let page = paging.request()?;
    Ok(Json(state.access.list_visible_accounts(&admin_id, page).await?))
}

async fn login_status(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<LoginDecision>, ApiError> {
    let account_id = AccountId::new(account_id)?;
    Ok(Json(state.gate.check_login_allowed(&account_id).await))
}

#[derive(Debug, Deserialize)]
pub struct SuspendBody {
    pub reason: String,
}

async fn suspend_account(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(account_id): Path<String>,
    Json(body): Json<SuspendBody>,
) -> Result<(StatusCode, Json<SuspensionRecord>), ApiError> {
    let actor = ctx.require_actor()?;
    let account_id = AccountId::new(account_id)?;
    let record = state
        .gate
        .suspend(actor, &ctx.origin, &account_id, &body.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn unsuspend_account(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(account_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let actor = ctx.require_actor()?;
    let account_id = AccountId::new(account_id)?;
    let closed = state.gate.unsuspend(actor, &ctx.origin, &account_id).await?;
    Ok(Json(json!({ "closed_suspensions": closed })))
}

#[derive(Debug, Deserialize)]
pub struct PromoteBody {
    pub role: AccountRole,
    #[serde(default)]
    pub location: Option<LocationScope>,
}

async fn promote_admin(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(admin_id): Path<String>,
    Json(body): Json<PromoteBody>,
) -> Result<Json<AdminAccount>, ApiError> {
    let actor = ctx.require_actor()?;
    let admin_id = AccountId::new(admin_id)?;
    let admin = state
        .admin
        .promote(actor, &ctx.origin, &admin_id, body.role, body.location)
        .await?;
    Ok(Json(admin))
}

#[derive(Debug, Deserialize)]
pub struct LocationBody {
    #[serde(default)]
    pub location: Option<LocationScope>,
}

async fn reassign_location(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(admin_id): Path<String>,
    Json(body): Json<LocationBody>,
) -> Result<Json<AdminAccount>, ApiError> {
    let actor = ctx.require_actor()?;
    let admin_id = AccountId::new(admin_id)?;
    let admin = state
        .admin
        .reassign_location(actor, &ctx.origin, &admin_id, body.location)
        .await?;
    Ok(Json(admin))
}

async fn demote_admin(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(admin_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = ctx.require_actor()?;
    let admin_id = AccountId::new(admin_id)?;
    state.admin.demote(actor, &ctx.origin, &admin_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
