use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::actor::validate_actor;
use crate::board::{parse_status, TaskStatus};
use crate::context::Context;
use crate::discussion::parse_since;
use crate::error::{exit_codes, Error};
use crate::task::{BulkUpdate, NewTask, TaskEdit, TaskFilter};

/// Header carrying the caller's actor name.
pub const ACTOR_HEADER: &str = "x-plank-actor";

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub ctx: Context,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Run a store call on a blocking thread.
    async fn call<F, R>(&self, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&Context) -> crate::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let ctx = self.ctx.clone();
        tokio::task::spawn_blocking(move || f(&ctx))
            .await
            .map_err(|err| ApiError::Internal(format!("store task failed: {err}")))?
            .map_err(ApiError::from)
    }

    fn actor(&self, headers: &HeaderMap) -> Result<String, ApiError> {
        match headers.get(ACTOR_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| ApiError::BadRequest(format!("{ACTOR_HEADER} is not valid UTF-8")))?;
                Ok(validate_actor(raw)?)
            }
            None => Ok(self.ctx.config.actor.default.clone()),
        }
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct MoveTaskRequest {
    pub status: TaskStatus,
    pub index: usize,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
    pub reply_to: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct BoardQuery {
    pub project: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct TaskQuery {
    pub status: Option<String>,
    pub project: Option<String>,
    pub assignee: Option<String>,
    pub search: Option<String>,
    pub due_before: Option<NaiveDate>,
}

#[derive(Deserialize, Default)]
pub struct ProjectQuery {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Deserialize, Default)]
pub struct MessageQuery {
    pub since: Option<String>,
    pub limit: Option<usize>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String, Option<serde_json::Value>),
    Forbidden(String, Option<serde_json::Value>),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        if err.is_not_found() {
            return ApiError::NotFound(message);
        }
        if matches!(err, Error::PositionConflict { .. }) {
            return ApiError::Conflict(message, err.details());
        }
        match err.exit_code() {
            exit_codes::USER_ERROR => ApiError::BadRequest(message),
            exit_codes::POLICY_BLOCKED => ApiError::Forbidden(message, err.details()),
            _ => {
                tracing::error!(error = %err, "request failed");
                ApiError::Internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Conflict(msg, details) => (StatusCode::CONFLICT, msg, details),
            ApiError::Forbidden(msg, details) => (StatusCode::FORBIDDEN, msg, details),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };
        let body = match details {
            Some(details) => serde_json::json!({ "error": message, "details": details }),
            None => serde_json::json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/workspaces", get(list_workspaces).post(create_workspace))
        .route("/api/workspaces/{id}/board", get(get_board))
        .route(
            "/api/workspaces/{id}/tasks",
            get(list_tasks).post(create_task),
        )
        .route(
            "/api/workspaces/{id}/projects",
            get(list_projects).post(create_project),
        )
        .route("/api/workspaces/{id}/notes", get(list_notes).post(create_note))
        .route(
            "/api/workspaces/{id}/messages",
            get(list_messages).post(post_message),
        )
        .route("/api/tasks/bulk-update", post(bulk_update))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/comments", post(add_comment))
        .route("/api/tasks/{id}/move", post(move_task))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_workspaces(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let workspaces = state
        .call(move |ctx| ctx.workspaces.list(Some(actor.as_str())))
        .await?;
    Ok(Json(workspaces))
}

async fn create_workspace(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let workspace = state
        .call(move |ctx| ctx.workspaces.create(&req.name, req.description, &actor))
        .await?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

async fn get_board(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<BoardQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let board = state
        .call(move |ctx| ctx.tasks.board_view(&id, &actor, query.project.as_deref()))
        .await?;
    Ok(Json(board))
}

async fn list_tasks(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<TaskQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let filter = TaskFilter {
        workspace: Some(id),
        project: query.project,
        status,
        assignee: query.assignee,
        search: query.search,
        due_before: query.due_before,
    };
    let tasks = state.call(move |ctx| ctx.tasks.list(&filter, &actor)).await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let new = NewTask {
        workspace: id,
        title: req.title,
        description: req.description,
        status: req.status,
        project: req.project,
        assignee: req.assignee,
        due_date: req.due_date,
    };
    let task = state.call(move |ctx| ctx.tasks.create(new, &actor)).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let details = state.call(move |ctx| ctx.tasks.details(&id, &actor)).await?;
    Ok(Json(details))
}

async fn update_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(edit): Json<TaskEdit>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let task = state
        .call(move |ctx| {
            ctx.tasks.edit(&id, edit, &actor)?;
            ctx.tasks.get(&id)
        })
        .await?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    state.call(move |ctx| ctx.tasks.delete(&id, &actor)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_comment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let task = state
        .call(move |ctx| ctx.tasks.comment(&id, &req.comment, &actor))
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn move_task(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<MoveTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let report = state
        .call(move |ctx| ctx.tasks.move_task(&id, req.status, req.index, &actor))
        .await?;
    Ok(Json(report))
}

async fn bulk_update(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(batch): Json<BulkUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let report = state
        .call(move |ctx| ctx.tasks.apply_batch(&batch, &actor))
        .await?;
    Ok(Json(report))
}

async fn list_projects(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let projects = state
        .call(move |ctx| ctx.projects.list(&id, &actor, query.include_archived))
        .await?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let project = state
        .call(move |ctx| ctx.projects.create(&id, &req.name, req.description, &actor))
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn list_notes(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let notes = state.call(move |ctx| ctx.notes.list(&id, &actor)).await?;
    Ok(Json(notes))
}

async fn create_note(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let note = state
        .call(move |ctx| ctx.notes.create(&id, &req.title, &req.body, &actor))
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn list_messages(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let since = query.since.as_deref().map(parse_since).transpose()?;
    let messages = state
        .call(move |ctx| ctx.discussion.list(&id, &actor, since, query.limit))
        .await?;
    Ok(Json(messages))
}

async fn post_message(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = state.actor(&headers)?;
    let message = state
        .call(move |ctx| {
            ctx.discussion
                .post(&id, &req.body, req.reply_to.as_deref(), &actor)
        })
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
