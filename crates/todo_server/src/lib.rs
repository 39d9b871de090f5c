//! HTTP front end for the todo store.
//!
//! # Responsibility
//! - Decode paths and JSON bodies, call the core service, map outcomes to
//!   status codes.
//! - Keep no state beyond the shared service handle.
//!
//! # Endpoints
//! - `GET /health`
//! - `GET|POST /todos`
//! - `GET|PUT|DELETE /todos/{id}`

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use todo_core::{
    core_version, validate_id, ServiceError, ServiceResult, SnapshotTodoStore, SqliteTodoStore,
    StoreResult, Todo, TodoId, TodoPatch, TodoService, TodoStore,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;

pub mod config;

use config::{Backend, Config};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Store handle selected at startup.
pub type SharedStore = Arc<dyn TodoStore>;
pub type AppService = TodoService<SharedStore>;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub completed: Option<String>,
}

/// Opens the backend named in `config`.
pub fn open_store(config: &Config) -> StoreResult<SharedStore> {
    let store: SharedStore = match config.backend {
        Backend::Snapshot => Arc::new(SnapshotTodoStore::open(&config.snapshot_path)?),
        Backend::Sqlite => Arc::new(SqliteTodoStore::open(&config.database_path)?),
    };
    Ok(store)
}

pub fn app(service: AppService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .with_state(service)
        .layer(middleware::from_fn(log_request))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(CatchPanicLayer::new())
}

/// Request-level failures and their HTTP mapping.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(TodoId),
    /// Detail is logged, never sent to the client.
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::Validation(err) => Self::BadRequest(err.to_string()),
            ServiceError::Store(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::BadRequest(format!("invalid JSON body: {value}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::NotFound(id) => (StatusCode::NOT_FOUND, format!("todo {id} not found")),
            Self::Internal(detail) => {
                error!("event=request_failed module=server status=error error={detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": core_version() }))
}

async fn list_todos(State(service): State<AppService>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = run_blocking(move || service.list_todos()).await?;
    Ok(Json(todos))
}

async fn create_todo(
    State(service): State<AppService>,
    body: Bytes,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let request: CreateTodoRequest = decode_json(&body)?;
    let todo = run_blocking(move || service.create_todo(&request.title)).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(service): State<AppService>,
    Path(raw_id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&raw_id)?;
    run_blocking(move || service.get_todo(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

async fn update_todo(
    State(service): State<AppService>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&raw_id)?;
    let request: UpdateTodoRequest = decode_json(&body)?;
    let patch = TodoPatch {
        title: request.title,
        completed: request.completed,
    };
    run_blocking(move || service.update_todo(id, &patch))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

async fn delete_todo(
    State(service): State<AppService>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    if run_blocking(move || service.delete_todo(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(id))
    }
}

fn parse_id(raw: &str) -> Result<TodoId, ApiError> {
    let id: TodoId = raw
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("todo id must be an integer, got `{raw}`")))?;
    validate_id(id).map_err(|err| ApiError::BadRequest(err.to_string()))
}

// Bodies are decoded as JSON whatever the Content-Type header says.
fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(body)?)
}

/// Runs a store call on the blocking pool; store I/O never stalls async workers.
async fn run_blocking<T, F>(call: F) -> Result<T, ApiError>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(call)
        .await
        .map_err(|err| ApiError::Internal(format!("store task failed: {err}")))?;
    Ok(result?)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;

    info!(
        "event=http_request module=server method={} path={} status={} duration_ms={}",
        method,
        path,
        response.status().as_u16(),
        started_at.elapsed().as_millis()
    );
    response
}
