use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::sync::Arc;
use tempfile::TempDir;
use todo_core::{SnapshotTodoStore, SqliteTodoStore, Todo, TodoService, TodoStore};
use todo_server::config::{Backend, Config};
use todo_server::{app, open_store, SharedStore};
use tower::ServiceExt;

fn snapshot_app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let store: SharedStore =
        Arc::new(SnapshotTodoStore::open(dir.path().join("todos.json")).unwrap());
    (dir, app(TodoService::new(store)))
}

fn sqlite_app() -> Router {
    let store: SharedStore = Arc::new(SqliteTodoStore::open_in_memory().unwrap());
    app(TodoService::new(store))
}

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

async fn crud_lifecycle(app: &Router) {
    // create
    let resp = send(app, json_request("POST", "/todos", r#"{"title":"Buy milk"}"#)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Todo = body_json(resp).await;
    assert_eq!(created.id, 1);
    assert_eq!(created.title, "Buy milk");
    assert_eq!(created.completed, "not completed");

    // list
    let resp = send(app, empty_request("GET", "/todos")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let todos: Vec<Todo> = body_json(resp).await;
    assert_eq!(todos, vec![created.clone()]);

    // get
    let resp = send(app, empty_request("GET", "/todos/1")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Todo = body_json(resp).await;
    assert_eq!(fetched, created);

    // update both fields
    let resp = send(
        app,
        json_request(
            "PUT",
            "/todos/1",
            r#"{"title":"Buy oat milk","completed":"completed"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Todo = body_json(resp).await;
    assert_eq!(updated.title, "Buy oat milk");
    assert_eq!(updated.completed, "completed");

    // update status only, title kept
    let resp = send(
        app,
        json_request("PUT", "/todos/1", r#"{"completed":"not completed"}"#),
    )
    .await;
    let updated: Todo = body_json(resp).await;
    assert_eq!(updated.title, "Buy oat milk");
    assert_eq!(updated.completed, "not completed");

    // delete
    let resp = send(app, empty_request("DELETE", "/todos/1")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());

    // gone
    let resp = send(app, empty_request("GET", "/todos/1")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(app, empty_request("DELETE", "/todos/1")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(app, empty_request("GET", "/todos")).await;
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.is_empty());
}

#[tokio::test]
async fn crud_lifecycle_on_snapshot_backend() {
    let (_dir, app) = snapshot_app();
    crud_lifecycle(&app).await;
}

#[tokio::test]
async fn crud_lifecycle_on_sqlite_backend() {
    let app = sqlite_app();
    crud_lifecycle(&app).await;
}

#[tokio::test]
async fn health_reports_ok() {
    let app = sqlite_app();
    let resp = send(&app, empty_request("GET", "/health")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], todo_core::core_version());
}

#[tokio::test]
async fn non_integer_and_non_positive_ids_return_400() {
    let app = sqlite_app();

    for uri in ["/todos/abc", "/todos/1.5", "/todos/0", "/todos/-2"] {
        let resp = send(&app, empty_request("GET", uri)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "GET {uri}");

        let resp = send(&app, json_request("PUT", uri, r#"{"title":"x"}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "PUT {uri}");

        let resp = send(&app, empty_request("DELETE", uri)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "DELETE {uri}");
    }
}

#[tokio::test]
async fn create_rejects_malformed_and_empty_bodies() {
    let app = sqlite_app();

    for body in [r#"{"title":"#, r#"{"not_title":1}"#, r#"{"title":""}"#, r#"{"title":"   "}"#] {
        let resp = send(&app, json_request("POST", "/todos", body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
        let error: serde_json::Value = body_json(resp).await;
        assert!(error["error"].is_string());
    }

    let resp = send(&app, empty_request("GET", "/todos")).await;
    let todos: Vec<Todo> = body_json(resp).await;
    assert!(todos.is_empty());
}

fn request_with_content_type(
    method: &str,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(http::header::CONTENT_TYPE, content_type);
    }
    builder.body(body.to_string()).unwrap()
}

#[tokio::test]
async fn json_bodies_are_accepted_regardless_of_content_type() {
    let app = sqlite_app();

    for content_type in [None, Some("application/x-www-form-urlencoded"), Some("text/plain")] {
        let resp = send(
            &app,
            request_with_content_type("POST", "/todos", content_type, r#"{"title":"Buy milk"}"#),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED, "{content_type:?}");
        let created: Todo = body_json(resp).await;
        assert_eq!(created.title, "Buy milk");
    }

    let resp = send(
        &app,
        request_with_content_type("PUT", "/todos/1", None, r#"{"completed":"completed"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Todo = body_json(resp).await;
    assert_eq!(updated.completed, "completed");

    let resp = send(
        &app,
        request_with_content_type("POST", "/todos", None, "title=Buy+milk"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_unknown_id_returns_404() {
    let app = sqlite_app();
    let resp = send(&app, json_request("PUT", "/todos/77", r#"{"title":"Nope"}"#)).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_with_malformed_body_returns_400() {
    let app = sqlite_app();
    send(&app, json_request("POST", "/todos", r#"{"title":"exists"}"#)).await;

    let resp = send(&app, json_request("PUT", "/todos/1", "not json")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn persistence_failure_returns_500_without_details() {
    let dir = tempfile::tempdir().unwrap();
    let store: SharedStore = Arc::new(
        SnapshotTodoStore::open(dir.path().join("missing").join("todos.json")).unwrap(),
    );
    let app = app(TodoService::new(store));

    let resp = send(&app, json_request("POST", "/todos", r#"{"title":"lost"}"#)).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["error"], "internal server error");
}

#[tokio::test]
async fn open_store_honors_configured_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        backend: Backend::Sqlite,
        database_path: dir.path().join("todos.sqlite3"),
        ..Config::default()
    };

    let store = open_store(&config).unwrap();
    store.create("persisted").unwrap();
    drop(store);

    assert!(config.database_path.exists());
    let reopened = open_store(&config).unwrap();
    assert_eq!(reopened.get_all().unwrap().len(), 1);
}
