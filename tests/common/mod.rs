//! 测试公共模块
//! 提供模拟后端和测试辅助函数

#![allow(dead_code)]

use account_console::{
    config::{ApiConfig, AppConfig, AppMode, LoggingConfig, StorageConfig},
    http::RequestService,
    shell::{AppShell, NoticeLevel, Notifier},
    storage::StorageService,
    SessionManager,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const VALID_PASSWORD: &str = "secret";
pub const LOGIN_TOKEN: &str = "abc";
pub const ROTATED_TOKEN: &str = "xyz";

/// 模拟后端收到的一次请求
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockState {
    pub requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockState {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    pub fn last(&self, path: &str) -> Option<Recorded> {
        self.requests().into_iter().rev().find(|r| r.path == path)
    }
}

/// 已启动的模拟后端
pub struct MockServer {
    pub base_url: String,
    pub state: MockState,
}

impl MockServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub fn sample_user(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "firstName": "Test",
        "lastName": "User",
        "roles": ["ROLE_USER"]
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    matches!(
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
        Some("Bearer abc") | Some("Bearer xyz")
    )
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "status": 401, "error": "Token expired" })),
    )
        .into_response()
}

async fn record(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let recorded = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Recorded {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            authorization: header("authorization"),
            request_id: header("x-request-id"),
        }
    };
    state.requests.lock().unwrap().push(recorded);
    next.run(request).await
}

async fn login(Query(params): Query<HashMap<String, String>>) -> Response {
    let username = params.get("username").cloned().unwrap_or_default();
    let password = params.get("password").cloned().unwrap_or_default();

    if username == "malformed" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": 400, "errors": ["bad"] })),
        )
            .into_response();
    }

    if password != VALID_PASSWORD {
        return Json(json!({
            "status": 401,
            "timestamp": 1_700_000_000_000_i64,
            "error": "Bad credentials",
            "message": "Unauthorized",
            "path": "/login"
        }))
        .into_response();
    }

    Json(json!({
        "status": 200,
        "timestamp": 1_700_000_000_000_i64,
        "id": 1,
        "username": username,
        "token": LOGIN_TOKEN
    }))
    .into_response()
}

async fn refresh(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        [("X-Authorization", ROTATED_TOKEN)],
        Json(json!({ "status": 200 })),
    )
        .into_response()
}

async fn current_user(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(sample_user(1, "admin")).into_response()
}

async fn check_username(Query(params): Query<HashMap<String, String>>) -> Json<bool> {
    Json(params.get("username").map(String::as_str) == Some("admin"))
}

async fn update_password(Json(body): Json<Value>) -> Response {
    if body["oldPassword"] == "wrong" {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "errors": ["Old password does not match"] })),
        )
            .into_response();
    }
    StatusCode::OK.into_response()
}

async fn update_username(Json(body): Json<Value>) -> Response {
    if body["username"] == "" {
        return (StatusCode::BAD_REQUEST, "").into_response();
    }
    StatusCode::OK.into_response()
}

async fn list_accounts() -> Json<Value> {
    Json(json!([sample_user(1, "admin"), sample_user(2, "alice")]))
}

async fn accounts_page(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let size: u32 = params.get("size").and_then(|s| s.parse().ok()).unwrap_or(20);
    Json(json!({
        "content": [sample_user(2, "alice")],
        "empty": false,
        "first": page == 0,
        "last": true,
        "number": page,
        "numberOfElements": 1,
        "size": size,
        "totalElements": 1,
        "totalPages": 1,
        "pageable": {
            "unpaged": false,
            "offset": 0,
            "pageNumber": page,
            "pageSize": size,
            "paged": true,
            "sort": { "empty": true, "sorted": false, "unsorted": true }
        },
        "sort": { "empty": true, "sorted": false, "unsorted": true }
    }))
}

async fn get_account(Path(id): Path<i64>) -> Response {
    if id == 404 {
        return (StatusCode::NOT_FOUND, "").into_response();
    }
    Json(sample_user(id, "alice")).into_response()
}

async fn update_account(Path(id): Path<i64>, Json(mut body): Json<Value>) -> Json<Value> {
    body["id"] = json!(id);
    Json(body)
}

async fn set_account_password(Path(id): Path<i64>, Json(body): Json<Value>) -> Response {
    if body["newPassword"].as_str().unwrap_or_default().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Password is empty" })))
            .into_response();
    }
    Json(sample_user(id, "alice")).into_response()
}

async fn delete_account() -> StatusCode {
    StatusCode::OK
}

async fn create_test_accounts() -> StatusCode {
    StatusCode::OK
}

async fn register(Json(mut body): Json<Value>) -> Json<Value> {
    body["id"] = json!(2);
    Json(body)
}

async fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "errors": ["nope"] }))).into_response()
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn upload(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({
        "contentType": content_type,
        "size": body.len(),
        "containsFile": String::from_utf8_lossy(&body).contains("report.txt"),
    }))
}

async fn download() -> &'static [u8] {
    b"hello world"
}

async fn item(Path(id): Path<u32>) -> Json<Value> {
    Json(json!({ "id": id }))
}

/// 启动模拟后端，监听随机端口
pub async fn spawn_backend() -> MockServer {
    let state = MockState::default();

    let app = Router::new()
        .route("/login", post(login))
        .route("/refresh", get(refresh))
        .route("/user", get(current_user))
        .route("/user/check", get(check_username))
        .route("/user/update/password", post(update_password))
        .route("/user/update/username", post(update_username))
        .route("/accounts", get(list_accounts))
        .route("/accounts/page", get(accounts_page))
        .route("/accounts/create_test", get(create_test_accounts))
        .route("/accounts/{id}", get(get_account).delete(delete_account))
        .route("/accounts/{id}/update", post(update_account))
        .route("/accounts/{id}/password", post(set_account_password))
        .route("/registration", put(register))
        .route("/forbidden", get(forbidden))
        .route("/broken", get(broken))
        .route("/upload", post(upload))
        .route("/files/report.txt", get(download))
        .route("/items/{id}", get(item).delete(delete_account))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend failed");
    });

    MockServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

/// 创建测试配置
pub fn create_test_config(base_url: &str) -> AppConfig {
    AppConfig {
        api: ApiConfig {
            base_url: base_url.to_string(),
            public_path: "/".to_string(),
            timeout_secs: 5,
        },
        app: AppMode { production: false },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        storage: StorageConfig {
            path: String::new(),
        },
    }
}

/// 创建指向模拟后端的会话管理器
pub fn create_session(server: &MockServer, storage: StorageService) -> Arc<SessionManager> {
    let config = create_test_config(&server.base_url);
    let requests = RequestService::from_config(&config).expect("Failed to create request service");
    Arc::new(SessionManager::new(requests, storage))
}

/// 记录所有通知
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().unwrap().push((level, message.to_string()));
    }
}

/// 创建指向模拟后端的应用外壳
pub fn create_shell(server: &MockServer, storage: StorageService) -> (AppShell, Arc<RecordingNotifier>) {
    let config = create_test_config(&server.base_url);
    let notifier = Arc::new(RecordingNotifier::default());
    let shell = AppShell::from_config(&config, storage, notifier.clone())
        .expect("Failed to create app shell");
    (shell, notifier)
}
