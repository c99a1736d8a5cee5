//! 会话管理：登录、登出、令牌刷新与校验
//!
//! 令牌保存在键值存储中，并作为默认 `Authorization` 头注入到请求服务。
//! 任何响应只要携带 `X-Authorization` 头，就会静默替换当前令牌。

use crate::error::{
    ClientError, Result, MSG_BAD_INPUT, MSG_LOGIN_FAILED, MSG_UNAUTHORIZED,
};
use crate::http::{
    ApiRequest, ApiResponse, DefaultHandler, DefaultHeaders, RequestContext, RequestFailure,
    RequestService, ResponseHandler,
};
use crate::models::{AuthResponse, LoginParams};
use crate::storage::StorageService;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

pub const TOKEN_STORAGE_KEY: &str = "auth-token";
pub const AUTH_STORAGE_KEY: &str = "auth-data";
pub const RESPONSE_TOKEN_HEADER: &str = "X-Authorization";
pub const BEARER_PREFIX: &str = "Bearer ";

/// 401/403 回调，参数为错误消息
pub type UnauthorizedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// 补全 Bearer 前缀
pub fn normalize_token(token: &str) -> String {
    if token.starts_with(BEARER_PREFIX) {
        token.to_string()
    } else {
        format!("{BEARER_PREFIX}{token}")
    }
}

/// 从错误响应体中提取服务端消息：errors[0] > error > 纯文本
pub fn server_message(body: &[u8]) -> Option<String> {
    let message = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
            .and_then(Value::as_str)
            .or_else(|| map.get("error").and_then(Value::as_str))
            .map(str::to_string),
        Ok(Value::String(text)) => Some(text),
        Ok(_) => None,
        Err(_) => Some(String::from_utf8_lossy(body).into_owned()),
    };

    message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

struct SessionState {
    storage: StorageService,
    headers: DefaultHeaders,
    clear_session: AtomicBool,
    unauthorized_handler: RwLock<Option<UnauthorizedCallback>>,
    base: DefaultHandler,
}

impl SessionState {
    fn token(&self) -> Option<String> {
        self.storage
            .get::<String>(TOKEN_STORAGE_KEY)
            .filter(|token| !token.is_empty())
    }

    /// 设置或清除令牌，同时更新默认请求头
    fn set_token(&self, token: Option<&str>) {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => {
                let token = normalize_token(token);
                if let Err(e) = self.headers.set("authorization", Some(&token)) {
                    tracing::warn!(error = %e, "Rejected token that is not a valid header value");
                    return;
                }
                self.storage.set(TOKEN_STORAGE_KEY, &token);
            }
            None => {
                if let Err(e) = self.headers.set("authorization", None) {
                    tracing::warn!(error = %e, "Failed to clear authorization header");
                }
                self.storage.remove(TOKEN_STORAGE_KEY);
            }
        }
    }

    fn notify_unauthorized(&self, message: &str) {
        // 回调可能重新注册处理器，调用前先释放读锁
        let callback = self
            .unauthorized_handler
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(message);
        }
    }
}

/// 会话感知的响应处理器
struct SessionHandler {
    state: Arc<SessionState>,
}

impl ResponseHandler for SessionHandler {
    fn on_success(&self, ctx: &RequestContext, response: ApiResponse) -> Result<ApiResponse> {
        if let Some(rotated) = response.header(RESPONSE_TOKEN_HEADER) {
            tracing::debug!(url = %response.url, "Token rotated by server");
            self.state.set_token(Some(rotated));
        }
        self.state.base.on_success(ctx, response)
    }

    fn on_error(&self, ctx: &RequestContext, failure: RequestFailure) -> ClientError {
        self.state.base.log_failure(ctx, &failure);

        let message = failure.response().and_then(|r| server_message(&r.body));
        let status = failure.response().map(|r| r.status.as_u16());

        let error = match status {
            Some(400) => ClientError::BadInput(message.unwrap_or_else(|| MSG_BAD_INPUT.to_string())),
            Some(401) | Some(403) => {
                let message = message.unwrap_or_else(|| MSG_UNAUTHORIZED.to_string());

                // 令牌已失效，清除会话
                if ctx.probe || self.state.clear_session.load(Ordering::SeqCst) {
                    self.state.set_token(None);
                }
                self.state.notify_unauthorized(&message);

                ClientError::Unauthorized(message)
            }
            _ => ClientError::Connection,
        };

        tracing::error!(
            method = %ctx.method,
            url = %ctx.url,
            status = ?status,
            message = %error,
            "Request rejected"
        );
        error
    }
}

/// 会话管理器
pub struct SessionManager {
    requests: RequestService,
    state: Arc<SessionState>,
}

impl SessionManager {
    /// 接管请求服务的响应处理，并恢复上次保存的令牌
    pub fn new(mut requests: RequestService, storage: StorageService) -> Self {
        let state = Arc::new(SessionState {
            storage,
            headers: requests.default_headers(),
            clear_session: AtomicBool::new(false),
            unauthorized_handler: RwLock::new(None),
            base: DefaultHandler::new(requests.is_production()),
        });

        requests.set_handler(Arc::new(SessionHandler {
            state: state.clone(),
        }));

        let stored = state.token();
        state.set_token(stored.as_deref());

        tracing::info!(
            base_url = %requests.base_url(),
            restored = stored.is_some(),
            "Session manager initialized"
        );

        Self { requests, state }
    }

    /// 带认证头的请求服务
    pub fn requests(&self) -> &RequestService {
        &self.requests
    }

    pub fn set_unauthorized_handler<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut handler = self
            .state
            .unauthorized_handler
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *handler = Some(Arc::new(callback));
        tracing::debug!("Registered unauthorized handler");
    }

    /// 设置 401/403 时是否清除会话
    pub fn clear_session_on_unauthorized(&self, clear: bool) {
        self.state.clear_session.store(clear, Ordering::SeqCst);
    }

    pub fn clears_session_on_unauthorized(&self) -> bool {
        self.state.clear_session.load(Ordering::SeqCst)
    }

    /// 仅检查本地是否存在令牌，不访问服务器
    pub fn is_logged_in(&self) -> bool {
        self.state.token().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.state.token()
    }

    /// 最近一次成功登录的响应
    pub fn auth_data(&self) -> Option<AuthResponse> {
        self.state.storage.get(AUTH_STORAGE_KEY)
    }

    /// 登录并保存令牌
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let request = ApiRequest::post("/login").query(&LoginParams { username, password })?;
        let response: AuthResponse = self.requests.send(request).await?;

        if !response.is_success() {
            tracing::error!(status = response.status, username = %username, "Login rejected");
            let message = response
                .error_message()
                .map(str::to_string)
                .unwrap_or_else(|| MSG_LOGIN_FAILED.to_string());
            return Err(ClientError::LoginFailed(message));
        }

        self.state.set_token(Some(&response.token));
        self.state.storage.set(AUTH_STORAGE_KEY, &response);
        tracing::info!(username = %username, user_id = ?response.id, "Logged in");

        Ok(response)
    }

    /// 校验并刷新令牌
    ///
    /// 以探测模式请求 `/refresh`：401/403 总会清除会话，而共享的清除开关保持不变。
    /// 新令牌由响应处理器从响应头中取得。
    pub async fn refresh_token(&self) -> Result<()> {
        self.check_authentication()?;
        self.requests
            .send_raw(ApiRequest::get("/refresh").probe())
            .await?;
        Ok(())
    }

    pub fn logout(&self) {
        self.state.set_token(None);
        tracing::info!("Logged out");
    }

    /// 未登录时直接失败，不发出任何请求
    pub fn check_authentication(&self) -> Result<()> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }
}
