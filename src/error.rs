//! 统一错误模型
//! 客户端所有失败最终都以一条可直接展示的消息呈现给调用方

use thiserror::Error;

/// 未登录时的预检错误消息
pub const MSG_NOT_AUTHENTICATED: &str = "Not authenticated";
/// HTTP 400 的默认消息
pub const MSG_BAD_INPUT: &str = "Fehlerhafte Eingabe";
/// HTTP 401/403 的默认消息
pub const MSG_UNAUTHORIZED: &str = "Unauthorized";
/// 其他失败的统一消息
pub const MSG_CONNECTION: &str = "Verbindungsprobleme zum Server";
/// 登录失败的默认消息
pub const MSG_LOGIN_FAILED: &str = "Anmeldung fehlgeschlagen";

/// 客户端错误类型
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{}", MSG_NOT_AUTHENTICATED)]
    NotAuthenticated,

    #[error("{0}")]
    BadInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{}", MSG_CONNECTION)]
    Connection,

    #[error("{0}")]
    LoginFailed(String),

    #[error("Request failed with status {status}: {url}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// 关联的 HTTP 状态码（若有）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::BadInput(_) | ClientError::Validation(_) => Some(400),
            ClientError::Unauthorized(_) | ClientError::NotAuthenticated => Some(401),
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// 面向用户的消息（不包含技术细节）
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Http { .. } | ClientError::Transport(_) => MSG_CONNECTION.to_string(),
            ClientError::Decode(_) => MSG_CONNECTION.to_string(),
            ClientError::Config(_) => "Configuration error".to_string(),
            other => other.to_string(),
        }
    }

    /// 是否为认证相关错误
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ClientError::NotAuthenticated | ClientError::Unauthorized(_)
        ) || matches!(self, ClientError::Http { status, .. } if *status == 401 || *status == 403)
    }

    pub fn validation(errors: &validator::ValidationErrors) -> Self {
        ClientError::Validation(errors.to_string())
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for ClientError {
    fn from(e: config::ConfigError) -> Self {
        ClientError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
