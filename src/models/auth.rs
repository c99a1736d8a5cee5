//! 认证相关模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 登录凭据（作为查询参数发送）
#[derive(Debug, Serialize)]
pub struct LoginParams<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// 登录响应
///
/// 成功时包含 token，失败时包含 error/errors 等字段。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub status: u16,
    #[serde(default)]
    pub timestamp: i64,

    // 成功字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    // 失败字段
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl AuthResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// 服务端给出的第一条错误信息
    pub fn error_message(&self) -> Option<&str> {
        self.errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(String::as_str)
            .or(self.error.as_deref())
    }

    /// 登录时间（timestamp 为毫秒）
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}
