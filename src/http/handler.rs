//! 响应处理策略

use crate::error::{ClientError, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

/// 单次请求的上下文，交给处理器做决策
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub url: String,
    pub request_id: String,
    pub probe: bool,
}

/// 已收到的 HTTP 响应
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    /// 读取响应头（名称不区分大小写）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 解析 JSON 响应体，空响应体按 null 解析
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 请求失败的两种形态
#[derive(Debug)]
pub enum RequestFailure {
    /// 服务器返回了 2xx 以外的状态码
    Status(ApiResponse),
    /// 请求已发出但没有收到响应（连接失败、超时等）
    Transport(reqwest::Error),
}

impl RequestFailure {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestFailure::Status(response) => Some(response.status),
            RequestFailure::Transport(e) => e.status(),
        }
    }

    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            RequestFailure::Status(response) => Some(response),
            RequestFailure::Transport(_) => None,
        }
    }
}

/// 响应处理器
///
/// 对经过同一个 `RequestService` 的所有请求统一生效。
pub trait ResponseHandler: Send + Sync {
    /// 处理 2xx 响应，返回值会被继续解码
    fn on_success(&self, ctx: &RequestContext, response: ApiResponse) -> Result<ApiResponse>;

    /// 把失败转换为交给调用方的错误
    fn on_error(&self, ctx: &RequestContext, failure: RequestFailure) -> ClientError;
}

/// 默认处理器：记录日志并原样返回
#[derive(Debug, Clone, Copy)]
pub struct DefaultHandler {
    production: bool,
}

impl DefaultHandler {
    pub fn new(production: bool) -> Self {
        Self { production }
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    pub fn log_success(&self, ctx: &RequestContext, response: &ApiResponse) {
        if self.production {
            tracing::debug!(
                status = response.status.as_u16(),
                url = %response.url,
                request_id = %ctx.request_id,
                bytes = response.body.len(),
                "Request succeeded"
            );
        } else {
            tracing::info!(
                status = response.status.as_u16(),
                url = %response.url,
                request_id = %ctx.request_id,
                body = %response.text(),
                "Request succeeded"
            );
        }
    }

    pub fn log_failure(&self, ctx: &RequestContext, failure: &RequestFailure) {
        match failure {
            RequestFailure::Status(response) => {
                if self.production {
                    tracing::debug!(status = response.status.as_u16(), url = %response.url, "Request failed");
                } else {
                    tracing::warn!(
                        status = response.status.as_u16(),
                        url = %response.url,
                        request_id = %ctx.request_id,
                        "Request failed"
                    );
                }
            }
            RequestFailure::Transport(e) if e.is_builder() => {
                tracing::error!(url = %ctx.url, error = %e, "Failed to build request");
            }
            RequestFailure::Transport(e) => {
                tracing::error!(
                    method = %ctx.method,
                    url = %ctx.url,
                    request_id = %ctx.request_id,
                    error = %e,
                    "No response received"
                );
            }
        }
    }
}

impl Default for DefaultHandler {
    fn default() -> Self {
        Self::new(!cfg!(debug_assertions))
    }
}

impl ResponseHandler for DefaultHandler {
    fn on_success(&self, ctx: &RequestContext, response: ApiResponse) -> Result<ApiResponse> {
        self.log_success(ctx, &response);
        Ok(response)
    }

    fn on_error(&self, ctx: &RequestContext, failure: RequestFailure) -> ClientError {
        self.log_failure(ctx, &failure);
        match failure {
            RequestFailure::Status(response) => ClientError::Http {
                status: response.status.as_u16(),
                url: response.url.clone(),
                body: response.text(),
            },
            RequestFailure::Transport(e) => ClientError::Transport(e),
        }
    }
}
