//! 请求描述

use crate::error::{ClientError, Result};
use reqwest::multipart::Form;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// 请求体
#[derive(Debug, Default)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    Multipart(Form),
}

/// 一次 API 调用
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub payload: Payload,
    /// 探测模式：401/403 时总是清除会话，不受会话开关影响
    pub probe: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            payload: Payload::Empty,
            probe: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// 添加单个查询参数
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// 从可序列化对象添加查询参数，值为 null 的字段会被忽略
    pub fn query<Q: Serialize + ?Sized>(mut self, params: &Q) -> Result<Self> {
        match serde_json::to_value(params)? {
            Value::Object(map) => {
                for (key, value) in map {
                    match value {
                        Value::Null => {}
                        Value::String(s) => self.query.push((key, s)),
                        other => self.query.push((key, other.to_string())),
                    }
                }
                Ok(self)
            }
            Value::Null => Ok(self),
            _ => Err(ClientError::Validation(
                "query parameters must serialize to an object".to_string(),
            )),
        }
    }

    /// 添加请求头，同名时后写覆盖先写
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.payload = Payload::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.payload = Payload::Multipart(form);
        self
    }

    pub fn probe(mut self) -> Self {
        self.probe = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct PageParams<'a> {
        page: u32,
        size: Option<u32>,
        sort: Option<&'a str>,
        ascending: Option<bool>,
    }

    #[test]
    fn test_query_skips_null_fields() {
        let request = ApiRequest::get("/accounts/page")
            .query(&PageParams {
                page: 2,
                size: None,
                sort: Some("username"),
                ascending: Some(true),
            })
            .unwrap();

        assert_eq!(
            request.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("sort".to_string(), "username".to_string()),
                ("ascending".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_rejects_non_object() {
        assert!(ApiRequest::get("/user/check").query(&vec![1, 2]).is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let request = ApiRequest::delete("/accounts/3");
        assert_eq!(request.method, Method::DELETE);
        assert!(!request.probe);
        assert!(matches!(request.payload, Payload::Empty));
        assert!(ApiRequest::get("/refresh").probe().probe);
    }
}
