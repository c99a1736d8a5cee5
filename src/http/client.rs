//! HTTP 请求服务
//!
//! 包装 reqwest，提供绑定 base URL 和默认请求头的实例调用，
//! 以及使用默认处理器的一次性静态调用。

use crate::config::AppConfig;
use crate::error::{ClientError, Result};
use crate::http::handler::{
    ApiResponse, DefaultHandler, RequestContext, RequestFailure, ResponseHandler,
};
use crate::http::request::{ApiRequest, Payload};
use bytes::Bytes;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::Instrument;
use url::Url;
use uuid::Uuid;

/// 每个请求携带的追踪头
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 静态调用共用的客户端
static SHARED_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// 可共享的默认请求头
///
/// 合并是增量的：同名请求头后写覆盖先写，不做深度合并。
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    inner: Arc<RwLock<HeaderMap>>,
}

impl DefaultHeaders {
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            inner: Arc::new(RwLock::new(headers)),
        }
    }

    /// 合并一组请求头
    pub fn merge<I, K, V>(&self, headers: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let parsed = headers
            .into_iter()
            .map(|(k, v)| parse_header(k.as_ref(), v.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        for (name, value) in parsed {
            map.insert(name, value);
        }
        Ok(())
    }

    /// 设置或移除（`None`）单个请求头
    pub fn set(&self, name: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => self.merge([(name, value)]),
            None => {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
                let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
                map.remove(name);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    }

    pub fn snapshot(&self) -> HeaderMap {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
    Ok((header_name, header_value))
}

/// HTTP 请求服务
pub struct RequestService {
    client: Client,
    base_url: String,
    headers: DefaultHeaders,
    handler: Arc<dyn ResponseHandler>,
    production: bool,
}

impl RequestService {
    /// 创建绑定 base URL 的请求服务
    ///
    /// `timeout` 为 None 时不设超时。自定义请求头会叠加在 `Content-Type: application/json` 之上。
    pub fn new<I, K, V>(
        base_url: &str,
        timeout: Option<Duration>,
        headers: I,
        production: bool,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let mut defaults = HeaderMap::new();
        defaults.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let default_headers = DefaultHeaders::new(defaults);
        default_headers.merge(headers)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: default_headers,
            handler: Arc::new(DefaultHandler::new(production)),
            production,
        })
    }

    /// 根据应用配置创建请求服务
    ///
    /// 非生产模式下附加 `Access-Control-Allow-Origin: *`。
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut headers = Vec::new();
        if !config.is_production() {
            headers.push(("Access-Control-Allow-Origin", "*"));
        }
        Self::new(
            &config.api.base_url,
            config.api.timeout(),
            headers,
            config.is_production(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    /// 替换响应处理器
    pub fn set_handler(&mut self, handler: Arc<dyn ResponseHandler>) {
        self.handler = handler;
    }

    /// 更新默认请求头
    pub fn add_headers<I, K, V>(&self, headers: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.headers.merge(headers)
    }

    /// 默认请求头句柄，与本服务共享同一份数据
    pub fn default_headers(&self) -> DefaultHeaders {
        self.headers.clone()
    }

    pub(crate) fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 执行请求并解码 JSON 响应体
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.send_raw(request).await?.json()
    }

    /// 执行请求，返回经过处理器的原始响应
    pub async fn send_raw(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.resolve_url(&request.path);
        let headers = self.headers.snapshot();
        dispatch(&self.client, &url, headers, request, self.handler.as_ref()).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn get_with<T, Q>(&self, path: &str, params: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(ApiRequest::get(path).query(params)?).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(ApiRequest::delete(path)).await
    }

    /// 以 multipart/form-data 上传文件
    pub async fn upload<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        self.send(ApiRequest::post(path).multipart(form)).await
    }

    /// 下载文件，返回原始字节
    pub async fn download(&self, path: &str) -> Result<Bytes> {
        Ok(self.send_raw(ApiRequest::get(path)).await?.body)
    }

    // ---- 静态方法 ----

    /// 不依赖任何实例的一次性请求，`request.path` 必须是完整 URL
    pub async fn fetch<T: DeserializeOwned>(request: ApiRequest) -> Result<T> {
        let url = request.path.clone();
        let handler = DefaultHandler::default();
        dispatch(&SHARED_CLIENT, &url, HeaderMap::new(), request, &handler)
            .await?
            .json()
    }

    pub async fn fetch_get<T: DeserializeOwned>(url: &str) -> Result<T> {
        Self::fetch(ApiRequest::get(url)).await
    }

    pub async fn fetch_post<T, B>(url: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Self::fetch(ApiRequest::post(url).json(body)?).await
    }

    pub async fn fetch_put<T, B>(url: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Self::fetch(ApiRequest::put(url).json(body)?).await
    }

    pub async fn fetch_delete<T: DeserializeOwned>(url: &str) -> Result<T> {
        Self::fetch(ApiRequest::delete(url)).await
    }

    /// 并发发起多个 GET，全部成功才返回，任一失败即失败
    pub async fn get_all<T: DeserializeOwned>(urls: &[&str]) -> Result<Vec<T>> {
        futures::future::try_join_all(urls.iter().map(|url| Self::fetch_get::<T>(url))).await
    }
}

async fn dispatch(
    client: &Client,
    url: &str,
    mut headers: HeaderMap,
    request: ApiRequest,
    handler: &dyn ResponseHandler,
) -> Result<ApiResponse> {
    let request_id = Uuid::new_v4().to_string();

    let mut target =
        Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;
    if !request.query.is_empty() {
        target.query_pairs_mut().extend_pairs(&request.query);
    }

    let ctx = RequestContext {
        method: request.method.clone(),
        url: target.to_string(),
        request_id: request_id.clone(),
        probe: request.probe,
    };

    for (name, value) in &request.headers {
        let (name, value) = parse_header(name, value)?;
        headers.insert(name, value);
    }
    headers.insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(&request_id).map_err(|e| ClientError::InvalidHeader(e.to_string()))?,
    );

    let builder = client.request(request.method.clone(), target);
    let builder = match request.payload {
        Payload::Empty => builder.headers(headers),
        Payload::Json(body) => builder.headers(headers).json(&body),
        Payload::Multipart(form) => {
            // boundary 由 reqwest 生成
            headers.remove(CONTENT_TYPE);
            builder.headers(headers).multipart(form)
        }
    };

    let span = tracing::debug_span!(
        "http_client_request",
        request_id = %request_id,
        method = %ctx.method,
        url = %ctx.url,
    );

    async move {
        let outcome = match builder.send().await {
            Ok(response) => {
                let status = response.status();
                let response_url = response.url().to_string();
                let response_headers = response.headers().clone();
                match response.bytes().await {
                    Ok(body) => Ok(ApiResponse {
                        status,
                        url: response_url,
                        headers: response_headers,
                        body,
                    }),
                    Err(e) => Err(RequestFailure::Transport(e)),
                }
            }
            Err(e) => Err(RequestFailure::Transport(e)),
        };

        let status_label = match &outcome {
            Ok(response) => response.status.as_u16().to_string(),
            Err(failure) => failure
                .status()
                .map(|s| s.as_u16().to_string())
                .unwrap_or_else(|| "error".to_string()),
        };
        metrics::counter!(
            "http_client_requests_total",
            "method" => ctx.method.to_string(),
            "status" => status_label
        )
        .increment(1);

        match outcome {
            Ok(response) if response.status.is_success() => handler.on_success(&ctx, response),
            Ok(response) => Err(handler.on_error(&ctx, RequestFailure::Status(response))),
            Err(failure) => Err(handler.on_error(&ctx, failure)),
        }
    }
    .instrument(span)
    .await
}
