//! Usage: Outbound request plumbing (bearer injection, cookie channel, replayable requests).

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::client::config::ClientConfig;
use crate::session::store::TokenStore;
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::security::mask_token;

/// Authentication handshake endpoints. Their authorization failures propagate
/// directly to the caller; refreshing in response to a failed login would loop.
const HANDSHAKE_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/verify-code",
    "/auth/resend-code",
];

pub(crate) const REFRESH_PATH: &str = "/auth/refresh-token";

pub(crate) fn is_handshake_path(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    HANDSHAKE_PATHS.contains(&path)
}

/// A replayable description of one HTTP call. Captured up front so the refresh
/// coordinator can re-issue the identical request after a token rotation.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Bytes>,
    /// Set when the request has already been replayed once after a refresh;
    /// a second 401 is then surfaced instead of triggering another refresh.
    pub(crate) retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post_json<T: Serialize>(path: impl Into<String>, body: &T) -> AppResult<Self> {
        Self::new(Method::POST, path).with_json(body)
    }

    pub fn patch_json<T: Serialize>(path: impl Into<String>, body: &T) -> AppResult<Self> {
        Self::new(Method::PATCH, path).with_json(body)
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> AppResult<Self> {
        let encoded = serde_json::to_vec(body)
            .map_err(|e| format!("VALIDATION_ERROR: failed to encode request body: {e}"))?;
        self.body = Some(Bytes::from(encoded));
        self.headers
            .push((CONTENT_TYPE.as_str().to_string(), "application/json".into()));
        Ok(self)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }
}

/// A buffered response: status plus body bytes, passed through unchanged
/// unless the caller opts into [`ApiResponse::expect_success`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| format!("VALIDATION_ERROR: failed to decode response body: {e}").into())
    }

    pub fn value(&self) -> AppResult<Value> {
        self.json::<Value>()
    }

    /// Convert a non-2xx response into a coded error, extracting whatever
    /// message the backend included.
    pub fn expect_success(self, failure_code: &str) -> AppResult<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        let (code, message) = parse_error_details(&self.body);
        let code = code.unwrap_or_else(|| failure_code.to_string());
        let message = message.unwrap_or_else(|| {
            format!(
                "backend returned status={} body={}",
                self.status.as_u16(),
                sanitize_body_snippet(&self.body)
            )
        });
        Err(AppError::new(code, message))
    }
}

/// Pull `{code?, message?}` out of a backend error payload, tolerating both the
/// flat `{error, message}` shape and nested `{error: {code, message}}`.
pub(crate) fn parse_error_details(body: &[u8]) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let mut code = value
        .get("code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    let mut message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    if let Some(error_value) = value.get("error") {
        if let Some(err_str) = error_value.as_str() {
            if message.is_none() {
                message = Some(err_str.trim().to_string());
            }
        } else if let Some(err_obj) = error_value.as_object() {
            if code.is_none() {
                code = err_obj
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
            if message.is_none() {
                message = err_obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
        }
    }

    (code, message)
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lc = key.trim().to_ascii_lowercase();
    key_lc.contains("token") || key_lc.contains("secret") || key_lc.contains("password")
}

fn redact_sensitive_json_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if is_sensitive_key(key) {
                    if let Some(raw) = nested.as_str() {
                        *nested = Value::String(mask_token(raw));
                        continue;
                    }
                }
                redact_sensitive_json_fields(nested);
            }
        }
        Value::Array(items) => {
            for nested in items {
                redact_sensitive_json_fields(nested);
            }
        }
        _ => {}
    }
}

pub(crate) fn sanitize_body_snippet(body: &[u8]) -> String {
    if let Ok(mut value) = serde_json::from_slice::<Value>(body) {
        redact_sensitive_json_fields(&mut value);
        if let Ok(encoded) = serde_json::to_string(&value) {
            return encoded.chars().take(500).collect();
        }
    }
    String::from_utf8_lossy(body).chars().take(500).collect()
}

/// Issues HTTP calls against the configured base URL, attaching the bearer
/// token from the store when one exists. Cookies always travel with the
/// request so the cookie-based refresh channel works alongside the header.
pub(crate) struct RequestDispatcher {
    http: reqwest::Client,
    base_url: String,
    store: Arc<TokenStore>,
}

impl RequestDispatcher {
    pub(crate) fn new(http: reqwest::Client, config: &ClientConfig, store: Arc<TokenStore>) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            store,
        }
    }

    pub(crate) fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request. No authorization-failure handling happens here; the
    /// caller decides what a 401 means (see `MedikartClient::execute`).
    pub(crate) async fn send(&self, request: &ApiRequest) -> AppResult<ApiResponse> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("VALIDATION_ERROR: invalid header name {name:?}: {e}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| format!("VALIDATION_ERROR: invalid header value: {e}"))?;
            headers.insert(name, value);
        }

        let token = self.store.access_token();
        if let Some(token) = token.as_deref() {
            let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| format!("VALIDATION_ERROR: access token not header-safe: {e}"))?;
            headers.insert(AUTHORIZATION, bearer);
        }

        let mut builder = self
            .http
            .request(request.method.clone(), self.url_for(&request.path))
            .headers(headers);
        if let Some(body) = request.body.clone() {
            builder = builder.body(body);
        }

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            retried = request.retried,
            token = %token.as_deref().map(mask_token).unwrap_or_default(),
            "dispatching request"
        );

        let response = builder.send().await.map_err(|e| {
            AppError::with_source(
                codes::NETWORK_ERROR,
                format!("request to {} failed: {e}", request.path),
                e,
            )
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            AppError::with_source(
                codes::NETWORK_ERROR,
                format!("failed to read response from {}: {e}", request.path),
                e,
            )
        })?;

        Ok(ApiResponse { status, body })
    }
}
