//! Platform API Client
//!
//! HTTP client for the platform REST API. Attaches the bearer token from
//! the session store, and transparently recovers from an expired access
//! token: one silent refresh, one retry, nothing more. Requests to the
//! login and refresh endpoints never enter the recovery path.
//!
//! Concurrent requests that each observe a 401 serialize behind a single
//! in-flight refresh; late arrivals adopt the fresh token instead of
//! issuing a duplicate refresh call.

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::dto::TokenResponse;
use super::error::{ApiError, ApiResult};
use crate::session::SessionStore;

/// Credential exchange endpoint, exempt from the refresh path
pub const LOGIN_PATH: &str = "/auth/login";
/// Silent renewal endpoint, exempt from the refresh path
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Fallback when the server reports a failure without a usable message
const GENERIC_FAILURE: &str = "Something went wrong";

/// Configuration for the platform API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL including the `/api` prefix (e.g. "http://localhost:8080/api")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Body of an outgoing request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    /// Serialized as JSON with the matching content type
    Json(Value),
    /// Handed to the transport without an explicit content type, so the
    /// multipart boundary is set for us
    Multipart(FilePayload),
}

/// Binary form payload, kept as bytes so a retried request can rebuild it
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Per-request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Extra headers, applied after the defaults
    pub headers: Vec<(String, String)>,
    /// Explicit bearer token, overriding the stored one
    pub token: Option<String>,
    /// Send cookies (the refresh cookie) with the request
    pub include_credentials: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            token: None,
            include_credentials: true,
        }
    }
}

impl RequestOptions {
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn without_credentials(mut self) -> Self {
        self.include_credentials = false;
        self
    }
}

/// Platform REST API client
pub struct ApiClient {
    /// Transport with the cookie store carrying the HttpOnly refresh cookie
    http: Client,
    /// Cookie-less transport for requests that opt out of credentials
    bare: Client,
    config: ApiClientConfig,
    store: Arc<dyn SessionStore>,
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    /// Create a new client sharing the given session store.
    ///
    /// The client is the only writer of the access token; the session
    /// manager shares the store for the profile mirror.
    pub fn new(config: ApiClientConfig, store: Arc<dyn SessionStore>) -> Self {
        let timeout = std::time::Duration::from_millis(config.request_timeout_ms);

        let http = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        let bare = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        let config = ApiClientConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };

        Self {
            http,
            bare,
            config,
            store,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Issue a request against a relative endpoint path.
    ///
    /// Returns the parsed JSON payload, or `None` when the body is empty or
    /// not JSON. Non-2xx responses become [`ApiError::Api`] with the message
    /// taken from the body's `message` or `error` field.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        opts: RequestOptions,
    ) -> ApiResult<Option<Value>> {
        let token = match &opts.token {
            Some(token) => Some(token.clone()),
            None => self.store.access_token().await?,
        };

        let response = self
            .execute(&method, path, &body, &opts, token.as_deref())
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED && !is_session_exempt(path) {
            let fresh = self.refresh_access_token(token.as_deref()).await?;
            tracing::debug!(path = %path, "Access token renewed, retrying request once");

            let retry = self
                .execute(&method, path, &body, &opts, Some(&fresh))
                .await?;
            return read_payload(retry).await;
        }

        read_payload(response).await
    }

    pub async fn get(&self, path: &str) -> ApiResult<Option<Value>> {
        self.request(Method::GET, path, RequestBody::Empty, RequestOptions::default())
            .await
    }

    pub async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<Option<Value>> {
        self.request(
            Method::POST,
            path,
            RequestBody::Json(to_json(body)?),
            RequestOptions::default(),
        )
        .await
    }

    pub async fn patch_json<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<Option<Value>> {
        self.request(
            Method::PATCH,
            path,
            RequestBody::Json(to_json(body)?),
            RequestOptions::default(),
        )
        .await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Option<Value>> {
        self.request(Method::DELETE, path, RequestBody::Empty, RequestOptions::default())
            .await
    }

    pub async fn patch_multipart(
        &self,
        path: &str,
        payload: FilePayload,
    ) -> ApiResult<Option<Value>> {
        self.request(
            Method::PATCH,
            path,
            RequestBody::Multipart(payload),
            RequestOptions::default(),
        )
        .await
    }

    /// Send a request once, without any recovery handling
    async fn execute(
        &self,
        method: &Method,
        path: &str,
        body: &RequestBody,
        opts: &RequestOptions,
        token: Option<&str>,
    ) -> ApiResult<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let transport = if opts.include_credentials {
            &self.http
        } else {
            &self.bare
        };

        let mut builder = transport
            .request(method.clone(), &url)
            .header("X-Request-Id", uuid::Uuid::new_v4().to_string());

        for (name, value) in &opts.headers {
            builder = builder.header(name, value);
        }

        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(payload) => {
                let part = reqwest::multipart::Part::bytes(payload.bytes.clone())
                    .file_name(payload.file_name.clone())
                    .mime_str(&payload.mime)
                    .map_err(ApiError::Request)?;

                builder.multipart(reqwest::multipart::Form::new().part(payload.field.clone(), part))
            }
        };

        builder.send().await.map_err(ApiError::from_transport)
    }

    /// Renew the access token through the refresh cookie.
    ///
    /// Exactly one refresh runs at a time; a caller that waited out another
    /// refresh adopts the fresh token instead of issuing its own call. On
    /// any failure the whole local session is cleared and the terminal
    /// [`ApiError::SessionExpired`] is returned.
    async fn refresh_access_token(&self, stale_token: Option<&str>) -> ApiResult<String> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.store.access_token().await? {
            if stale_token != Some(current.as_str()) {
                return Ok(current);
            }
        }

        tracing::debug!("Access token rejected, attempting silent refresh");

        let url = format!("{}{}", self.config.base_url, REFRESH_PATH);
        let outcome = self
            .http
            .post(&url)
            .header("X-Request-Id", uuid::Uuid::new_v4().to_string())
            .send()
            .await;

        let response = match outcome {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "Token refresh rejected");
                return self.expire_session().await;
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", ApiError::from_transport(e));
                return self.expire_session().await;
            }
        };

        let token: TokenResponse = match response.json().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Token refresh returned no usable token: {}", e);
                return self.expire_session().await;
            }
        };

        self.store.set_access_token(&token.access_token).await?;
        Ok(token.access_token)
    }

    /// Clear token, cached profile and auth flag, then report expiry
    async fn expire_session(&self) -> ApiResult<String> {
        self.store.clear().await?;
        Err(ApiError::SessionExpired)
    }
}

/// Decode a response payload into a typed value.
pub fn decode<T: DeserializeOwned>(payload: Option<Value>) -> ApiResult<T> {
    let value =
        payload.ok_or_else(|| ApiError::UnexpectedResponse("empty response body".to_string()))?;
    serde_json::from_value(value).map_err(|e| ApiError::UnexpectedResponse(e.to_string()))
}

fn to_json<B: Serialize>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::Validation(format!("Unserializable request body: {}", e)))
}

/// Login and refresh never trigger the refresh-retry path
fn is_session_exempt(path: &str) -> bool {
    path.starts_with(LOGIN_PATH) || path.starts_with(REFRESH_PATH)
}

/// Read a response body as text, parse JSON only when non-empty, and map
/// non-2xx statuses to errors
async fn read_payload(response: reqwest::Response) -> ApiResult<Option<Value>> {
    let status = response.status();
    let text = response.text().await.map_err(ApiError::from_transport)?;

    let payload = if text.is_empty() {
        None
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Discarding unparseable response body: {}", e);
                None
            }
        }
    };

    if status.is_success() {
        return Ok(payload);
    }

    let message = payload
        .as_ref()
        .and_then(extract_error_message)
        .unwrap_or_else(|| GENERIC_FAILURE.to_string());

    Err(ApiError::Api {
        status: status.as_u16(),
        message,
    })
}

fn extract_error_message(payload: &Value) -> Option<String> {
    payload
        .get("message")
        .or_else(|| payload.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
