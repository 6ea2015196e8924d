//! HTTP client core with bearer interception and 401 recovery
//!
//! Every call runs through `dispatch`, which:
//! 1. Attaches the stored access token as a bearer (request interceptor)
//! 2. Returns 2xx responses, surfaces other non-401 statuses as errors
//! 3. On 401 decides between a plain failure (no bearer sent, or already
//!    retried) and recovery through the `RefreshCoordinator`
//! 4. Replays the request once with the fresh token
//!
//! The retry bound travels in an immutable `RequestContext`; a replay gets a
//! new context with the attempt count bumped instead of mutating anything
//! shared.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use session::{TokenPair, TokenStore};
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, RefreshError, Result};
use crate::navigator::{self, Navigator};
use crate::refresh::{RefreshCoordinator, RefreshOutcome};

/// Refresh-and-replay cycles allowed per request.
pub const MAX_AUTH_RETRIES: u32 = 1;

/// Per-request identity and retry bookkeeping.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    attempt: u32,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: format!("req_{}", uuid::Uuid::new_v4().as_simple()),
            attempt: 0,
        }
    }

    /// Context for the replay of this request.
    pub fn retry(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            attempt: self.attempt + 1,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether a 401 on this attempt may still trigger refresh-and-replay.
    pub fn can_retry(&self) -> bool {
        self.attempt < MAX_AUTH_RETRIES
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A replayable API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    anonymous: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            anonymous: false,
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

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send without a bearer and never refresh on 401 (login, register).
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Fully-read response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn into_error(self) -> ApiError {
        ApiError::Status {
            status: self.status,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        }
    }
}

/// Authenticated client for the REST backend.
///
/// Owns its refresh coordinator, so two clients never share refresh state.
/// Share one client (e.g. behind an `Arc`) to get single-flight refresh
/// across callers.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    coordinator: RefreshCoordinator,
}

impl ApiClient {
    /// Validate `config` and build the client with JSON default headers and
    /// the configured request timeout.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Config(format!("building HTTP client: {e}")))?;

        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            refresh_timeout_secs = config.refresh_timeout_secs,
            "api client ready"
        );

        Ok(Self {
            http,
            coordinator: RefreshCoordinator::new(config.queue_wait_timeout()),
            config,
            store,
            navigator,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Whether a token refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// GET `path` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(&ApiRequest::get(path)).await?.json()
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path).json(encode(body)?);
        self.send(&request).await?.json()
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::put(path).json(encode(body)?);
        self.send(&request).await?.json()
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::patch(path).json(encode(body)?);
        self.send(&request).await?.json()
    }

    /// DELETE `path`, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(&ApiRequest::delete(path)).await.map(|_| ())
    }

    /// Send `request`, recovering once from an expired access token.
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.dispatch(request, RequestContext::new()).await
    }

    #[instrument(skip_all, fields(request_id = %ctx.request_id(), method = %request.method, path = %request.path))]
    async fn dispatch(&self, request: &ApiRequest, ctx: RequestContext) -> Result<ApiResponse> {
        let mut ctx = ctx;
        let mut bearer = if request.anonymous {
            None
        } else {
            self.store.access_token().await
        };

        loop {
            let response = self.execute(request, bearer.as_deref()).await?;
            let status = response.status;

            if status.is_success() {
                return Ok(response);
            }
            if status == StatusCode::FORBIDDEN {
                warn!(
                    attempt = ctx.attempt(),
                    had_bearer = bearer.is_some(),
                    "request forbidden"
                );
            }
            if status != StatusCode::UNAUTHORIZED {
                return Err(response.into_error());
            }

            let Some(sent) = bearer.take() else {
                debug!("401 without bearer credential, not refreshing");
                return Err(response.into_error());
            };
            if !ctx.can_retry() {
                warn!(attempt = ctx.attempt(), "401 after refresh replay, giving up");
                return Err(response.into_error());
            }

            let Some(fresh) = self.fresh_token(&sent).await? else {
                debug!("session ended while request was in flight, not refreshing");
                return Err(match self.coordinator.last_failure() {
                    Some(failure) => ApiError::Refresh(failure),
                    None => response.into_error(),
                });
            };
            ctx = ctx.retry();
            debug!(attempt = ctx.attempt(), "replaying request with refreshed token");
            bearer = Some(fresh);
        }
    }

    /// One HTTP exchange with `bearer` attached when present.
    async fn execute(&self, request: &ApiRequest, bearer: Option<&str>) -> Result<ApiResponse> {
        let url = self.config.url(&request.path);
        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.timeout())
            } else {
                ApiError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.config.timeout())
            } else {
                ApiError::Http(format!("reading response body: {e}"))
            }
        })?;

        crate::metrics::record_request(request.method.as_str(), status.as_u16());
        debug!(status = status.as_u16(), bytes = body.len(), "response received");

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    /// Token to replay with after a 401 for a request sent with `sent`.
    ///
    /// If the store already holds a different token, another request rotated
    /// it while this one was in flight; reuse it instead of refreshing again.
    /// An empty store means the session was torn down (failed refresh or
    /// logout) in the meantime, and yields `None`.
    async fn fresh_token(&self, sent: &str) -> Result<Option<String>> {
        match self.store.access_token().await {
            None => return Ok(None),
            Some(current) if current != sent => {
                debug!("access token already rotated, replaying with current token");
                return Ok(Some(current));
            }
            Some(_) => {}
        }

        let this = self;
        self.coordinator
            .refresh(move || this.refresh_session())
            .await
            .map(Some)
            .map_err(ApiError::from)
    }

    /// Leader-side refresh: exchange, persist, or expire the session.
    async fn refresh_session(&self) -> RefreshOutcome {
        match self.exchange_refresh_token().await {
            Ok(pair) => {
                let access = pair.access_token.clone();
                if let Err(e) = self.store.save(pair).await {
                    warn!(error = %e, "failed to persist refreshed tokens");
                }
                crate::metrics::record_refresh("success");
                info!("session refreshed");
                Ok(access)
            }
            Err(e) => {
                crate::metrics::record_refresh("failure");
                warn!(error = %e, "session refresh failed, clearing tokens");
                self.expire_session().await;
                Err(RefreshError::Session(e))
            }
        }
    }

    async fn exchange_refresh_token(&self) -> session::Result<TokenPair> {
        let refresh = self
            .store
            .refresh_token()
            .await
            .ok_or(session::Error::MissingRefreshToken)?;
        session::refresh_tokens(
            &self.http,
            &self.config.url(&self.config.refresh_path),
            &refresh,
            self.config.refresh_timeout(),
        )
        .await
    }

    /// Purge tokens and send the user to log in again.
    async fn expire_session(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear tokens after refresh failure");
        }
        navigator::redirect_to_login(self.navigator.as_ref(), &self.config.login_route);
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value> {
    serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))
}
