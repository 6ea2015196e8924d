//! Authenticated HTTP client for the Kickoff tournament API
//!
//! Wraps every REST call with bearer-token attachment and transparent
//! access-token refresh:
//! 1. The request interceptor reads the access token from the `TokenStore`
//!    and sends it as `Authorization: Bearer <token>`
//! 2. A 401 on a request that carried a bearer and has not been retried
//!    hands control to the `RefreshCoordinator`
//! 3. The first such request leads a single refresh; 401s arriving while it
//!    is in flight queue behind it
//! 4. On success every queued request replays once with the new token
//! 5. On failure the queue is rejected, the tokens are cleared and the
//!    `Navigator` is sent to the login route with the current path saved

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod navigator;
pub mod refresh;

pub use auth::{AuthResponse, AuthSession, RegisterRequest};
pub use client::{ApiClient, ApiRequest, ApiResponse, MAX_AUTH_RETRIES, RequestContext};
pub use config::ClientConfig;
pub use error::{ApiError, RefreshError, Result};
pub use navigator::{HeadlessNavigator, Navigator, SessionNavigator};
pub use refresh::RefreshCoordinator;
