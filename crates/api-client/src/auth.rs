//! Session lifecycle on top of `ApiClient`: login, register, logout and the
//! current user.

use serde::{Deserialize, Serialize};
use session::TokenPair;
use tracing::info;

use crate::client::{ApiClient, ApiRequest};
use crate::error::{ApiError, Result};

/// Body returned by login and register.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

impl std::fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// New account details.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: Option<serde_json::Value>,
    /// Page the user was sent back to, if one was saved before a redirect.
    pub return_to: Option<String>,
}

impl ApiClient {
    /// Exchange credentials for a token pair and persist it.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let request = ApiRequest::post(session::LOGIN_PATH)
            .json(serde_json::json!({ "email": email, "password": password }))
            .anonymous();
        let auth: AuthResponse = self.send(&request).await?.json()?;
        self.store_session(auth.access_token, auth.refresh_token)
            .await?;

        let return_to = self.navigator().take_return_path();
        if let Some(path) = &return_to {
            self.navigator().navigate(path);
        }
        info!(returning = return_to.is_some(), "logged in");
        Ok(AuthSession {
            user: auth.user,
            return_to,
        })
    }

    /// Create an account; the backend logs the new user in.
    pub async fn register(&self, details: &RegisterRequest) -> Result<AuthSession> {
        let body =
            serde_json::to_value(details).map_err(|e| ApiError::Encode(e.to_string()))?;
        let request = ApiRequest::post(session::REGISTER_PATH)
            .json(body)
            .anonymous();
        let auth: AuthResponse = self.send(&request).await?.json()?;
        self.store_session(auth.access_token, auth.refresh_token)
            .await?;
        info!("registered new account");
        Ok(AuthSession {
            user: auth.user,
            return_to: None,
        })
    }

    /// Drop the stored tokens. Safe to call when already logged out.
    pub async fn logout(&self) -> Result<()> {
        self.store().clear().await?;
        info!("logged out");
        Ok(())
    }

    /// Profile of the logged-in user.
    pub async fn current_user(&self) -> Result<serde_json::Value> {
        self.get(session::CURRENT_USER_PATH).await
    }

    /// Whether an access token is stored. Says nothing about its validity.
    pub async fn is_authenticated(&self) -> bool {
        self.store().access_token().await.is_some()
    }

    async fn store_session(&self, access_token: String, refresh_token: String) -> Result<()> {
        self.store()
            .save(TokenPair {
                access_token,
                refresh_token,
            })
            .await
            .map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::navigator::{HeadlessNavigator, Navigator, SessionNavigator};
    use axum::Json;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, post};
    use session::{MemoryTokenStore, TokenStore};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn login(Json(body): Json<serde_json::Value>) -> Response {
        if body["email"] == "coach@club.test" && body["password"] == "hunter2" {
            Json(serde_json::json!({
                "accessToken": "access-1",
                "refreshToken": "refresh-1",
                "user": { "email": "coach@club.test", "role": "organizer" }
            }))
            .into_response()
        } else {
            (StatusCode::UNAUTHORIZED, "invalid credentials").into_response()
        }
    }

    async fn register(Json(body): Json<serde_json::Value>) -> Response {
        if body["email"] == "taken@club.test" {
            return (StatusCode::CONFLICT, "email already registered").into_response();
        }
        Json(serde_json::json!({
            "accessToken": "access-new",
            "refreshToken": "refresh-new",
            "user": { "firstName": body["firstName"], "lastName": body["lastName"] }
        }))
        .into_response()
    }

    async fn me(headers: HeaderMap) -> Response {
        match headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some("Bearer access-1") => {
                Json(serde_json::json!({ "email": "coach@club.test" })).into_response()
            }
            _ => (StatusCode::UNAUTHORIZED, "no session").into_response(),
        }
    }

    async fn serve() -> String {
        let app = axum::Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/me", get(me))
            .route(
                "/api/auth/refresh-token",
                post(|| async { (StatusCode::UNAUTHORIZED, "refresh expired") }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn client(base: &str, store: Arc<MemoryTokenStore>, nav: Arc<dyn Navigator>) -> ApiClient {
        ApiClient::new(ClientConfig::new(base), store, nav).unwrap()
    }

    #[tokio::test]
    async fn login_persists_tokens_and_returns_user() {
        let base = serve().await;
        let store = Arc::new(MemoryTokenStore::new());
        let api = client(&base, store.clone(), Arc::new(HeadlessNavigator));

        let session = api.login("coach@club.test", "hunter2").await.unwrap();

        assert_eq!(session.user.unwrap()["role"], "organizer");
        assert!(session.return_to.is_none());
        assert_eq!(store.access_token().await.as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("refresh-1"));
        assert!(api.is_authenticated().await);
    }

    #[tokio::test]
    async fn login_returns_to_saved_path() {
        let base = serve().await;
        let nav = Arc::new(SessionNavigator::at("/auth/login"));
        nav.save_return_path("/dashboard/tournaments/42");
        let api = client(&base, Arc::new(MemoryTokenStore::new()), nav.clone());

        let session = api.login("coach@club.test", "hunter2").await.unwrap();

        assert_eq!(session.return_to.as_deref(), Some("/dashboard/tournaments/42"));
        assert_eq!(nav.history(), vec!["/dashboard/tournaments/42"]);
        assert!(nav.saved_return_path().is_none());
    }

    #[tokio::test]
    async fn bad_credentials_are_not_refreshed() {
        let base = serve().await;
        let store = Arc::new(MemoryTokenStore::with_tokens(TokenPair::new(
            "old-access",
            "old-refresh",
        )));
        let nav = Arc::new(SessionNavigator::at("/auth/login"));
        let api = client(&base, store.clone(), nav.clone());

        let err = api.login("coach@club.test", "wrong").await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        // No refresh was attempted, so nothing was cleared or redirected
        assert_eq!(store.access_token().await.as_deref(), Some("old-access"));
        assert!(nav.history().is_empty());
    }

    #[tokio::test]
    async fn register_persists_tokens() {
        let base = serve().await;
        let store = Arc::new(MemoryTokenStore::new());
        let api = client(&base, store.clone(), Arc::new(HeadlessNavigator));

        let session = api
            .register(&RegisterRequest {
                email: "new@club.test".into(),
                password: "s3cret".into(),
                first_name: "Ana".into(),
                last_name: "Silva".into(),
            })
            .await
            .unwrap();

        let user = session.user.unwrap();
        assert_eq!(user["firstName"], "Ana");
        assert_eq!(user["lastName"], "Silva");
        assert_eq!(store.refresh_token().await.as_deref(), Some("refresh-new"));
    }

    #[tokio::test]
    async fn register_conflict_is_surfaced() {
        let base = serve().await;
        let store = Arc::new(MemoryTokenStore::new());
        let api = client(&base, store.clone(), Arc::new(HeadlessNavigator));

        let err = api
            .register(&RegisterRequest {
                email: "taken@club.test".into(),
                password: "s3cret".into(),
                first_name: "Ana".into(),
                last_name: "Silva".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert!(!api.is_authenticated().await);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let base = serve().await;
        let store = Arc::new(MemoryTokenStore::with_tokens(TokenPair::new("a", "r")));
        let api = client(&base, store.clone(), Arc::new(HeadlessNavigator));

        api.logout().await.unwrap();
        assert!(!api.is_authenticated().await);
        assert!(store.refresh_token().await.is_none());

        api.logout().await.unwrap();
        assert!(!api.is_authenticated().await);
    }

    #[tokio::test]
    async fn current_user_uses_stored_session() {
        let base = serve().await;
        let api = client(
            &base,
            Arc::new(MemoryTokenStore::new()),
            Arc::new(HeadlessNavigator),
        );

        api.login("coach@club.test", "hunter2").await.unwrap();
        let user = api.current_user().await.unwrap();
        assert_eq!(user["email"], "coach@club.test");
    }

    #[tokio::test]
    async fn current_user_with_dead_session_expires_it() {
        let base = serve().await;
        let store = Arc::new(MemoryTokenStore::with_tokens(TokenPair::new(
            "expired", "revoked",
        )));
        let nav = Arc::new(SessionNavigator::at("/profile"));
        let api = client(&base, store.clone(), nav.clone());

        let err = api.current_user().await.unwrap_err();

        assert!(matches!(err, ApiError::Refresh(_)), "got {err:?}");
        assert!(!api.is_authenticated().await);
        assert_eq!(nav.saved_return_path().as_deref(), Some("/profile"));
        assert_eq!(nav.history(), vec!["/auth/login"]);
    }

    #[test]
    fn auth_response_debug_hides_tokens() {
        let auth: AuthResponse =
            serde_json::from_str(r#"{"accessToken":"abc","refreshToken":"def"}"#).unwrap();
        let debug = format!("{auth:?}");
        assert!(!debug.contains("abc"));
        assert!(!debug.contains("def"));
        assert!(auth.user.is_none());
    }
}
