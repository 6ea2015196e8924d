//! Token store seam and the in-memory implementation
//!
//! The client reads the access token before every request, reads the refresh
//! token when a refresh starts, saves the pair after login/register/refresh,
//! and clears both on logout or when a refresh fails.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;

use crate::constants::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::error::Result;
use crate::token::TokenPair;

/// Boxed future returned by `TokenStore` methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistent storage for the access/refresh token pair.
///
/// Uses boxed futures so the client can hold an `Arc<dyn TokenStore>`.
/// `clear` removes both tokens together and succeeds when nothing is stored.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> StoreFuture<'_, Option<String>>;

    fn refresh_token(&self) -> StoreFuture<'_, Option<String>>;

    /// Replace both tokens.
    fn save(&self, pair: TokenPair) -> StoreFuture<'_, Result<()>>;

    /// Remove both tokens.
    fn clear(&self) -> StoreFuture<'_, Result<()>>;
}

/// Process-local token store keyed by cookie name.
#[derive(Default)]
pub struct MemoryTokenStore {
    cookies: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token pair.
    pub fn with_tokens(pair: TokenPair) -> Self {
        let mut cookies = HashMap::new();
        cookies.insert(ACCESS_TOKEN_COOKIE.to_string(), pair.access_token);
        cookies.insert(REFRESH_TOKEN_COOKIE.to_string(), pair.refresh_token);
        Self {
            cookies: Mutex::new(cookies),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move { self.cookies.lock().await.get(ACCESS_TOKEN_COOKIE).cloned() })
    }

    fn refresh_token(&self) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move { self.cookies.lock().await.get(REFRESH_TOKEN_COOKIE).cloned() })
    }

    fn save(&self, pair: TokenPair) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut cookies = self.cookies.lock().await;
            cookies.insert(ACCESS_TOKEN_COOKIE.to_string(), pair.access_token);
            cookies.insert(REFRESH_TOKEN_COOKIE.to_string(), pair.refresh_token);
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut cookies = self.cookies.lock().await;
            cookies.remove(ACCESS_TOKEN_COOKIE);
            cookies.remove(REFRESH_TOKEN_COOKIE);
            Ok(())
        })
    }
}
