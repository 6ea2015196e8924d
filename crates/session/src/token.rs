//! Token pair and the refresh-token exchange
//!
//! The backend issues an access token and a refresh token together, on login,
//! registration and refresh. Expiry is never tracked locally: a 401 from the
//! API is the only signal that the access token is stale.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Access and refresh token issued together by the backend.
///
/// Serialized with the backend's camelCase field names.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Trade a refresh token for a new token pair.
///
/// POSTs `{ "refreshToken": ... }` to `url` with its own `timeout`, which
/// overrides the client-wide timeout for this one call. The raw client is
/// used so the exchange never passes back through the 401 handling it
/// serves.
pub async fn refresh_tokens(
    client: &reqwest::Client,
    url: &str,
    refresh: &str,
    timeout: Duration,
) -> Result<TokenPair> {
    debug!(url, timeout_ms = timeout.as_millis() as u64, "exchanging refresh token");

    let response = client
        .post(url)
        .timeout(timeout)
        .json(&RefreshRequest {
            refresh_token: refresh,
        })
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(timeout)
            } else {
                Error::Http(format!("refresh request failed: {e}"))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<TokenPair>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("refresh response: {e}")))
}
