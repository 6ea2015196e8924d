//! Cookie names and backend auth routes

use std::time::Duration;

/// Cookie holding the bearer access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie holding the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Backend route that trades `{ refreshToken }` for a new token pair
pub const REFRESH_TOKEN_PATH: &str = "/auth/refresh-token";

/// Backend route for credential login
pub const LOGIN_PATH: &str = "/auth/login";

/// Backend route for account registration
pub const REGISTER_PATH: &str = "/auth/register";

/// Backend route returning the authenticated user
pub const CURRENT_USER_PATH: &str = "/auth/me";

/// Front-end route users are sent to when the session cannot be recovered
pub const LOGIN_ROUTE: &str = "/auth/login";

/// Fixed timeout for the refresh call, independent of the client timeout.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(5);
