//! Session token persistence and refresh for the Kickoff API
//!
//! Holds the access/refresh token pair the authenticated client depends on:
//! - `TokenStore` is the seam the client reads and writes tokens through
//! - `CookieJarStore` persists the pair as the `accessToken` and
//!   `refreshToken` cookies in a JSON jar on disk
//! - `MemoryTokenStore` keeps the pair in process
//! - `token::refresh_tokens()` trades a refresh token for a new pair
//!
//! The crate has no knowledge of request replay or queuing; that lives in
//! `api-client`.

pub mod constants;
pub mod cookie_jar;
pub mod error;
pub mod store;
pub mod token;

pub use constants::*;
pub use cookie_jar::CookieJarStore;
pub use error::{Error, Result};
pub use store::{MemoryTokenStore, StoreFuture, TokenStore};
pub use token::{TokenPair, refresh_tokens};
