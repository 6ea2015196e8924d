//! File-backed cookie jar holding the session tokens
//!
//! The jar is a JSON object mapping cookie names to values, normally just
//! `accessToken` and `refreshToken`. Every write goes through a temp file and
//! a rename so a crash never leaves a half-written jar. A tokio Mutex
//! serializes writers (refresh, login and logout can race).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::constants::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::error::{Error, Result};
use crate::store::{StoreFuture, TokenStore};
use crate::token::TokenPair;

/// Token store persisted as cookies in a JSON file.
///
/// Reads are served from memory; the file is only touched on writes.
pub struct CookieJarStore {
    path: PathBuf,
    cookies: Mutex<HashMap<String, String>>,
}

impl CookieJarStore {
    /// Open the jar at `path`.
    ///
    /// A missing file is a logged-out session: the jar starts empty and an
    /// empty `{}` file is written so later opens take the normal path.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let cookies = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading cookie jar: {e}")))?;
            let cookies: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CookieParse(format!("parsing cookie jar: {e}")))?;
            info!(path = %path.display(), cookies = cookies.len(), "loaded cookie jar");
            cookies
        } else {
            info!(path = %path.display(), "cookie jar not found, starting logged out");
            let cookies = HashMap::new();
            write_atomic(&path, &cookies).await?;
            cookies
        };

        Ok(Self {
            path,
            cookies: Mutex::new(cookies),
        })
    }

    /// Location of the jar on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for CookieJarStore {
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
            debug!("saved session cookies");
            write_atomic(&self.path, &cookies).await
        })
    }

    fn clear(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut cookies = self.cookies.lock().await;
            let had_access = cookies.remove(ACCESS_TOKEN_COOKIE).is_some();
            let had_refresh = cookies.remove(REFRESH_TOKEN_COOKIE).is_some();
            if !had_access && !had_refresh {
                return Ok(());
            }
            debug!("cleared session cookies");
            write_atomic(&self.path, &cookies).await
        })
    }
}

/// Write the jar atomically with owner-only permissions on unix.
async fn write_atomic(path: &Path, cookies: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(cookies)
        .map_err(|e| Error::CookieParse(format!("serializing cookie jar: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    // Scoped to the jar's own name so jars sharing a directory never collide
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cookies".to_string());
    let tmp_path = dir.join(format!(".{name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp cookie jar: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| Error::Io(format!("setting cookie jar permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp cookie jar: {e}")))?;

    debug!(path = %path.display(), "persisted cookie jar");
    Ok(())
}
