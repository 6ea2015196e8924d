//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The login password is read from KICKOFF_PASSWORD or `password_file`,
//! never stored in the TOML directly.

use api_client::ClientConfig;
use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ClientConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Where the session lives between invocations
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_file")]
    pub cookie_file: PathBuf,
    /// Default login email when none is given on the command line
    #[serde(default)]
    pub email: Option<String>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
    /// File holding the login password (alternative to KICKOFF_PASSWORD)
    #[serde(default)]
    pub password_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_file: default_cookie_file(),
            email: None,
            password: None,
            password_file: None,
        }
    }
}

fn default_cookie_file() -> PathBuf {
    PathBuf::from("kickoff-cookies.json")
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// `NEXT_PUBLIC_API_URL` replaces `api.base_url`. Password resolution:
    /// 1. KICKOFF_PASSWORD env var
    /// 2. password_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("NEXT_PUBLIC_API_URL") {
            config.api.base_url = url;
        }

        config.api.validate()?;

        if let Ok(password) = std::env::var("KICKOFF_PASSWORD") {
            config.session.password = Some(Secret::new(password));
        } else if let Some(ref password_file) = config.session.password_file {
            let password = std::fs::read_to_string(password_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read password_file {}: {e}",
                    password_file.display()
                ))
            })?;
            let password = password.trim_end_matches(['\r', '\n']).to_owned();
            if !password.is_empty() {
                config.session.password = Some(Secret::new(password));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("kickoff.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    /// Hold the lock with every overlay variable unset.
    fn clean_env() -> std::sync::MutexGuard<'static, ()> {
        let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            remove_env("NEXT_PUBLIC_API_URL");
            remove_env("KICKOFF_PASSWORD");
            remove_env("CONFIG_PATH");
        }
        lock
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("kickoff.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    const VALID: &str = r#"
[api]
base_url = "https://api.kickoff.test/api"
timeout_secs = 10

[session]
cookie_file = "/var/lib/kickoff/cookies.json"
email = "coach@club.test"
"#;

    #[test]
    fn loads_valid_config() {
        let _lock = clean_env();
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&write_config(&dir, VALID)).unwrap();

        assert_eq!(config.api.base_url, "https://api.kickoff.test/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.refresh_timeout_secs, 5);
        assert_eq!(
            config.session.cookie_file,
            PathBuf::from("/var/lib/kickoff/cookies.json")
        );
        assert_eq!(config.session.email.as_deref(), Some("coach@club.test"));
        assert!(config.session.password.is_none());
    }

    #[test]
    fn session_table_is_optional() {
        let _lock = clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"http://localhost:3001/api\"\n");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.session.cookie_file, PathBuf::from("kickoff-cookies.json"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = Config::load(Path::new("/nonexistent/kickoff.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&write_config(&dir, "[api\nbase_url ="));
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn api_url_env_overrides_file() {
        let _lock = clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, VALID);

        unsafe { set_env("NEXT_PUBLIC_API_URL", "http://localhost:3001/api") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("NEXT_PUBLIC_API_URL") };

        assert_eq!(config.api.base_url, "http://localhost:3001/api");
    }

    #[test]
    fn invalid_api_url_is_rejected() {
        let _lock = clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"api.kickoff.test\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn password_from_env() {
        let _lock = clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, VALID);

        unsafe { set_env("KICKOFF_PASSWORD", "hunter2") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("KICKOFF_PASSWORD") };

        assert_eq!(config.session.password.as_ref().unwrap().expose(), "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn password_from_file() {
        let _lock = clean_env();
        let dir = tempfile::tempdir().unwrap();
        let password_path = dir.path().join("password");
        std::fs::write(&password_path, "from-file\n").unwrap();
        let contents = format!(
            "[api]\nbase_url = \"http://localhost:3001/api\"\n\n[session]\npassword_file = \"{}\"\n",
            password_path.display()
        );
        let path = write_config(&dir, &contents);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.session.password.as_ref().unwrap().expose(), "from-file");
    }

    #[test]
    fn password_env_overrides_file() {
        let _lock = clean_env();
        let dir = tempfile::tempdir().unwrap();
        let password_path = dir.path().join("password");
        std::fs::write(&password_path, "from-file").unwrap();
        let contents = format!(
            "[api]\nbase_url = \"http://localhost:3001/api\"\n\n[session]\npassword_file = \"{}\"\n",
            password_path.display()
        );
        let path = write_config(&dir, &contents);

        unsafe { set_env("KICKOFF_PASSWORD", "from-env") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("KICKOFF_PASSWORD") };

        assert_eq!(config.session.password.as_ref().unwrap().expose(), "from-env");
    }

    #[test]
    fn unreadable_password_file_is_config_error() {
        let _lock = clean_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[api]\nbase_url = \"http://localhost:3001/api\"\n\n[session]\npassword_file = \"/nonexistent/password\"\n",
        );

        let result = Config::load(&path);
        assert!(matches!(result, Err(common::Error::Config(_))));
    }

    #[test]
    fn resolve_path_precedence() {
        let _lock = clean_env();
        assert_eq!(Config::resolve_path(None), PathBuf::from("kickoff.toml"));

        unsafe { set_env("CONFIG_PATH", "/env/kickoff.toml") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("/env/kickoff.toml"));
        assert_eq!(
            Config::resolve_path(Some("/cli/kickoff.toml")),
            PathBuf::from("/cli/kickoff.toml"),
            "CLI arg must take precedence over CONFIG_PATH"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }
}
