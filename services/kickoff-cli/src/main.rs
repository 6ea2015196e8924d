//! Kickoff CLI
//!
//! Command-line front end for the tournament API that:
//! 1. Loads `kickoff.toml` and the env overlay
//! 2. Restores the session from the on-disk cookie jar
//! 3. Runs one command through the authenticated client, refreshing the
//!    access token transparently when it has expired

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use api_client::{ApiClient, ApiRequest, HeadlessNavigator, RegisterRequest};
use clap::{Parser, Subcommand};
use session::CookieJarStore;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Kickoff tournament API client
#[derive(Parser, Debug)]
#[command(name = "kickoff")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (TOML); falls back to CONFIG_PATH, then kickoff.toml
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Log in (password from KICKOFF_PASSWORD or session.password_file)
    Login {
        /// Defaults to session.email
        email: Option<String>,
    },

    /// Create an account and log in
    Register {
        email: String,
        first_name: String,
        last_name: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    #[command(name = "whoami")]
    WhoAmI,

    /// Show whether a session is stored
    Status,

    /// GET an API path and print the JSON body
    Get { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr as JSON so stdout stays clean for command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        cookie_file = %config.session.cookie_file.display(),
        "configuration loaded"
    );

    let store = CookieJarStore::load(config.session.cookie_file.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open cookie jar {}",
                config.session.cookie_file.display()
            )
        })?;

    let client = ApiClient::new(
        config.api.clone(),
        Arc::new(store),
        Arc::new(HeadlessNavigator),
    )
    .context("failed to build API client")?;

    run(&client, &config, cli.command).await
}

async fn run(client: &ApiClient, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => {
            let email = email
                .or_else(|| config.session.email.clone())
                .context("no email given and session.email is not configured")?;
            let password = config
                .session
                .password
                .as_ref()
                .context("no password: set KICKOFF_PASSWORD or session.password_file")?;
            let session = client
                .login(&email, password.expose())
                .await
                .context("login failed")?;
            print_json(&session.user.unwrap_or_default())?;
        }
        Command::Register {
            email,
            first_name,
            last_name,
        } => {
            let password = config
                .session
                .password
                .as_ref()
                .context("no password: set KICKOFF_PASSWORD or session.password_file")?;
            let session = client
                .register(&RegisterRequest {
                    email,
                    password: password.expose().clone(),
                    first_name,
                    last_name,
                })
                .await
                .context("registration failed")?;
            print_json(&session.user.unwrap_or_default())?;
        }
        Command::Logout => {
            client.logout().await.context("logout failed")?;
            println!("logged out");
        }
        Command::WhoAmI => {
            let user = client
                .current_user()
                .await
                .context("failed to fetch current user")?;
            print_json(&user)?;
        }
        Command::Status => {
            if client.is_authenticated().await {
                println!("session stored");
            } else {
                println!("not logged in");
            }
        }
        Command::Get { path } => {
            let response = client
                .send(&ApiRequest::get(&path))
                .await
                .with_context(|| format!("GET {path} failed"))?;
            match response.json::<serde_json::Value>() {
                Ok(body) => print_json(&body)?,
                Err(_) => println!("{}", response.text()),
            }
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
