//! taskstage - watches the task-manager service for new assignments and
//! stages a local working folder for each one.

mod app;

use std::io;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskstage_core::cache::TaskCache;
use taskstage_core::{
    Config, CredentialStore, HttpTransport, PasswordStore, PollLoop, PollOutcome, SessionClient,
};

use app::App;

/// Log file prefix inside the data directory's `logs` folder
const LOG_FILE_PREFIX: &str = "taskstage.log";

const USAGE: &str = "\
Usage: taskstage [COMMAND]

Commands:
  run      Poll for tasks and stage new ones (default)
  once     Poll once and print actionable tasks
  login    Store the account password in the keychain and log in
  logout   Forget stored tokens and the keychain password

Configuration comes from ~/.config/taskstage/config.json, a .env file and
the environment (EMAIL, PASSWORD, USERID, TASKFOLDERPASS, DROPBOX, PROJECT,
BASE_URL, POLL_INTERVAL_SECS, MAX_ATTEMPTS).";

/// Initialize the tracing subscriber for logging
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = config.data_dir().ok().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
        tracing_appender::non_blocking(appender)
    });

    match file_layer {
        Some((writer, guard)) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    let _guard = init_tracing(&config);

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None | Some("run") => run(config).await,
        Some("once") => once(config).await,
        Some("login") => login(config).await,
        Some("logout") => logout(config),
        Some("-h") | Some("--help") | Some("help") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(other) => {
            eprintln!("{}", USAGE);
            Err(anyhow::anyhow!("Unknown command: {}", other))
        }
    }
}

/// Password from the environment, falling back to the keychain
fn resolve_password(config: &Config) -> Result<String> {
    if let Some(ref password) = config.password {
        return Ok(password.clone());
    }
    let email = config.require_email()?;
    PasswordStore::for_account(email)?
        .load()?
        .context("No PASSWORD set and none stored; run `taskstage login` first")
}

fn build_client(config: &Config, password: String) -> Result<SessionClient<HttpTransport>> {
    let transport = HttpTransport::new(&config.base_url, config.request_timeout())
        .context("Failed to build HTTP client")?;
    let store = CredentialStore::new(config.data_dir()?);
    Ok(SessionClient::new(transport, store, config.session_config(password)?))
}

/// Make sure the client holds tokens and knows which user it polls for.
async fn connect(config: &Config) -> Result<SessionClient<HttpTransport>> {
    let mut client = build_client(config, resolve_password(config)?)?;

    if !client.is_authenticated() && !client.login().await {
        anyhow::bail!("Login failed; check EMAIL and PASSWORD");
    }
    // A resumed session has no login response to learn the user id from
    if client.user_id().is_empty() && !client.login().await {
        anyhow::bail!("Login failed; check EMAIL and PASSWORD");
    }
    if client.user_id().is_empty() {
        anyhow::bail!("Could not determine user id; set USERID");
    }
    Ok(client)
}

async fn run(config: Config) -> Result<()> {
    info!("taskstage starting");
    let client = connect(&config).await?;
    let mut app = App::new(&config, client.user_id().to_string())?;

    let mut poller = PollLoop::new(client, config.poll_config());
    let stats = poller.run(|tasks| app.handle_tasks(tasks)).await;

    info!(
        ticks = stats.ticks,
        updates = stats.updates,
        failures = stats.failures,
        "taskstage shutting down"
    );
    Ok(())
}

async fn once(config: Config) -> Result<()> {
    let client = connect(&config).await?;
    let user_id = client.user_id().to_string();
    let mut poller = PollLoop::new(client, config.poll_config());

    match poller.poll().await {
        PollOutcome::Updated(tasks) => {
            let actionable: Vec<_> = tasks.actionable_for(&user_id).collect();
            println!(
                "{} tasks fetched, {} actionable for {}",
                tasks.len(),
                actionable.len(),
                user_id
            );
            for task in actionable {
                println!("  [{}] {} ({})", task.priority, task.name, task.status);
            }
            Ok(())
        }
        PollOutcome::Unchanged => {
            println!("No task updates");
            Ok(())
        }
        PollOutcome::Failed(failure) => Err(anyhow::anyhow!("Poll failed: {}", failure)),
    }
}

async fn login(config: Config) -> Result<()> {
    let email = config.require_email()?.to_string();
    let password = rpassword::prompt_password(format!("Password for {}: ", email))?;

    let mut client = build_client(&config, password.clone())?;
    if !client.login().await {
        anyhow::bail!("Login failed");
    }

    if let Err(e) = PasswordStore::for_account(&email).and_then(|store| store.save(&password)) {
        warn!(error = %e, "Failed to store password in keychain");
    }
    println!("Logged in as {} (user id {})", email, client.user_id());
    Ok(())
}

fn logout(config: Config) -> Result<()> {
    let email = config.require_email()?;
    let mut client = build_client(&config, config.password.clone().unwrap_or_default())?;
    client.logout();

    if let Err(e) = TaskCache::new(config.data_dir()?).and_then(|cache| cache.clear()) {
        warn!(error = %e, "Failed to clear task cache");
    }
    if PasswordStore::for_account(email)?.forget()? {
        info!(account = %email, "Password removed from keychain");
    }
    println!("Logged out");
    Ok(())
}
