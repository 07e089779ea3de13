//! Core library for taskstage.
//!
//! Keeps a long-lived authenticated session against the task-manager API,
//! polls the task listing with conditional requests, and stages a working
//! folder for each newly assigned task.
//!
//! - `api`: `SessionClient` (login, refresh, execute) over a `Transport`
//! - `auth`: token pair, credential file, session state, keychain
//! - `poll`: `PollLoop` with the bounded re-authentication ladder
//! - `models`: `Task`, `TaskStatus`, `TaskCollection`
//! - `cache`, `staging`, `config`: consumer-side glue

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod poll;
pub mod staging;

pub use api::{ApiError, HttpTransport, SessionClient, SessionConfig};
pub use auth::{AuthState, CredentialStore, Credentials, PasswordStore, SessionState};
pub use config::Config;
pub use models::{Task, TaskCollection, TaskStatus};
pub use poll::{Backoff, PollConfig, PollFailure, PollLoop, PollOutcome, PollStats};
