//! Authentication module for managing session tokens and account secrets.
//!
//! This module provides:
//! - `Credentials`: the authentication/refresh token pair issued by the service
//! - `CredentialStore`: durable, crash-safe persistence of `Credentials`
//! - `SessionState`: credentials plus the conditional-fetch tag and user id
//! - `PasswordStore`: OS keychain storage for the account password

pub mod credentials;
pub mod keychain;
pub mod session;

pub use credentials::{CredentialStore, Credentials};
pub use keychain::PasswordStore;
pub use session::{AuthState, SessionState};
