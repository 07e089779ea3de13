use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Credential file name in the data directory
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Cookie name carrying the short-lived session token
pub const AUTH_COOKIE: &str = "AuthenticationToken";

/// Cookie name carrying the long-lived refresh token
pub const REFRESH_COOKIE: &str = "RefreshToken";

/// The token pair issued by a login or refresh.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "authenticationToken")]
    pub authentication_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(authentication_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            authentication_token: authentication_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Both tokens must be present.
    pub fn is_valid(&self) -> bool {
        !self.authentication_token.is_empty() && !self.refresh_token.is_empty()
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    pub fn clear(&mut self) {
        self.authentication_token.clear();
        self.refresh_token.clear();
    }

    /// `Cookie` header value for authenticated requests.
    pub fn cookie_header(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if !self.authentication_token.is_empty() {
            parts.push(format!("{}={}", AUTH_COOKIE, self.authentication_token));
        }
        if !self.refresh_token.is_empty() {
            parts.push(format!("{}={}", REFRESH_COOKIE, self.refresh_token));
        }
        parts.join("; ")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("authentication_token", &redact(&self.authentication_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() {
        "<empty>"
    } else {
        "[REDACTED]"
    }
}

/// Persists `Credentials` as a JSON file.
///
/// The store never mutates credentials on its own; it only serializes what
/// the session client hands it. Writes go to a sibling temp file that is
/// renamed over the target, so a crash mid-write leaves the previous file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CREDENTIALS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read persisted credentials.
    ///
    /// A missing, unreadable, corrupt or incomplete file all yield `None`.
    pub fn load(&self) -> Option<Credentials> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "No credential file");
                return None;
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to read credential file");
                return None;
            }
        };

        match serde_json::from_str::<Credentials>(&contents) {
            Ok(credentials) if credentials.is_valid() => Some(credentials),
            Ok(_) => {
                warn!(path = ?self.path, "Credential file is missing a token");
                None
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to parse credential file");
                None
            }
        }
    }

    /// Persist `credentials` if valid; otherwise clear the store.
    ///
    /// Returns whether the credentials were written.
    pub fn save(&self, credentials: &Credentials) -> bool {
        if !credentials.is_valid() {
            debug!("Refusing to persist incomplete credentials, clearing store");
            self.clear();
            return false;
        }

        match self.write_atomic(credentials) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to persist credentials");
                false
            }
        }
    }

    /// Remove the persisted file. Idempotent.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Credential file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.path, error = %e, "Failed to remove credential file"),
        }
    }

    fn write_atomic(&self, credentials: &Credentials) -> Result<()> {
        let parent = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            fs::create_dir_all(parent).context("Failed to create credential directory")?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(credentials)?;

        let written = write_private(&tmp_path, contents.as_bytes()).and_then(|()| {
            fs::rename(&tmp_path, &self.path).context("Failed to move credential file into place")
        });
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = ?tmp_path, error = %cleanup, "Failed to remove temp credential file");
                }
            }
            return Err(e);
        }

        // The rename itself must survive a crash
        if let Some(parent) = parent {
            if let Err(e) = sync_dir(parent) {
                warn!(path = ?parent, error = %e, "Failed to sync credential directory");
            }
        }
        Ok(())
    }
}

/// Write `contents` to a fresh owner-only file and flush it to disk.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path).context("Failed to create temp credential file")?;

    // Restrict before the secrets land on disk
    #[cfg(unix)]
    {
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    file.write_all(contents)
        .context("Failed to write temp credential file")?;
    file.sync_all().context("Failed to sync temp credential file")?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
