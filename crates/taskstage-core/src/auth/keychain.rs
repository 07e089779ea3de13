use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "taskstage";

/// The account password in the OS keychain.
///
/// Bound to one account at construction. A missing entry is an ordinary
/// outcome (`None` / `false`), not an error.
pub struct PasswordStore {
    account: String,
    entry: Entry,
}

impl PasswordStore {
    pub fn for_account(email: &str) -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, email)
            .with_context(|| format!("Failed to open keychain entry for {}", email))?;
        Ok(Self {
            account: email.to_string(),
            entry,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn load(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read password from keychain"),
        }
    }

    pub fn save(&self, password: &str) -> Result<()> {
        self.entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        debug!(account = %self.account, "Password stored in keychain");
        Ok(())
    }

    /// Remove the stored password. Returns whether one was present.
    pub fn forget(&self) -> Result<bool> {
        match self.entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e).context("Failed to delete password from keychain"),
        }
    }
}
