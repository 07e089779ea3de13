use super::credentials::Credentials;

/// Where the session client sits in its authentication lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// The service rejected the current token; recovery is in progress.
    Expiring,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => write!(f, "unauthenticated"),
            AuthState::Authenticating => write!(f, "authenticating"),
            AuthState::Authenticated => write!(f, "authenticated"),
            AuthState::Expiring => write!(f, "expiring"),
        }
    }
}

/// Everything one authenticated channel carries between requests.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub credentials: Credentials,
    /// Entity tag of the last successful task listing
    pub caching_token: Option<String>,
    pub user_id: String,
}

impl SessionState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Drop tokens and the caching tag. The user id is configuration and stays.
    pub fn clear(&mut self) {
        self.credentials.clear();
        self.caching_token = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_keeps_user_id() {
        let mut state = SessionState::new("u-1");
        state.credentials = Credentials::new("A", "R");
        state.caching_token = Some("\"E7\"".to_string());

        state.clear();
        assert!(!state.credentials.is_valid());
        assert!(state.caching_token.is_none());
        assert_eq!(state.user_id, "u-1");
    }
}
