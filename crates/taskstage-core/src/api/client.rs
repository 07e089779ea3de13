//! Session client for the task-manager REST API.
//!
//! The `SessionClient` owns the session state (token pair, caching tag, user
//! id) and the credential store. It performs login and refresh and attaches
//! the current tokens to every request it executes. It deliberately does not
//! retry on `401`; that ladder belongs to the caller.

use reqwest::header::{self, HeaderName};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::auth::credentials::{AUTH_COOKIE, REFRESH_COOKIE};
use crate::auth::{AuthState, CredentialStore, Credentials, SessionState};

use super::transport::{ApiRequest, ApiResponse, HttpTransport, Transport, DEFAULT_USER_AGENT};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh-token";
pub const TASKS_PATH: &str = "/task-manager";

/// Header identifying the account on refresh calls
const CLIENT_ID_HEADER: &str = "x-client-id";

/// Platform reported in the login device fingerprint
const DEVICE_PLATFORM: &str = "desktop";

/// Status codes the login endpoint answers with on success
pub const DEFAULT_LOGIN_SUCCESS: &[u16] = &[201];

/// Status codes the refresh endpoint answers with on success
pub const DEFAULT_REFRESH_SUCCESS: &[u16] = &[200, 201];

/// Account settings and per-endpoint success codes.
#[derive(Clone)]
pub struct SessionConfig {
    pub email: String,
    pub password: String,
    /// Configured user id; when absent the one returned by login is adopted
    pub user_id: Option<String>,
    pub user_agent: String,
    pub login_success_codes: Vec<u16>,
    pub refresh_success_codes: Vec<u16>,
}

impl SessionConfig {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            user_id: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            login_success_codes: DEFAULT_LOGIN_SUCCESS.to_vec(),
            refresh_success_codes: DEFAULT_REFRESH_SUCCESS.to_vec(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("login_success_codes", &self.login_success_codes)
            .field("refresh_success_codes", &self.refresh_success_codes)
            .finish()
    }
}

/// One authenticated channel to the task service.
pub struct SessionClient<T: Transport = HttpTransport> {
    transport: T,
    store: CredentialStore,
    config: SessionConfig,
    state: SessionState,
    auth_state: AuthState,
}

impl<T: Transport> SessionClient<T> {
    /// Create a client, resuming any valid credentials from `store`.
    pub fn new(transport: T, store: CredentialStore, config: SessionConfig) -> Self {
        let mut state = SessionState::new(config.user_id.clone().unwrap_or_default());
        let auth_state = match store.load() {
            Some(credentials) => {
                info!("Resumed stored session");
                state.credentials = credentials;
                AuthState::Authenticated
            }
            None => AuthState::Unauthenticated,
        };

        Self {
            transport,
            store,
            config,
            state,
            auth_state,
        }
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth_state
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state == AuthState::Authenticated
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user_id(&self) -> &str {
        &self.state.user_id
    }

    pub fn caching_token(&self) -> Option<&str> {
        self.state.caching_token.as_deref()
    }

    pub fn set_caching_token(&mut self, token: Option<String>) {
        self.state.caching_token = token;
    }

    /// Record that the service rejected the current token.
    pub fn mark_expired(&mut self) {
        if self.auth_state == AuthState::Authenticated {
            self.auth_state = AuthState::Expiring;
        }
    }

    /// Drop credentials and the caching tag, in memory and on disk.
    pub fn clear_credentials(&mut self) {
        self.state.clear();
        self.store.clear();
        self.auth_state = AuthState::Unauthenticated;
    }

    /// Log out locally. There is no server-side logout endpoint.
    pub fn logout(&mut self) {
        info!("Logging out");
        self.clear_credentials();
    }

    /// Log in with the configured email and password.
    ///
    /// Any prior credentials are discarded first, so a failed login always
    /// leaves the client `Unauthenticated`. Tokens that cannot be persisted
    /// count as a failed login.
    pub async fn login(&mut self) -> bool {
        self.clear_credentials();
        self.auth_state = AuthState::Authenticating;
        info!(email = %self.config.email, "Logging in");

        let (credentials, response) = match self.request_login().await {
            Ok(issued) => issued,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.auth_state = AuthState::Unauthenticated;
                return false;
            }
        };

        if !self.store.save(&credentials) {
            error!(path = ?self.store.path(), "Login succeeded but credentials could not be persisted");
            self.auth_state = AuthState::Unauthenticated;
            return false;
        }

        self.adopt_user_id(&response);
        self.state.credentials = credentials;
        self.auth_state = AuthState::Authenticated;
        info!(user_id = %self.state.user_id, "Login successful");
        true
    }

    /// Exchange the refresh token for a new authentication token.
    ///
    /// Returns false without a network call when no refresh token is held.
    /// A failed refresh leaves credentials untouched; the caller decides
    /// whether to fall back to a full login.
    pub async fn refresh(&mut self) -> bool {
        if !self.state.credentials.has_refresh_token() {
            debug!("No refresh token available");
            return false;
        }

        info!("Refreshing authentication token");
        let credentials = match self.request_refresh().await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                return false;
            }
        };

        if !self.store.save(&credentials) {
            error!(path = ?self.store.path(), "Refreshed credentials could not be persisted");
            return false;
        }

        self.state.credentials = credentials;
        self.auth_state = AuthState::Authenticated;
        info!("Token refresh successful");
        true
    }

    async fn request_login(&self) -> Result<(Credentials, ApiResponse), ApiError> {
        let body = json!({
            "email": self.config.email,
            "password": self.config.password,
            "deviceInfo": {
                "userAgent": self.config.user_agent,
                "platform": DEVICE_PLATFORM,
            },
        });
        let response = self.transport.send(ApiRequest::post(LOGIN_PATH, body)).await?;

        if !self.config.login_success_codes.contains(&response.status.as_u16()) {
            return Err(ApiError::from_status(response.status, &response.body));
        }

        let credentials = Credentials::new(
            response.cookie(AUTH_COOKIE).unwrap_or_default(),
            response.cookie(REFRESH_COOKIE).unwrap_or_default(),
        );
        if !credentials.is_valid() {
            return Err(ApiError::InvalidResponse(
                "login response is missing tokens".to_string(),
            ));
        }
        Ok((credentials, response))
    }

    /// The current credentials with whatever tokens the refresh endpoint reissued.
    async fn request_refresh(&self) -> Result<Credentials, ApiError> {
        let body = json!({ "refreshToken": self.state.credentials.refresh_token });
        let mut request = ApiRequest::post(REFRESH_PATH, body);
        if !self.state.user_id.is_empty() {
            request = request.with_header(
                HeaderName::from_static(CLIENT_ID_HEADER),
                self.state.user_id.clone(),
            );
        }

        let response = self.execute(request).await?;
        if !self
            .config
            .refresh_success_codes
            .contains(&response.status.as_u16())
        {
            return Err(ApiError::from_status(response.status, &response.body));
        }

        let auth_token = response.cookie(AUTH_COOKIE).ok_or_else(|| {
            ApiError::InvalidResponse("refresh response carried no authentication token".to_string())
        })?;

        let mut credentials = self.state.credentials.clone();
        credentials.authentication_token = auth_token.to_string();
        if let Some(refresh_token) = response.cookie(REFRESH_COOKIE) {
            credentials.refresh_token = refresh_token.to_string();
        }
        Ok(credentials)
    }

    /// Send `request` with the session's tokens attached.
    ///
    /// Only transport failures are errors; every HTTP status, `401` included,
    /// comes back as a response for the caller to classify.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let request = self.authorize(request);
        self.transport.send(request).await
    }

    /// GET for the task listing, conditional on the last caching tag.
    pub fn tasks_request(&self) -> ApiRequest {
        let request = ApiRequest::get(TASKS_PATH);
        match self.state.caching_token {
            Some(ref etag) => request.with_header(header::IF_NONE_MATCH, etag.clone()),
            None => request,
        }
    }

    fn authorize(&self, mut request: ApiRequest) -> ApiRequest {
        let credentials = &self.state.credentials;
        if !credentials.authentication_token.is_empty() {
            request = request.with_header(
                header::AUTHORIZATION,
                format!("Bearer {}", credentials.authentication_token),
            );
        }
        let cookie = credentials.cookie_header();
        if !cookie.is_empty() {
            request = request.with_header(header::COOKIE, cookie);
        }
        request
    }

    fn adopt_user_id(&mut self, response: &ApiResponse) {
        if !self.state.user_id.is_empty() {
            return;
        }
        let Ok(body) = response.json::<serde_json::Value>() else {
            return;
        };
        // userId arrives as either a string or a number
        let user_id = match body.get("userId") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return,
        };
        debug!(user_id = %user_id, "Adopted user id from login response");
        self.state.user_id = user_id;
    }
}
