use std::future::Future;

use tracing::{debug, info, warn};

use crate::api::{ResponseClass, SessionClient, Transport};
use crate::models::TaskCollection;

use super::PollConfig;

/// Why a poll produced no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFailure {
    /// Connection, timeout or DNS failure
    Transport(String),
    /// Refresh and login both failed after a `401`
    AuthRejected,
    /// Still `401` on the final attempt
    AuthExhausted,
    /// Any other non-success status
    Status(u16),
    /// Success status with a body that is not a task listing
    Invalid(String),
}

impl std::fmt::Display for PollFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollFailure::Transport(e) => write!(f, "transport error: {}", e),
            PollFailure::AuthRejected => write!(f, "re-authentication failed"),
            PollFailure::AuthExhausted => write!(f, "still unauthorized after retries"),
            PollFailure::Status(code) => write!(f, "unexpected status {}", code),
            PollFailure::Invalid(e) => write!(f, "invalid task listing: {}", e),
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Updated(TaskCollection),
    Unchanged,
    Failed(PollFailure),
}

/// Tick counters from `run_until`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub ticks: u64,
    pub updates: u64,
    pub unchanged: u64,
    pub failures: u64,
}

/// Sequential poller over a single session client.
pub struct PollLoop<T: Transport> {
    client: SessionClient<T>,
    config: PollConfig,
}

impl<T: Transport> PollLoop<T> {
    pub fn new(client: SessionClient<T>, config: PollConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &SessionClient<T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut SessionClient<T> {
        &mut self.client
    }

    /// Fetch the task listing once. `None` covers "not modified" and every
    /// failure; use `poll` to tell them apart.
    pub async fn fetch_once(&mut self) -> Option<TaskCollection> {
        match self.poll().await {
            PollOutcome::Updated(tasks) => Some(tasks),
            PollOutcome::Unchanged | PollOutcome::Failed(_) => None,
        }
    }

    /// Fetch the task listing, recovering an expired session at most
    /// `max_attempts - 1` times. Credentials are cleared only when the
    /// service keeps answering `401`.
    pub async fn poll(&mut self) -> PollOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = self.client.tasks_request();
            let response = match self.client.execute(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(attempt, error = %e, "Task fetch failed");
                    return PollOutcome::Failed(PollFailure::Transport(e.to_string()));
                }
            };

            match response.classify() {
                ResponseClass::NotModified => {
                    info!("No task updates");
                    return PollOutcome::Unchanged;
                }
                ResponseClass::Success => {
                    return match TaskCollection::from_json(&response.body) {
                        Ok(tasks) => {
                            self.client.set_caching_token(response.etag());
                            info!(count = tasks.len(), "Fetched tasks");
                            PollOutcome::Updated(tasks)
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to parse task listing");
                            PollOutcome::Failed(PollFailure::Invalid(e.to_string()))
                        }
                    };
                }
                ResponseClass::AuthExpired if attempt < max_attempts => {
                    info!(attempt, "Session expired, attempting token refresh");
                    self.client.mark_expired();
                    if self.client.refresh().await {
                        continue;
                    }
                    debug!("Refresh unavailable, falling back to login");
                    if self.client.login().await {
                        continue;
                    }
                    warn!("Refresh and login both failed, clearing credentials");
                    self.client.clear_credentials();
                    return PollOutcome::Failed(PollFailure::AuthRejected);
                }
                ResponseClass::AuthExpired => {
                    warn!(attempts = attempt, "Still unauthorized, clearing credentials");
                    self.client.clear_credentials();
                    return PollOutcome::Failed(PollFailure::AuthExhausted);
                }
                ResponseClass::Rejected(status) => {
                    warn!(
                        status = %status,
                        body = %crate::api::ApiError::truncate_body(&response.body),
                        "Task fetch rejected"
                    );
                    return PollOutcome::Failed(PollFailure::Status(status.as_u16()));
                }
            }
        }
    }

    /// Poll every interval until `shutdown` resolves.
    ///
    /// `on_tasks` runs synchronously with every non-empty, changed listing
    /// before the next tick is scheduled. Shutdown is only observed between
    /// ticks; a poll in flight runs to completion.
    pub async fn run_until<F, S>(&mut self, mut on_tasks: F, shutdown: S) -> PollStats
    where
        F: FnMut(TaskCollection),
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = PollStats::default();
        let mut consecutive_failures = 0u32;

        info!(
            interval_secs = self.config.interval.as_secs(),
            max_attempts = self.config.max_attempts,
            "Poll loop started"
        );

        loop {
            stats.ticks += 1;
            match self.poll().await {
                PollOutcome::Updated(tasks) => {
                    consecutive_failures = 0;
                    stats.updates += 1;
                    if !tasks.is_empty() {
                        on_tasks(tasks);
                    }
                }
                PollOutcome::Unchanged => {
                    consecutive_failures = 0;
                    stats.unchanged += 1;
                }
                PollOutcome::Failed(failure) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    stats.failures += 1;
                    warn!(%failure, consecutive_failures, "Poll failed");
                }
            }

            let delay = self.config.backoff.delay(self.config.interval, consecutive_failures);
            debug!(delay_secs = delay.as_secs(), "Waiting for next poll");
            tokio::select! {
                _ = &mut shutdown => {
                    info!(ticks = stats.ticks, "Shutdown requested, stopping poll loop");
                    return stats;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Poll until Ctrl-C.
    pub async fn run<F>(&mut self, on_tasks: F) -> PollStats
    where
        F: FnMut(TaskCollection),
    {
        self.run_until(on_tasks, shutdown_signal()).await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
