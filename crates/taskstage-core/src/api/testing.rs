//! In-memory transport for exercising the session client and poll loop.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

type Scripted = Result<ApiResponse, ApiError>;

/// Replays scripted responses per request path and records every request.
/// Clones share the same script.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    responses: HashMap<String, VecDeque<Scripted>>,
    requests: Vec<ApiRequest>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, path: &str, response: Scripted) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .responses
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        let next = inner
            .responses
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front);
        let path = request.path.clone();
        inner.requests.push(request);
        next.unwrap_or_else(|| Err(ApiError::Transport(format!("unscripted request to {}", path))))
    }
}
