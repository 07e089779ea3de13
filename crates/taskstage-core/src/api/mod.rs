//! REST client module for the task-manager service.
//!
//! This module provides the `SessionClient`, which owns one authenticated
//! channel to the service: login, token refresh and request execution.
//! Requests go through the `Transport` trait; `HttpTransport` is the
//! reqwest-backed implementation used in production.
//!
//! Authentication travels as the `AuthenticationToken` / `RefreshToken`
//! cookie pair issued by the login endpoint.

pub mod client;
pub mod error;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{SessionClient, SessionConfig, LOGIN_PATH, REFRESH_PATH, TASKS_PATH};
pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ResponseClass, Transport};
