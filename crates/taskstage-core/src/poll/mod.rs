//! Conditional polling of the task listing.
//!
//! `PollLoop` drives a `SessionClient` on a fixed period, recovers expired
//! sessions through a bounded refresh-then-login ladder, and skips unchanged
//! listings using the entity tag of the previous response.

pub mod policy;
pub mod runner;

pub use policy::{
    Backoff, PollConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL,
};
pub use runner::{PollFailure, PollLoop, PollOutcome, PollStats};
