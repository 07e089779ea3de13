//! Data models for task-manager entities.
//!
//! - `Task`: one work item as returned by the task listing endpoint
//! - `TaskStatus`: workflow column a task sits in
//! - `TaskCollection`: the ordered result of one poll

pub mod task;

pub use task::{ProductRef, Task, TaskCollection, TaskStatus, UserRef};
