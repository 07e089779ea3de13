//! Local working-folder setup for newly assigned tasks.
//!
//! This is the consumer side of the poll loop: it never talks to the task
//! service. Fetching the files behind extracted links is left to other tools;
//! the stager only records what it found.

pub mod links;
pub mod notify;
pub mod stager;

pub use links::{extract_download_names, extract_hrefs};
pub use notify::chime;
pub use stager::{sanitize_folder_name, StageResult, StagingConfig, TaskStager};
