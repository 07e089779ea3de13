use anyhow::Result;
use tracing::{debug, error, info, warn};

use taskstage_core::cache::TaskCache;
use taskstage_core::staging::{chime, StageResult, TaskStager};
use taskstage_core::{Config, TaskCollection};

/// Consumer side of the poll loop: caches each listing and stages new work.
pub struct App {
    user_id: String,
    stager: TaskStager,
    cache: Option<TaskCache>,
}

impl App {
    pub fn new(config: &Config, user_id: String) -> Result<Self> {
        let stager = TaskStager::new(config.staging_config()?);

        let cache = match config.data_dir().and_then(TaskCache::new) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "Task cache unavailable");
                None
            }
        };

        if let Some(ref cache) = cache {
            match cache.load_tasks() {
                Ok(Some(previous)) => info!(
                    tasks = previous.data.len(),
                    cached_at = %previous.cached_at,
                    "Previous task listing on disk"
                ),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Ignoring unreadable task cache"),
            }
        }

        Ok(Self {
            user_id,
            stager,
            cache,
        })
    }

    pub fn handle_tasks(&mut self, tasks: TaskCollection) {
        if let Some(ref cache) = self.cache {
            if let Err(e) = cache.save_tasks(&tasks) {
                warn!(error = %e, "Failed to cache tasks");
            }
        }

        let actionable: Vec<_> = tasks.actionable_for(&self.user_id).collect();
        info!(
            total = tasks.len(),
            actionable = actionable.len(),
            user_id = %self.user_id,
            "Processing tasks"
        );

        let mut created = 0;
        for task in actionable {
            match self.stager.stage(task) {
                Ok(StageResult::Created { .. }) => {
                    info!(task = %task.name, status = %task.status, "New task staged");
                    created += 1;
                }
                Ok(StageResult::Skipped { .. }) => {
                    debug!(task = %task.name, "Task already staged");
                }
                Err(e) => {
                    error!(task = %task.name, error = %e, "Failed to stage task");
                }
            }
        }

        if created > 0 {
            chime();
        }
    }
}
