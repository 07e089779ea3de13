use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::models::Task;

use super::links::{extract_download_names, extract_hrefs};

const DESCRIPTION_FILE: &str = "description.txt";
const LINKS_FILE: &str = "links.txt";

#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub task_root: PathBuf,
    pub mirror_root: Option<PathBuf>,
    /// Template project file name, relative to `task_root`
    pub template_project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    Created {
        folder: PathBuf,
        download_names: usize,
        links: usize,
    },
    /// The task folder already existed.
    Skipped { folder: PathBuf },
}

/// Replace characters that cannot appear in a folder name.
pub fn sanitize_folder_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned
    }
}

/// Creates one working folder per task.
pub struct TaskStager {
    config: StagingConfig,
}

impl TaskStager {
    pub fn new(config: StagingConfig) -> Self {
        Self { config }
    }

    pub fn folder_for(&self, task: &Task) -> PathBuf {
        self.config.task_root.join(sanitize_folder_name(&task.name))
    }

    /// Stage a single task. Existing folders are left alone.
    ///
    /// The template is checked before anything is created, so a missing
    /// template leaves no half-staged folder behind and the task is retried
    /// on the next listing.
    pub fn stage(&self, task: &Task) -> Result<StageResult> {
        let folder = self.folder_for(task);
        if folder.exists() {
            debug!(task = %task.name, "Task folder already exists, skipping setup");
            return Ok(StageResult::Skipped { folder });
        }

        let template = self.template_path()?;

        fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create task folder {}", folder.display()))?;

        if let Some(ref mirror_root) = self.config.mirror_root {
            let mirror = mirror_root.join(sanitize_folder_name(&task.name));
            fs::create_dir_all(&mirror)
                .with_context(|| format!("Failed to create mirror folder {}", mirror.display()))?;
        }

        if let Some(template) = template {
            let target = folder.join(project_file_name(&task.name, &template));
            fs::copy(&template, &target).with_context(|| {
                format!("Failed to copy template project to {}", target.display())
            })?;
        }

        let description = task.description_text();
        fs::write(folder.join(DESCRIPTION_FILE), description)
            .context("Failed to write task description")?;

        let download_names = extract_download_names(description);
        let hrefs = extract_hrefs(description);
        if !download_names.is_empty() || !hrefs.is_empty() {
            fs::write(folder.join(LINKS_FILE), render_links(&download_names, &hrefs))
                .context("Failed to write task links")?;
        }

        info!(
            task = %task.name,
            download_names = download_names.len(),
            links = hrefs.len(),
            "Task folder staged"
        );
        Ok(StageResult::Created {
            folder,
            download_names: download_names.len(),
            links: hrefs.len(),
        })
    }

    fn template_path(&self) -> Result<Option<PathBuf>> {
        let Some(ref name) = self.config.template_project else {
            return Ok(None);
        };
        let path = self.config.task_root.join(name);
        if !path.is_file() {
            anyhow::bail!("Template project not found at {}", path.display());
        }
        Ok(Some(path))
    }
}

/// `<task name>.<template extension>`
fn project_file_name(task_name: &str, template: &Path) -> String {
    let stem = sanitize_folder_name(task_name);
    match template.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

fn render_links(download_names: &[String], hrefs: &[String]) -> String {
    let mut out = String::new();
    if !download_names.is_empty() {
        out.push_str("Download folders:\n");
        for name in download_names {
            out.push_str(name);
            out.push('\n');
        }
    }
    if !hrefs.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Links:\n");
        for href in hrefs {
            out.push_str(href);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskCollection;

    fn task(name: &str, description: &str) -> Task {
        let body = serde_json::json!([{
            "taskId": "t1",
            "name": name,
            "creatingTime": "2024-05-01T10:00:00Z",
            "status": "MOTION_TODO",
            "description": description,
        }]);
        TaskCollection::from_json(&body.to_string())
            .unwrap()
            .tasks
            .remove(0)
    }

    fn setup() -> (tempfile::TempDir, TaskStager) {
        let dir = tempfile::tempdir().unwrap();
        let task_root = dir.path().join("tasks");
        fs::create_dir_all(&task_root).unwrap();
        fs::write(task_root.join("template.aep"), b"project").unwrap();
        let stager = TaskStager::new(StagingConfig {
            task_root,
            mirror_root: Some(dir.path().join("mirror")),
            template_project: Some("template.aep".to_string()),
        });
        (dir, stager)
    }

    #[test]
    fn test_stage_creates_folder_contents() {
        let (dir, stager) = setup();
        let description = r#"Use 12.03.2024 F-Video_N-Spring_Co-120_De-XY and <a href="https://example.com/ref.png">ref</a>"#;
        let task = task("Spring Promo", description);

        let result = stager.stage(&task).unwrap();
        let folder = dir.path().join("tasks").join("Spring Promo");
        assert_eq!(
            result,
            StageResult::Created {
                folder: folder.clone(),
                download_names: 1,
                links: 1,
            }
        );

        assert_eq!(fs::read(folder.join("Spring Promo.aep")).unwrap(), b"project");
        assert_eq!(fs::read_to_string(folder.join(DESCRIPTION_FILE)).unwrap(), description);
        let links = fs::read_to_string(folder.join(LINKS_FILE)).unwrap();
        assert!(links.contains("12.03.2024 F-Video_N-Spring_Co-120_De-XY"));
        assert!(links.contains("https://example.com/ref.png"));
        assert!(dir.path().join("mirror").join("Spring Promo").is_dir());
    }

    #[test]
    fn test_existing_folder_is_skipped() {
        let (dir, stager) = setup();
        let task = task("Already There", "");
        let folder = dir.path().join("tasks").join("Already There");
        fs::create_dir_all(&folder).unwrap();

        assert_eq!(stager.stage(&task).unwrap(), StageResult::Skipped { folder: folder.clone() });
        assert!(!folder.join(DESCRIPTION_FILE).exists());
    }

    #[test]
    fn test_missing_template_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let stager = TaskStager::new(StagingConfig {
            task_root: dir.path().to_path_buf(),
            mirror_root: None,
            template_project: Some("missing.aep".to_string()),
        });
        let task = task("Needs Template", "");

        assert!(stager.stage(&task).is_err());
        assert!(!dir.path().join("Needs Template").exists());
    }

    #[test]
    fn test_no_links_file_without_links() {
        let (dir, stager) = setup();
        stager.stage(&task("Plain", "just text")).unwrap();
        assert!(!dir.path().join("tasks").join("Plain").join(LINKS_FILE).exists());
    }

    #[test]
    fn test_sanitize_folder_name() {
        assert_eq!(sanitize_folder_name("Promo: A/B test?"), "Promo_ A_B test_");
        assert_eq!(sanitize_folder_name("  ..  "), "untitled");
        assert_eq!(sanitize_folder_name("Normal name"), "Normal name");
    }
}
