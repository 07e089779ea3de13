use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Workflow status of a task. Unknown values are preserved as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    MotionTodo,
    MotionInProcess,
    MotionReview,
    IllustrationTodo,
    IllustrationInProcess,
    IllustrationReview,
    Done,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::MotionTodo => "MOTION_TODO",
            TaskStatus::MotionInProcess => "MOTION_IN_PROCESS",
            TaskStatus::MotionReview => "MOTION_REVIEW",
            TaskStatus::IllustrationTodo => "ILLUSTRATION_TODO",
            TaskStatus::IllustrationInProcess => "ILLUSTRATION_IN_PROCESS",
            TaskStatus::IllustrationReview => "ILLUSTRATION_REVIEW",
            TaskStatus::Done => "DONE",
            TaskStatus::Other(s) => s,
        }
    }

    /// Statuses that call for a local working folder.
    pub fn is_actionable(&self) -> bool {
        matches!(self, TaskStatus::MotionTodo | TaskStatus::MotionInProcess)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "MOTION_TODO" => TaskStatus::MotionTodo,
            "MOTION_IN_PROCESS" => TaskStatus::MotionInProcess,
            "MOTION_REVIEW" => TaskStatus::MotionReview,
            "ILLUSTRATION_TODO" => TaskStatus::IllustrationTodo,
            "ILLUSTRATION_IN_PROCESS" => TaskStatus::IllustrationInProcess,
            "ILLUSTRATION_REVIEW" => TaskStatus::IllustrationReview,
            "DONE" => TaskStatus::Done,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    #[serde(rename = "productId")]
    pub product_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub name: String,
    pub creating_time: DateTime<Utc>,
    #[serde(default)]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status_change_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub launch_illustration: bool,
    #[serde(default)]
    pub launch_motion: bool,
    #[serde(default)]
    pub need_illustrator: Option<bool>,
    #[serde(default)]
    pub reference_link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ad_platforms: Vec<String>,
    #[serde(default)]
    pub localizations: Vec<String>,
    #[serde(default)]
    pub priority: i64,
    pub status: TaskStatus,
    #[serde(default)]
    pub image_result_link: Option<String>,
    #[serde(default)]
    pub motion_result_link: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub hypothesis_id: Option<String>,
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub illustrator_id: Option<String>,
    // Null when several motioners share the task; see `motioners`
    #[serde(default)]
    pub motioner_id: Option<String>,
    #[serde(default)]
    pub illustration_reviewer_id: Option<String>,
    #[serde(default)]
    pub motion_reviewer_id: Option<String>,
    #[serde(default)]
    pub child_task_id: Option<String>,
    #[serde(default)]
    pub products: Vec<ProductRef>,
    #[serde(default)]
    pub motioners: Vec<UserRef>,
    #[serde(default)]
    pub illustrators: Vec<UserRef>,
}

impl Task {
    /// True when any motioner on the task has the given user id.
    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.motioners.iter().any(|m| m.user_id == user_id)
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// The task listing either comes back as a bare array or wrapped in an object.
/// Entries stay raw so one malformed task cannot sink the listing.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskListResponse {
    List(Vec<serde_json::Value>),
    Wrapped {
        #[serde(alias = "data")]
        tasks: Vec<serde_json::Value>,
    },
}

/// Ordered tasks returned by one poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskCollection {
    pub tasks: Vec<Task>,
}

impl TaskCollection {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Parse a task listing body.
    ///
    /// Fails only when the body is not a listing at all. Individual entries
    /// that do not parse as a `Task` are logged and skipped.
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        let entries = match serde_json::from_str::<TaskListResponse>(body)? {
            TaskListResponse::List(entries) => entries,
            TaskListResponse::Wrapped { tasks } => tasks,
        };

        let mut tasks = Vec::with_capacity(entries.len());
        for entry in entries {
            let task_id = entry
                .get("taskId")
                .map(|id| id.to_string())
                .unwrap_or_default();
            match serde_json::from_value::<Task>(entry) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(task_id = %task_id, error = %e, "Skipping malformed task"),
            }
        }
        Ok(Self { tasks })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    /// Tasks where at least one motioner is `user_id`.
    pub fn assigned_to<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.is_assigned_to(user_id))
    }

    /// Assigned tasks that still need work.
    pub fn actionable_for<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.assigned_to(user_id).filter(|t| t.status.is_actionable())
    }
}

impl<'a> IntoIterator for &'a TaskCollection {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_json(id: &str, status: &str, motioner: &str) -> String {
        format!(
            r#"{{"taskId":"{id}","name":"Task {id}","creatingTime":"2024-05-01T10:00:00Z","finishTime":null,
            "launchIllustration":false,"launchMotion":true,"adPlatforms":["meta"],"localizations":["EN"],
            "priority":2,"status":"{status}","accountId":"acc-1","creatorId":"u-9","products":[{{"productId":"p-1"}}],
            "motioners":[{{"userId":"{motioner}"}}],"illustrators":[]}}"#
        )
    }

    #[test]
    fn test_parse_bare_array() {
        let body = format!("[{},{}]", task_json("1", "MOTION_TODO", "me"), task_json("2", "DONE", "you"));
        let tasks = TaskCollection::from_json(&body).expect("Failed to parse task list");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks.tasks[0].task_id, "1");
        assert_eq!(tasks.tasks[0].status, TaskStatus::MotionTodo);
        assert_eq!(tasks.tasks[0].products[0].product_id, "p-1");
        assert_eq!(tasks.tasks[1].status, TaskStatus::Done);
    }

    #[test]
    fn test_parse_wrapped_object() {
        let body = format!(r#"{{"tasks":[{}]}}"#, task_json("7", "MOTION_IN_PROCESS", "me"));
        let tasks = TaskCollection::from_json(&body).expect("Failed to parse wrapped list");
        assert_eq!(tasks.len(), 1);

        let body = format!(r#"{{"data":[{}]}}"#, task_json("8", "MOTION_IN_PROCESS", "me"));
        let tasks = TaskCollection::from_json(&body).expect("Failed to parse data-wrapped list");
        assert_eq!(tasks.tasks[0].task_id, "8");
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let body = format!("[{}]", task_json("1", "ARCHIVED_SOMEHOW", "me"));
        let tasks = TaskCollection::from_json(&body).unwrap();
        assert_eq!(tasks.tasks[0].status, TaskStatus::Other("ARCHIVED_SOMEHOW".to_string()));

        let json = serde_json::to_value(&tasks.tasks[0]).unwrap();
        assert_eq!(json["status"], "ARCHIVED_SOMEHOW");
    }

    #[test]
    fn test_actionable_filter() {
        let body = format!(
            "[{},{},{},{}]",
            task_json("1", "MOTION_TODO", "me"),
            task_json("2", "MOTION_IN_PROCESS", "me"),
            task_json("3", "MOTION_REVIEW", "me"),
            task_json("4", "MOTION_TODO", "someone-else"),
        );
        let tasks = TaskCollection::from_json(&body).unwrap();

        let assigned: Vec<_> = tasks.assigned_to("me").map(|t| t.task_id.as_str()).collect();
        assert_eq!(assigned, vec!["1", "2", "3"]);

        let actionable: Vec<_> = tasks.actionable_for("me").map(|t| t.task_id.as_str()).collect();
        assert_eq!(actionable, vec!["1", "2"]);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let body = r#"[{"taskId":"x","name":"Bare","creatingTime":"2024-05-01T10:00:00Z","status":"MOTION_TODO"}]"#;
        let tasks = TaskCollection::from_json(body).unwrap();
        let task = &tasks.tasks[0];
        assert!(task.motioners.is_empty());
        assert_eq!(task.description_text(), "");
        assert!(!task.is_assigned_to("me"));
    }

    #[test]
    fn test_malformed_task_is_skipped() {
        let bad = r#"{"taskId":"bad","name":"No zone","creatingTime":"2024-05-01T10:00:00","status":"MOTION_TODO"}"#;
        let body = format!("[{},{}]", bad, task_json("2", "MOTION_TODO", "me"));
        let tasks = TaskCollection::from_json(&body).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks.tasks[0].task_id, "2");
    }

    #[test]
    fn test_malformed_body_is_error() {
        assert!(TaskCollection::from_json(r#"{"message":"nope"}"#).is_err());
        assert!(TaskCollection::from_json("not json").is_err());
    }
}
