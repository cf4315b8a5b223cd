/// Database models and response shapes
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(with = "crate::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::datetime")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Client device a user signed in from
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserDevice {
    pub id: String,
    pub user_id: String,
    pub user_agent: String,
    pub ip: String,
    pub detached: bool,
    #[serde(with = "crate::datetime")]
    pub latest_login_at: DateTime<Utc>,
    #[serde(with = "crate::datetime::option")]
    pub detached_at: Option<DateTime<Utc>>,
}

/// Refresh session record
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: String,
    pub device_id: String,
    pub refresh_token: String,
    pub last_visit_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Task list
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct List {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub is_default: bool,
    #[serde(with = "crate::datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Section of a list
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Heading {
    pub id: String,
    pub title: String,
    pub list_id: String,
    pub user_id: String,
    pub is_default: bool,
    #[serde(with = "crate::datetime")]
    pub updated_at: DateTime<Utc>,
}

/// User-defined tag; title is always lower case
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub title: String,
    pub user_id: String,
    #[serde(with = "crate::datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Task row as written by the repository
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status_id: i16,
    pub list_id: String,
    pub heading_id: String,
    pub user_id: String,
}

/// Closed set of task statuses, seeded by the initial migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    NotStarted,
    Planned,
    Completed,
    Archived,
}

impl TaskStatus {
    /// Title stored in the `statuses` table
    pub fn title(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not started",
            TaskStatus::Planned => "Planned",
            TaskStatus::Completed => "Completed",
            TaskStatus::Archived => "Archived",
        }
    }

    /// Seeded id, used by read filters
    pub fn id(&self) -> i16 {
        match self {
            TaskStatus::NotStarted => 1,
            TaskStatus::Planned => 2,
            TaskStatus::Completed => 3,
            TaskStatus::Archived => 4,
        }
    }
}

/// Task as returned to clients, with tags and derived `overdue`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    #[serde(default, with = "crate::datetime::option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::datetime::option")]
    pub end_time: Option<DateTime<Utc>>,
    pub status_id: i16,
    pub list_id: String,
    pub heading_id: String,
    pub tags: Vec<String>,
    pub overdue: bool,
    #[serde(with = "crate::datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Tasks of one heading
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HeadingTasks {
    pub heading_id: String,
    pub heading_title: String,
    pub is_default: bool,
    #[sqlx(json)]
    pub tasks: Vec<TaskResponse>,
}

/// Tasks of one list
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ListTasks {
    pub list_id: String,
    pub list_title: String,
    #[sqlx(json)]
    pub tasks: Vec<TaskResponse>,
}

/// Tasks starting on one date
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DateTasks {
    pub date: NaiveDate,
    #[sqlx(json)]
    pub tasks: Vec<TaskResponse>,
}

/// Tasks completed or archived within one month; `month` is its first day
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthTasks {
    pub month: NaiveDate,
    #[sqlx(json)]
    pub tasks: Vec<TaskResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ids_match_seed() {
        let all = [
            TaskStatus::NotStarted,
            TaskStatus::Planned,
            TaskStatus::Completed,
            TaskStatus::Archived,
        ];
        let ids: Vec<i16> = all.iter().map(TaskStatus::id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(TaskStatus::NotStarted.title(), "Not started");
    }

    #[test]
    fn test_task_response_decodes_store_json() {
        let raw = r#"{
            "id": "2ZkQ5f3v8yJbYgA7oYQqfW0bX1c",
            "title": "write report",
            "description": "",
            "start_date": "2025-01-15",
            "deadline": "2025-01-20",
            "start_time": null,
            "end_time": null,
            "status_id": 1,
            "list_id": "l",
            "heading_id": "h",
            "tags": ["work", "urgent"],
            "overdue": false,
            "updated_at": "2025-01-15 08:00:00"
        }"#;

        let task: TaskResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(task.tags, vec!["work", "urgent"]);
        assert_eq!(task.deadline, NaiveDate::from_ymd_opt(2025, 1, 20));
        assert!(!task.overdue);
    }
}
