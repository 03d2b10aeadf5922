/// Tasks table and its queries
///
/// A task belongs to exactly one user and moves through a single one-way
/// transition: open → completed.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     description TEXT NOT NULL,
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     completed_at TIMESTAMPTZ,
///     deadline TIMESTAMP,
///     category VARCHAR(50) NOT NULL,
///     CHECK (completed = (completed_at IS NOT NULL))
/// );
/// ```
///
/// # Ordering
///
/// - open tasks: deadline ascending, undated tasks last, then id
/// - completed tasks: completed_at ascending, then id
/// - search results: id

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use validator::Validate;

/// Suggested categories offered by the front end
pub const CATEGORIES: [&str; 4] = ["Учебная", "Рабочая", "Домашняя", "Хобби"];

/// Category used when the caller does not pick one
pub const DEFAULT_CATEGORY: &str = "Учебная";

const TASK_COLUMNS: &str =
    "id, user_id, description, completed, created_at, completed_at, deadline, category";

/// Task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Auto-assigned task ID
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// What needs doing
    pub description: String,

    /// Whether the task has been completed
    pub completed: bool,

    /// Set by the database on insert
    pub created_at: DateTime<Utc>,

    /// When the task was completed (set iff `completed`)
    pub completed_at: Option<DateTime<Utc>>,

    /// Optional local-time deadline
    pub deadline: Option<NaiveDateTime>,

    /// Free-text category, usually one of [`CATEGORIES`]
    pub category: String,
}

impl Task {
    /// Open tasks are the ones not yet completed
    pub fn is_open(&self) -> bool {
        !self.completed
    }

    /// Overdue means open with a deadline strictly before `now`
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        match self.deadline {
            Some(deadline) => self.is_open() && deadline < now,
            None => false,
        }
    }
}

/// Row to insert for a new task
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTask {
    /// Task description, already trimmed
    #[validate(length(min = 1, message = "must not be empty"))]
    pub description: String,

    /// Optional deadline
    pub deadline: Option<NaiveDateTime>,

    /// Category
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub category: String,
}

/// How completing by description treats several open tasks with the same text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionPolicy {
    /// Complete every matching open task
    #[default]
    All,

    /// Complete only the oldest matching open task (lowest id)
    First,
}

impl std::str::FromStr for CompletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(CompletionPolicy::All),
            "first" => Ok(CompletionPolicy::First),
            other => Err(format!("unknown completion policy '{}' (expected all or first)", other)),
        }
    }
}

/// Search criteria applied on top of "open tasks of this user"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring of description or category
    pub text: Option<String>,

    /// Inclusive lower deadline bound
    pub date_from: Option<NaiveDateTime>,

    /// Inclusive upper deadline bound
    pub date_to: Option<NaiveDateTime>,
}

impl TaskFilter {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn date_from(mut self, from: NaiveDateTime) -> Self {
        self.date_from = Some(from);
        self
    }

    pub fn date_to(mut self, to: NaiveDateTime) -> Self {
        self.date_to = Some(to);
        self
    }

    /// Search text as given, or None when absent or empty
    ///
    /// Whitespace is part of the substring; `" milk"` does not match `"milk"`.
    pub fn needle(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Applies the filter to a single task
    ///
    /// Undated tasks never satisfy a date bound.
    pub fn matches(&self, task: &Task) -> bool {
        if !task.is_open() {
            return false;
        }

        if let Some(needle) = self.needle() {
            let needle = needle.to_lowercase();
            let hit = task.description.to_lowercase().contains(&needle)
                || task.category.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(from) = self.date_from {
            match task.deadline {
                Some(deadline) if deadline >= from => {}
                _ => return false,
            }
        }

        if let Some(to) = self.date_to {
            match task.deadline {
                Some(deadline) if deadline <= to => {}
                _ => return false,
            }
        }

        true
    }
}

/// Escapes LIKE wildcards so user text is matched literally
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Task {
    /// Inserts an open task for a user
    pub async fn create(
        conn: &mut PgConnection,
        user_id: i64,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (user_id, description, deadline, category)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(user_id)
        .bind(data.description)
        .bind(data.deadline)
        .bind(data.category)
        .fetch_one(conn)
        .await?;

        Ok(task)
    }

    /// Lists a user's open tasks, nearest deadline first, undated last
    pub async fn list_open(conn: &mut PgConnection, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {}
            FROM tasks
            WHERE user_id = $1 AND completed = FALSE
            ORDER BY deadline ASC NULLS LAST, id ASC
            "#,
            TASK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(tasks)
    }

    /// Lists a user's completed tasks in completion order
    pub async fn list_completed(
        conn: &mut PgConnection,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {}
            FROM tasks
            WHERE user_id = $1 AND completed = TRUE
            ORDER BY completed_at ASC, id ASC
            "#,
            TASK_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(tasks)
    }

    /// Searches a user's open tasks
    pub async fn search_open(
        conn: &mut PgConnection,
        user_id: i64,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        // Build dynamic query based on which criteria are present
        let mut query = format!(
            "SELECT {} FROM tasks WHERE user_id = $1 AND completed = FALSE",
            TASK_COLUMNS
        );
        let mut bind_count = 1;

        let needle = filter.needle().map(like_pattern);
        if needle.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND (description ILIKE ${0} ESCAPE '\\' OR category ILIKE ${0} ESCAPE '\\')",
                bind_count
            ));
        }
        if filter.date_from.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND deadline >= ${}", bind_count));
        }
        if filter.date_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND deadline <= ${}", bind_count));
        }

        query.push_str(" ORDER BY id ASC");

        let mut q = sqlx::query_as::<_, Task>(&query).bind(user_id);

        if let Some(pattern) = needle {
            q = q.bind(pattern);
        }
        if let Some(from) = filter.date_from {
            q = q.bind(from);
        }
        if let Some(to) = filter.date_to {
            q = q.bind(to);
        }

        let tasks = q.fetch_all(conn).await?;

        Ok(tasks)
    }

    /// Completes one open task owned by the user
    ///
    /// Returns None if the task does not exist, belongs to someone else, or is
    /// already completed.
    pub async fn complete_by_id(
        conn: &mut PgConnection,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET completed = TRUE,
                completed_at = NOW()
            WHERE id = $1 AND user_id = $2 AND completed = FALSE
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(task)
    }

    /// Completes open tasks whose description matches exactly
    pub async fn complete_by_description(
        conn: &mut PgConnection,
        user_id: i64,
        description: &str,
        policy: CompletionPolicy,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let limit = match policy {
            CompletionPolicy::All => "",
            CompletionPolicy::First => "LIMIT 1",
        };

        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET completed = TRUE,
                completed_at = NOW()
            WHERE id IN (
                SELECT id FROM tasks
                WHERE user_id = $1 AND description = $2 AND completed = FALSE
                ORDER BY id ASC
                {}
            )
            RETURNING {}
            "#,
            limit, TASK_COLUMNS
        ))
        .bind(user_id)
        .bind(description)
        .fetch_all(conn)
        .await?;

        Ok(tasks)
    }
}
