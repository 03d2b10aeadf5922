/// Storage backends
///
/// [`Store`] is the seam between the facade and persistence. Every method is
/// one unit of work: it resolves the username to a user, does its job and
/// releases everything before returning, success or not. A method never sees
/// state left over from another call.
///
/// Backends:
///
/// - [`postgres::PgStore`]: PostgreSQL via sqlx, one transaction per call
/// - [`memory::MemoryStore`]: process-local, for development and tests

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::task::{CompletionPolicy, CreateTask, Task, TaskFilter};
use crate::models::user::{CreateUser, User};

pub mod memory;
pub mod postgres;

#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a user. A taken username is `UserAlreadyExists`.
    async fn create_user(&self, data: CreateUser) -> StorageResult<User>;

    /// Looks up a user by exact username
    async fn find_user(&self, username: &str) -> StorageResult<Option<User>>;

    /// Deletes a user and, by cascade, its tasks
    async fn delete_user(&self, username: &str) -> StorageResult<()>;

    /// Inserts an open task owned by `username`
    async fn add_task(&self, username: &str, data: CreateTask) -> StorageResult<Task>;

    /// Open tasks, deadline ascending with undated last, then id
    async fn open_tasks(&self, username: &str) -> StorageResult<Vec<Task>>;

    /// Completed tasks in completion order, then id
    async fn completed_tasks(&self, username: &str) -> StorageResult<Vec<Task>>;

    /// Open tasks matching `filter`, ordered by id
    async fn search_open_tasks(&self, username: &str, filter: &TaskFilter)
        -> StorageResult<Vec<Task>>;

    /// Completes one open task by id. Missing, foreign or finished tasks are
    /// `TaskNotFound`.
    async fn complete_task(&self, username: &str, task_id: i64) -> StorageResult<Task>;

    /// Completes open tasks with exactly this description, per `policy`
    async fn complete_by_description(
        &self,
        username: &str,
        description: &str,
        policy: CompletionPolicy,
    ) -> StorageResult<Vec<Task>>;

    /// Releases connections. Calls made afterwards fail.
    async fn close(&self) {}
}
