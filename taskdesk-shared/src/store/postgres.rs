/// PostgreSQL backend
///
/// Each trait method opens a transaction, resolves the user, runs its queries
/// and commits. Any `?` before the commit drops the transaction, which rolls it
/// back and returns the connection to the pool.
///
/// # Example
///
/// ```no_run
/// use taskdesk_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskdesk_shared::store::postgres::PgStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
/// let store = PgStore::new(pool);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::Store;
use crate::db::pool::close_pool;
use crate::error::{StorageError, StorageResult};
use crate::models::task::{CompletionPolicy, CreateTask, Task, TaskFilter};
use crate::models::user::{CreateUser, User};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Resolve-or-fail, the first step of every task operation
async fn resolve_user(conn: &mut PgConnection, username: &str) -> StorageResult<User> {
    User::find_by_username(conn, username)
        .await?
        .ok_or_else(|| StorageError::UserNotFound(username.to_string()))
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, data: CreateUser) -> StorageResult<User> {
        let username = data.username.clone();
        let mut tx = self.pool.begin().await?;

        let user = User::create(&mut tx, data).await.map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StorageError::UserAlreadyExists(username.clone())
            }
            other => StorageError::from(other),
        })?;

        tx.commit().await?;
        Ok(user)
    }

    async fn find_user(&self, username: &str) -> StorageResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Ok(User::find_by_username(&mut conn, username).await?)
    }

    async fn delete_user(&self, username: &str) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        User::delete(&mut tx, user.id).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_task(&self, username: &str, data: CreateTask) -> StorageResult<Task> {
        let mut tx = self.pool.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        let task = Task::create(&mut tx, user.id, data).await?;

        tx.commit().await?;
        Ok(task)
    }

    async fn open_tasks(&self, username: &str) -> StorageResult<Vec<Task>> {
        let mut tx = self.pool.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        let tasks = Task::list_open(&mut tx, user.id).await?;

        tx.commit().await?;
        debug!(username, count = tasks.len(), "Fetched open tasks");
        Ok(tasks)
    }

    async fn completed_tasks(&self, username: &str) -> StorageResult<Vec<Task>> {
        let mut tx = self.pool.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        let tasks = Task::list_completed(&mut tx, user.id).await?;

        tx.commit().await?;
        debug!(username, count = tasks.len(), "Fetched completed tasks");
        Ok(tasks)
    }

    async fn search_open_tasks(
        &self,
        username: &str,
        filter: &TaskFilter,
    ) -> StorageResult<Vec<Task>> {
        let mut tx = self.pool.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        let tasks = Task::search_open(&mut tx, user.id, filter).await?;

        tx.commit().await?;
        debug!(username, count = tasks.len(), ?filter, "Searched open tasks");
        Ok(tasks)
    }

    async fn complete_task(&self, username: &str, task_id: i64) -> StorageResult<Task> {
        let mut tx = self.pool.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        let task = Task::complete_by_id(&mut tx, user.id, task_id)
            .await?
            .ok_or(StorageError::TaskNotFound(task_id))?;

        tx.commit().await?;
        Ok(task)
    }

    async fn complete_by_description(
        &self,
        username: &str,
        description: &str,
        policy: CompletionPolicy,
    ) -> StorageResult<Vec<Task>> {
        let mut tx = self.pool.begin().await?;
        let user = resolve_user(&mut tx, username).await?;

        let tasks = Task::complete_by_description(&mut tx, user.id, description, policy).await?;

        tx.commit().await?;
        Ok(tasks)
    }

    async fn close(&self) {
        close_pool(self.pool.clone()).await;
    }
}
