/// Storage facade
///
/// `Storage` is the one type a front end talks to. It owns a [`Store`]
/// backend, the password cost and the completion policy, and turns rows into
/// display lines.
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::password::PasswordConfig;
/// use taskdesk_shared::storage::Storage;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = Storage::in_memory().with_password_config(PasswordConfig::insecure_fast());
///
/// storage.register("alice", "secret").await?;
/// let session = storage.login("alice", "secret").await?;
///
/// let task = storage.add_task(&session, "Buy milk", None, "Хобби").await?;
/// assert_eq!(storage.list_open_tasks(&session).await?[0].text, "[Хобби] Buy milk");
///
/// storage.complete_task(&session, task.id).await?;
/// assert_eq!(storage.list_completed_tasks(&session).await?, vec!["Buy milk"]);
/// # Ok(())
/// # }
/// ```

use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, error, info};
use validator::Validate;

use crate::auth::credentials;
use crate::auth::password::PasswordConfig;
use crate::config::AppConfig;
use crate::db::{migrations, pool};
use crate::error::{StorageError, StorageResult};
use crate::models::task::{CompletionPolicy, CreateTask, Task, TaskFilter};
use crate::models::user::User;
use crate::render::{self, TaskLine};
use crate::session::Session;
use crate::store::memory::MemoryStore;
use crate::store::postgres::PgStore;
use crate::store::Store;

#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn Store>,
    password: PasswordConfig,
    completion_policy: CompletionPolicy,
}

impl Storage {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            password: PasswordConfig::default(),
            completion_policy: CompletionPolicy::default(),
        }
    }

    /// Process-local storage that forgets everything on exit
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Connects to PostgreSQL and brings the schema up to date
    ///
    /// In development a missing database is created first.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` if the server cannot be reached, `Migration` if the
    /// schema cannot be applied.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let database = config.database_config()?;
        if config.creates_missing_database() {
            migrations::ensure_database_exists(&database.url)
                .await
                .map_err(StorageError::from)?;
        }

        let pool = pool::create_pool(database).await.map_err(|err| {
            let err = StorageError::from(err);
            error!(error = %err, "Could not open database pool");
            err
        })?;

        migrations::run_migrations(&pool)
            .await
            .map_err(StorageError::from)?;
        let status = migrations::migration_status(&pool)
            .await
            .map_err(StorageError::from)?;
        info!(
            applied_migrations = status.applied_migrations(),
            latest_version = ?status.latest_version(),
            "Database schema ready"
        );

        Ok(Self::new(Arc::new(PgStore::new(pool)))
            .with_password_config(config.password)
            .with_completion_policy(config.completion_policy))
    }

    pub fn with_password_config(mut self, password: PasswordConfig) -> Self {
        self.password = password;
        self
    }

    pub fn with_completion_policy(mut self, policy: CompletionPolicy) -> Self {
        self.completion_policy = policy;
        self
    }

    pub fn completion_policy(&self) -> CompletionPolicy {
        self.completion_policy
    }

    /// Releases backend resources. Call once, on shutdown.
    pub async fn close(&self) {
        self.store.close().await;
    }

    // -------------------- accounts --------------------

    /// Registers a new account. See [`credentials::register`] for the rules.
    pub async fn register(&self, username: &str, password: &str) -> StorageResult<User> {
        credentials::register(self.store.as_ref(), &self.password, username, password).await
    }

    /// Checks credentials without starting a session
    pub async fn verify(&self, username: &str, password: &str) -> StorageResult<()> {
        credentials::verify(self.store.as_ref(), username, password).await?;
        Ok(())
    }

    /// Checks credentials and hands back the session to use for task calls
    pub async fn login(&self, username: &str, password: &str) -> StorageResult<Session> {
        let user = credentials::verify(self.store.as_ref(), username, password).await?;
        info!(user_id = user.id, username = %user.username, "User logged in");
        Ok(Session::new(user.username))
    }

    /// Removes the account and every task it owns
    pub async fn delete_account(&self, session: &Session) -> StorageResult<()> {
        self.store.delete_user(session.username()).await?;
        info!(username = session.username(), "Deleted account");
        Ok(())
    }

    // -------------------- tasks --------------------

    /// Adds an open task
    ///
    /// The description is trimmed; blank is `EmptyDescription`. The category
    /// must be 1 to 50 characters.
    pub async fn add_task(
        &self,
        session: &Session,
        description: &str,
        deadline: Option<NaiveDateTime>,
        category: &str,
    ) -> StorageResult<Task> {
        let description = description.trim();
        if description.is_empty() {
            return Err(StorageError::EmptyDescription);
        }

        let data = CreateTask {
            description: description.to_string(),
            deadline,
            category: category.trim().to_string(),
        };
        data.validate()?;

        let task = self.store.add_task(session.username(), data).await?;
        info!(
            username = session.username(),
            task_id = task.id,
            category = %task.category,
            "Added task"
        );
        Ok(task)
    }

    /// Open tasks rendered against the current local time
    pub async fn list_open_tasks(&self, session: &Session) -> StorageResult<Vec<TaskLine>> {
        self.list_open_tasks_at(session, Local::now().naive_local())
            .await
    }

    /// Open tasks rendered against `now`, which decides the overdue marker
    pub async fn list_open_tasks_at(
        &self,
        session: &Session,
        now: NaiveDateTime,
    ) -> StorageResult<Vec<TaskLine>> {
        let tasks = self.store.open_tasks(session.username()).await?;
        Ok(tasks.iter().map(|t| render::open_line(t, now)).collect())
    }

    /// Raw open tasks, in list order
    pub async fn open_tasks(&self, session: &Session) -> StorageResult<Vec<Task>> {
        self.store.open_tasks(session.username()).await
    }

    /// Completes one task by id
    pub async fn complete_task(&self, session: &Session, task_id: i64) -> StorageResult<Task> {
        let task = self.store.complete_task(session.username(), task_id).await?;
        info!(username = session.username(), task_id, "Completed task");
        Ok(task)
    }

    /// Completes open tasks whose description equals `description`
    ///
    /// With [`CompletionPolicy::All`] every match is completed, with
    /// [`CompletionPolicy::First`] only the oldest. Returns how many were
    /// completed; no match is not an error.
    pub async fn complete_by_description(
        &self,
        session: &Session,
        description: &str,
    ) -> StorageResult<usize> {
        let completed = self
            .store
            .complete_by_description(session.username(), description, self.completion_policy)
            .await?;
        info!(
            username = session.username(),
            count = completed.len(),
            policy = ?self.completion_policy,
            "Completed tasks by description"
        );
        Ok(completed.len())
    }

    /// Descriptions of completed tasks, oldest completion first
    pub async fn list_completed_tasks(&self, session: &Session) -> StorageResult<Vec<String>> {
        let tasks = self.store.completed_tasks(session.username()).await?;
        Ok(tasks.into_iter().map(|t| t.description).collect())
    }

    /// Searches open tasks. Lines carry the deadline but no overdue marker.
    pub async fn search_tasks(
        &self,
        session: &Session,
        filter: &TaskFilter,
    ) -> StorageResult<Vec<TaskLine>> {
        let tasks = self
            .store
            .search_open_tasks(session.username(), filter)
            .await?;
        debug!(username = session.username(), hits = tasks.len(), "Search finished");
        Ok(tasks.iter().map(render::search_line).collect())
    }
}
