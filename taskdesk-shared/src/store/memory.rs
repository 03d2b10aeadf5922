/// In-memory backend
///
/// Same contract as the PostgreSQL backend, including ordering, the unique
/// username rule and cascading deletes. Each call holds the state lock for its
/// whole duration, which is this backend's unit of work. Nothing survives the
/// process.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::Store;
use crate::error::{StorageError, StorageResult};
use crate::models::task::{CompletionPolicy, CreateTask, Task, TaskFilter};
use crate::models::user::{CreateUser, User};

#[derive(Debug, Default)]
struct State {
    last_user_id: i64,
    last_task_id: i64,
    users: Vec<User>,
    tasks: Vec<Task>,
}

impl State {
    fn resolve(&self, username: &str) -> StorageResult<i64> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
            .ok_or_else(|| StorageError::UserNotFound(username.to_string()))
    }

    fn open_of(&self, user_id: i64) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(move |t| t.user_id == user_id && t.is_open())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// Number of stored tasks across all users
    pub async fn task_count(&self) -> usize {
        self.state.lock().await.tasks.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StorageResult<User> {
        let mut state = self.state.lock().await;

        if state.users.iter().any(|u| u.username == data.username) {
            return Err(StorageError::UserAlreadyExists(data.username));
        }

        state.last_user_id += 1;
        let user = User {
            id: state.last_user_id,
            username: data.username,
            password_hash: data.password_hash,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, username: &str) -> StorageResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn delete_user(&self, username: &str) -> StorageResult<()> {
        let mut state = self.state.lock().await;
        let user_id = state.resolve(username)?;

        state.users.retain(|u| u.id != user_id);
        state.tasks.retain(|t| t.user_id != user_id);
        Ok(())
    }

    async fn add_task(&self, username: &str, data: CreateTask) -> StorageResult<Task> {
        let mut state = self.state.lock().await;
        let user_id = state.resolve(username)?;

        state.last_task_id += 1;
        let task = Task {
            id: state.last_task_id,
            user_id,
            description: data.description,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            deadline: data.deadline,
            category: data.category,
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn open_tasks(&self, username: &str) -> StorageResult<Vec<Task>> {
        let state = self.state.lock().await;
        let user_id = state.resolve(username)?;

        let mut tasks: Vec<Task> = state.open_of(user_id).cloned().collect();
        // None sorts after every Some, like NULLS LAST
        tasks.sort_by_key(|t| (t.deadline.is_none(), t.deadline, t.id));
        Ok(tasks)
    }

    async fn completed_tasks(&self, username: &str) -> StorageResult<Vec<Task>> {
        let state = self.state.lock().await;
        let user_id = state.resolve(username)?;

        let mut tasks: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.completed)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.completed_at, t.id));
        Ok(tasks)
    }

    async fn search_open_tasks(
        &self,
        username: &str,
        filter: &TaskFilter,
    ) -> StorageResult<Vec<Task>> {
        let state = self.state.lock().await;
        let user_id = state.resolve(username)?;

        let mut tasks: Vec<Task> = state
            .open_of(user_id)
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn complete_task(&self, username: &str, task_id: i64) -> StorageResult<Task> {
        let mut state = self.state.lock().await;
        let user_id = state.resolve(username)?;

        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.user_id == user_id && t.is_open())
            .ok_or(StorageError::TaskNotFound(task_id))?;

        task.completed = true;
        task.completed_at = Some(Utc::now());
        Ok(task.clone())
    }

    async fn complete_by_description(
        &self,
        username: &str,
        description: &str,
        policy: CompletionPolicy,
    ) -> StorageResult<Vec<Task>> {
        let mut state = self.state.lock().await;
        let user_id = state.resolve(username)?;

        let mut ids: Vec<i64> = state
            .open_of(user_id)
            .filter(|t| t.description == description)
            .map(|t| t.id)
            .collect();
        ids.sort_unstable();
        if policy == CompletionPolicy::First {
            ids.truncate(1);
        }

        let now = Utc::now();
        let mut completed = Vec::with_capacity(ids.len());
        for task in state.tasks.iter_mut().filter(|t| ids.contains(&t.id)) {
            task.completed = true;
            task.completed_at = Some(now);
            completed.push(task.clone());
        }
        Ok(completed)
    }
}
