/// Error type shared by every storage operation
///
/// The first group of variants are expected, user-facing conditions: the
/// front end shows them as a notice and carries on. The rest mean the backing
/// store could not do its job and are not recoverable by the user.
///
/// # Example
///
/// ```
/// use taskdesk_shared::error::StorageError;
///
/// let err = StorageError::UserNotFound("alice".to_string());
/// assert!(err.is_recoverable());
/// assert_eq!(err.to_string(), "User 'alice' does not exist");
/// ```

use crate::auth::password::PasswordError;

/// Result alias used throughout the storage layer
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Username is empty after trimming
    #[error("Username must not be empty")]
    EmptyUsername,

    /// Password is empty
    #[error("Password must not be empty")]
    EmptyPassword,

    /// Another account already uses this username
    #[error("User '{0}' already exists")]
    UserAlreadyExists(String),

    /// No account with this username
    #[error("User '{0}' does not exist")]
    UserNotFound(String),

    /// Password did not match the stored hash
    #[error("Wrong password")]
    WrongPassword,

    /// Task description is empty after trimming
    #[error("Task description must not be empty")]
    EmptyDescription,

    /// No open task with this id belongs to the user
    #[error("Open task #{0} not found")]
    TaskNotFound(i64),

    /// Input failed a length or format rule
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The store cannot be reached (connection refused, pool exhausted, ...)
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Stored hash could not be processed
    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl StorageError {
    /// True for conditions the user can fix by changing their input
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::EmptyUsername
                | StorageError::EmptyPassword
                | StorageError::UserAlreadyExists(_)
                | StorageError::UserNotFound(_)
                | StorageError::WrongPassword
                | StorageError::EmptyDescription
                | StorageError::TaskNotFound(_)
                | StorageError::Validation(_)
        )
    }
}

/// Convert sqlx errors to storage errors
///
/// Unique violations are not mapped here: only the call site knows which
/// entity collided.
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(e) => StorageError::StorageUnavailable(e.to_string()),
            sqlx::Error::Tls(e) => StorageError::StorageUnavailable(e.to_string()),
            sqlx::Error::PoolTimedOut => {
                StorageError::StorageUnavailable("timed out waiting for a connection".to_string())
            }
            sqlx::Error::PoolClosed => {
                StorageError::StorageUnavailable("connection pool is closed".to_string())
            }
            sqlx::Error::Configuration(e) => StorageError::StorageUnavailable(e.to_string()),
            other => StorageError::Database(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for StorageError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "is invalid".to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        messages.sort();
        StorageError::Validation(messages.join("; "))
    }
}
