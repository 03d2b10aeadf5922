/// Registration and credential checks
///
/// Rules:
///
/// - usernames are trimmed; blank → `EmptyUsername`
/// - empty password → `EmptyPassword` (passwords are never trimmed)
/// - taken username → `UserAlreadyExists`, whether noticed by the pre-check
///   or by the store's unique constraint when two registrations race
/// - unknown username on login → `UserNotFound`, bad password → `WrongPassword`

use tracing::{info, warn};
use validator::Validate;

use super::password::{hash_password, verify_password, PasswordConfig};
use crate::error::{StorageError, StorageResult};
use crate::models::user::{CreateUser, User};
use crate::store::Store;

/// Creates an account
pub async fn register(
    store: &dyn Store,
    config: &PasswordConfig,
    username: &str,
    password: &str,
) -> StorageResult<User> {
    let username = username.trim();

    if username.is_empty() {
        return Err(StorageError::EmptyUsername);
    }
    if password.is_empty() {
        return Err(StorageError::EmptyPassword);
    }

    let mut data = CreateUser {
        username: username.to_string(),
        password_hash: String::new(),
    };
    data.validate()?;

    // Cheap rejection before paying for the hash
    if store.find_user(username).await?.is_some() {
        return Err(StorageError::UserAlreadyExists(username.to_string()));
    }

    data.password_hash = hash_password(password, config)?;

    let user = store.create_user(data).await?;
    info!(user_id = user.id, username = %user.username, "Registered user");
    Ok(user)
}

/// Checks a username/password pair
pub async fn verify(store: &dyn Store, username: &str, password: &str) -> StorageResult<User> {
    let user = store
        .find_user(username)
        .await?
        .ok_or_else(|| StorageError::UserNotFound(username.to_string()))?;

    if !verify_password(password, &user.password_hash)? {
        warn!(username, "Wrong password");
        return Err(StorageError::WrongPassword);
    }

    Ok(user)
}
