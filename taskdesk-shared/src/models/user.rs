/// Accounts table
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(150) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL
/// );
/// ```
///
/// Every function takes a `&mut PgConnection` so it can run inside the caller's
/// transaction. Username comparison is exact and case-sensitive.

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use validator::Validate;

/// Registered account. Only the password hash is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Auto-assigned user ID
    pub id: i64,

    /// Unique login name, stored trimmed
    pub username: String,

    /// Argon2id password hash (PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Row to insert at registration
#[derive(Debug, Clone, Validate)]
pub struct CreateUser {
    /// Login name, already trimmed
    #[validate(length(min = 1, max = 150, message = "must be between 1 and 150 characters"))]
    pub username: String,

    /// Output of [`crate::auth::password::hash_password`]
    pub password_hash: String,
}

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails with a database error carrying a unique violation if the username
    /// is taken.
    pub async fn create(conn: &mut PgConnection, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash
            "#,
        )
        .bind(data.username)
        .bind(data.password_hash)
        .fetch_one(conn)
        .await?;

        Ok(user)
    }

    /// Finds a user by exact username
    pub async fn find_by_username(
        conn: &mut PgConnection,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(conn)
        .await?;

        Ok(user)
    }

    /// Deletes a user by ID
    ///
    /// ⚠️  All of the user's tasks go with it (ON DELETE CASCADE).
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_validation() {
        let ok = CreateUser {
            username: "alice".to_string(),
            password_hash: "$argon2id$...".to_string(),
        };
        assert!(ok.validate().is_ok());

        let too_long = CreateUser {
            username: "x".repeat(151),
            password_hash: "$argon2id$...".to_string(),
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_username_length_counts_characters() {
        let cyrillic = CreateUser {
            username: "я".repeat(150),
            password_hash: "$argon2id$...".to_string(),
        };
        assert!(cyrillic.validate().is_ok());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "secret-hash".to_string(),
        };
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("alice"));
    }
}
