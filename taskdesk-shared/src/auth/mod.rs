/// Authentication
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`credentials`]: registration and login checks on top of a [`crate::store::Store`]
///
/// # Example
///
/// ```
/// use taskdesk_shared::auth::password::{hash_password, verify_password, PasswordConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password", &PasswordConfig::default())?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod credentials;
pub mod password;
