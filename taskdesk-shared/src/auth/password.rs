/// Argon2id password hashes
///
/// Hashes are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`). The
/// cost is part of each string, so raising [`PasswordConfig`] later does not
/// lock out accounts hashed under the old cost.
///
/// ```
/// use taskdesk_shared::auth::password::{hash_password, verify_password, PasswordConfig};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("123", &PasswordConfig::insecure_fast())?;
///
/// assert!(verify_password("123", &hash)?);
/// assert!(!verify_password("1234", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::password_hash::{
    rand_core::OsRng, Error as PhcError, PasswordHash, PasswordHasher, PasswordVerifier,
    SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Cost parameters out of range, or the hasher failed
    #[error("Could not hash password: {0}")]
    HashError(String),

    /// The verifier failed for a reason other than a mismatch
    #[error("Could not check password: {0}")]
    VerifyError(String),

    /// Stored value is not a PHC hash string
    #[error("Stored password hash is malformed: {0}")]
    InvalidHash(String),
}

/// Argon2id cost, read from the `password.*` configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Memory per hash in KiB
    pub memory_kib: u32,

    pub iterations: u32,

    /// Lanes; memory must be at least 8 KiB per lane
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    /// 64 MiB, 3 passes, 4 lanes
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl PasswordConfig {
    /// Cheapest parameters argon2 accepts. For tests only.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, Some(32))
            .map_err(|e| PasswordError::HashError(format!("bad cost parameters: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Hashes `password` under a fresh random salt
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    config
        .hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks `password` against a stored PHC string
///
/// The cost is taken from the hash, not from the current configuration. The
/// final comparison is constant-time. A mismatch is `Ok(false)`; only a
/// malformed hash or a verifier fault is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let stored = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(PhcError::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}
