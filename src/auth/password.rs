//! Argon2 password hashing. Hashes are stored as PHC strings.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::ServiceError;

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// `Ok(false)` for a wrong password; errors only for an unreadable stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ServiceError::HashError(e.to_string())),
    }
}

/// Hashes on the blocking pool so request tasks are not stalled.
pub async fn hash_password_blocking(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::InternalError(format!("password hashing task failed: {e}")))?
}

pub async fn verify_password_blocking(
    password: String,
    stored_hash: String,
) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ServiceError::InternalError(format!("password check task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn hash_round_trip() {
        let hash = hash_password("Aa.123456").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Aa.123456", &hash).unwrap());
        assert!(!verify_password("Aa.654321", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(
            hash_password("Aa.123456").unwrap(),
            hash_password("Aa.123456").unwrap()
        );
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert_matches!(
            verify_password("Aa.123456", "not-a-hash"),
            Err(ServiceError::HashError(_))
        );
    }
}
