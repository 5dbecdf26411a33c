//! Password hashing and verification using Argon2id
//!
//! Used for staff passwords and for the optional E-Service password of an
//! account holder.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use edufund_core::error::AppError;
use rand_core::OsRng;
use tracing::{debug, error};

/// Shortest password accepted for either portal
pub const MIN_PASSWORD_LEN: usize = 8;

/// Password hashing service using Argon2
#[derive(Debug, Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hash a password into a PHC string
    ///
    /// # Examples
    ///
    /// ```
    /// use edufund_auth::PasswordService;
    ///
    /// let password_service = PasswordService::new();
    /// let hash = password_service.hash_password("my_secure_password")?;
    /// assert!(hash.starts_with("$argon2"));
    /// # Ok::<(), edufund_core::error::AppError>(())
    /// ```
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                AppError::PasswordHash(format!("Password hashing failed: {}", e))
            })?;

        Ok(password_hash.to_string())
    }

    /// Check the length rule, then hash
    pub fn hash_new_password(&self, password: &str) -> Result<String, AppError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        self.hash_password(password)
    }

    /// Verify a password against a hash
    ///
    /// Returns `Ok(false)` on mismatch and `AppError::PasswordHash` when the
    /// stored hash cannot be parsed.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "Failed to parse password hash");
            AppError::PasswordHash(format!("Invalid password hash format: {}", e))
        })?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password verification failed: incorrect password");
                Ok(false)
            }
            Err(e) => {
                error!(error = %e, "Password verification error");
                Err(AppError::PasswordHash(format!(
                    "Password verification failed: {}",
                    e
                )))
            }
        }
    }

    /// Verify login credentials, collapsing every failure into `InvalidCredentials`
    ///
    /// A missing hash (holder without an E-Service password) never matches.
    pub fn check_credentials(&self, password: &str, hash: Option<&str>) -> Result<(), AppError> {
        let hash = hash.ok_or(AppError::InvalidCredentials)?;
        match self.verify_password(password, hash) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::InvalidCredentials),
            Err(e) => {
                error!("Stored password hash is unusable: {}", e);
                Err(AppError::InvalidCredentials)
            }
        }
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let service = PasswordService::new();
        let hash = service.hash_password("test_password").unwrap();

        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password() {
        let service = PasswordService::new();
        let hash = service.hash_password("correct_password").unwrap();

        assert!(service.verify_password("correct_password", &hash).unwrap());
        assert!(!service.verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let service = PasswordService::new();

        let hash1 = service.hash_password("same_password").unwrap();
        let hash2 = service.hash_password("same_password").unwrap();

        assert_ne!(hash1, hash2);
        assert!(service.verify_password("same_password", &hash1).unwrap());
        assert!(service.verify_password("same_password", &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let service = PasswordService::new();
        let result = service.verify_password("password", "not_a_valid_hash");

        assert!(matches!(result, Err(AppError::PasswordHash(_))));
    }

    #[test]
    fn test_unicode_password() {
        let service = PasswordService::new();
        let password = "密码-kata laluan-கடவுச்சொல்";
        let hash = service.hash_password(password).unwrap();

        assert!(service.verify_password(password, &hash).unwrap());
    }

    #[test]
    fn test_hash_new_password_enforces_length() {
        let service = PasswordService::new();

        let err = service.hash_new_password("short").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(service.hash_new_password("long enough").is_ok());
    }

    #[test]
    fn test_check_credentials() {
        let service = PasswordService::new();
        let hash = service.hash_password("holder-pass").unwrap();

        assert!(service.check_credentials("holder-pass", Some(&hash)).is_ok());
        assert!(matches!(
            service.check_credentials("other", Some(&hash)),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.check_credentials("holder-pass", None),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.check_credentials("holder-pass", Some("garbage")),
            Err(AppError::InvalidCredentials)
        ));
    }
}
