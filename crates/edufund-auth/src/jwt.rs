//! JWT token creation and validation service
//!
//! Issues HS256 tokens for both portals. Staff and e-service sessions have
//! separate lifetimes.

use crate::claims::Claims;
use edufund_core::config::AuthConfig;
use edufund_core::error::AppError;
use edufund_core::models::UserRole;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::{debug, error, warn};

/// JWT Service for token creation and validation
#[derive(Clone)]
pub struct JwtService {
    staff_token_secs: i64,
    holder_token_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    ///
    /// # Examples
    ///
    /// ```
    /// use edufund_auth::JwtService;
    ///
    /// let jwt_service = JwtService::new("my-secret-key", 1800, 900);
    /// assert_eq!(jwt_service.holder_token_secs(), 900);
    /// ```
    pub fn new(secret: &str, staff_token_secs: i64, holder_token_secs: i64) -> Self {
        Self {
            staff_token_secs,
            holder_token_secs,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Build the service from the `auth` configuration section
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.staff_token_secs,
            config.holder_token_secs,
        )
    }

    /// Encode claims; a zero `exp` gets the lifetime matching the claims' role
    pub fn create_token(&self, claims: &Claims) -> Result<String, AppError> {
        let mut token_claims = claims.clone();
        if token_claims.exp == 0 {
            token_claims = token_claims.expires_in(self.lifetime_for(claims.role));
        }

        debug!(
            subject = %token_claims.sub,
            role = %token_claims.role,
            exp = token_claims.exp,
            "Creating JWT token"
        );

        encode(&Header::default(), &token_claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "Failed to create JWT token");
            AppError::InvalidToken(format!("Token creation failed: {}", e))
        })
    }

    /// Create an Admin Portal token
    pub fn create_staff_token(&self, username: &str, role: UserRole) -> Result<String, AppError> {
        if !role.is_staff() {
            return Err(AppError::Forbidden);
        }
        self.create_token(&Claims::staff(username, role))
    }

    /// Create an E-Service portal token
    pub fn create_holder_token(&self, holder_id: i32, nric: &str) -> Result<String, AppError> {
        self.create_token(&Claims::holder(holder_id, nric))
    }

    /// Validate a JWT token and extract claims
    ///
    /// # Errors
    ///
    /// - `AppError::TokenExpired` if the token has expired
    /// - `AppError::InvalidToken` if the token is malformed or badly signed
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    debug!("Token expired");
                    AppError::TokenExpired
                }
                _ => {
                    warn!(error = %e, "Invalid token");
                    AppError::InvalidToken(format!("Token validation failed: {}", e))
                }
            })?
            .claims;

        if claims.is_expired() {
            return Err(AppError::TokenExpired);
        }

        if claims.role == UserRole::Holder && claims.holder_id.is_none() {
            warn!(subject = %claims.sub, "Holder token without holder id");
            return Err(AppError::InvalidToken("Missing holder id".to_string()));
        }

        debug!(subject = %claims.sub, role = %claims.role, "Token validated");

        Ok(claims)
    }

    /// Token lifetime in seconds for a session role
    pub fn lifetime_for(&self, role: UserRole) -> i64 {
        match role {
            UserRole::Holder => self.holder_token_secs,
            _ => self.staff_token_secs,
        }
    }

    pub fn staff_token_secs(&self) -> i64 {
        self.staff_token_secs
    }

    pub fn holder_token_secs(&self) -> i64 {
        self.holder_token_secs
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("staff_token_secs", &self.staff_token_secs)
            .field("holder_token_secs", &self.holder_token_secs)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const TEST_SECRET: &str = "test-secret-key-for-jwt-testing-12345";

    fn service() -> JwtService {
        JwtService::new(TEST_SECRET, 1800, 900)
    }

    #[test]
    fn test_staff_token_round_trip() {
        let jwt_service = service();
        let token = jwt_service
            .create_staff_token("admin", UserRole::Superadmin)
            .unwrap();

        let claims = jwt_service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, UserRole::Superadmin);
        assert!(claims.exp <= Utc::now().timestamp() + 1800);
        assert!(claims.exp > Utc::now().timestamp() + 900);
    }

    #[test]
    fn test_holder_token_uses_shorter_lifetime() {
        let jwt_service = service();
        let token = jwt_service.create_holder_token(42, "T0123456J").unwrap();

        let claims = jwt_service.validate_token(&token).unwrap();
        assert_eq!(claims.holder_id(), Some(42));
        assert_eq!(claims.role, UserRole::Holder);
        assert!(claims.exp <= Utc::now().timestamp() + 900);
    }

    #[test]
    fn test_staff_token_refuses_holder_role() {
        let result = service().create_staff_token("someone", UserRole::Holder);
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[test]
    fn test_expired_token() {
        let jwt_service = service();
        let claims = Claims::staff("user", UserRole::Operator).expires_in(-10);
        let token = jwt_service.create_token(&claims).unwrap();

        let result = jwt_service.validate_token(&token);
        assert!(matches!(result, Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_invalid_token() {
        let result = service().validate_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_token_with_different_secret() {
        let issuer = JwtService::new("secret1", 1800, 900);
        let verifier = JwtService::new("secret2", 1800, 900);

        let token = issuer
            .create_staff_token("user", UserRole::Operator)
            .unwrap();
        let result = verifier.validate_token(&token);
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_holder_role_without_holder_id_is_rejected() {
        let jwt_service = service();
        let mut claims = Claims::holder(5, "S7654321B");
        claims.holder_id = None;
        let token = jwt_service.create_token(&claims).unwrap();

        let result = jwt_service.validate_token(&token);
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_debug_impl_hides_secret() {
        let debug_str = format!("{:?}", service());

        assert!(debug_str.contains("JwtService"));
        assert!(debug_str.contains("1800"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains(TEST_SECRET));
    }
}
