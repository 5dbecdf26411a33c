//! JWT Claims structure
//!
//! One claims shape serves both portals: staff sessions carry the staff
//! username, e-service sessions carry the holder's NRIC and holder id.

use chrono::{Duration, Utc};
use edufund_core::models::UserRole;
use serde::{Deserialize, Serialize};

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (staff username, or NRIC for account holders)
    pub sub: String,

    /// Session role
    pub role: UserRole,

    /// Account holder id, present only on e-service sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_id: Option<i32>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create staff claims; expiration is filled in by `JwtService`
    ///
    /// # Examples
    ///
    /// ```
    /// use edufund_auth::Claims;
    /// use edufund_core::models::UserRole;
    ///
    /// let claims = Claims::staff("admin", UserRole::Admin);
    /// assert_eq!(claims.sub, "admin");
    /// assert!(claims.holder_id.is_none());
    /// ```
    pub fn staff(username: &str, role: UserRole) -> Self {
        Self {
            sub: username.to_string(),
            role,
            holder_id: None,
            iat: Utc::now().timestamp(),
            exp: 0,
        }
    }

    /// Create e-service claims for an account holder
    pub fn holder(holder_id: i32, nric: &str) -> Self {
        Self {
            sub: nric.to_string(),
            role: UserRole::Holder,
            holder_id: Some(holder_id),
            iat: Utc::now().timestamp(),
            exp: 0,
        }
    }

    /// Set expiration relative to now
    pub fn expires_in(mut self, secs: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(secs)).timestamp();
        self
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }

    /// Get the subject (username or NRIC)
    pub fn username(&self) -> &str {
        &self.sub
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    /// Check if claims belong to an Admin Portal session
    pub fn is_staff(&self) -> bool {
        self.role.is_staff() && self.holder_id.is_none()
    }

    pub fn is_admin(&self) -> bool {
        self.is_staff() && self.role.is_admin()
    }

    pub fn is_superadmin(&self) -> bool {
        self.is_staff() && self.role.is_superadmin()
    }

    /// Holder id of an e-service session
    pub fn holder_id(&self) -> Option<i32> {
        match self.role {
            UserRole::Holder => self.holder_id,
            _ => None,
        }
    }
}
