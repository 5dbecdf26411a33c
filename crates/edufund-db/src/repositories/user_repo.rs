//! User repository implementation
//!
//! Provides PostgreSQL-backed storage for Admin Portal staff accounts.

use super::is_unique_violation;
use edufund_core::{
    models::{User, UserRole},
    traits::{Repository, UserRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::str::FromStr;
use tracing::{debug, error, instrument};

const USER_COLUMNS: &str = "id, username, password_hash, full_name, email, role, is_active, \
     last_login, created_at, updated_at";

/// PostgreSQL implementation of UserRepository
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse user role from string
    fn parse_role(s: &str) -> UserRole {
        match UserRole::from_str(s) {
            Ok(role) if role.is_staff() => role,
            _ => UserRole::Operator,
        }
    }

    fn map_row(row: PgRow) -> User {
        User {
            id: row.get("id"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            role: Self::parse_role(row.get("role")),
            is_active: row.get("is_active"),
            last_login: row.get("last_login"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl Repository<User, i32> for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        debug!("Finding user by id: {}", id);

        let result = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .map(Self::map_row)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding user {}: {}", id, e);
                AppError::Database(format!("Failed to find user: {}", e))
            })?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<User>> {
        debug!("Finding all users with limit {} offset {}", limit, offset);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .map(Self::map_row)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding users: {}", e);
            AppError::Database(format!("Failed to fetch users: {}", e))
        })?;

        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting users: {}", e);
                AppError::Database(format!("Failed to count users: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &User) -> AppResult<User> {
        debug!("Creating user: {}", entity.username);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (
                username, password_hash, full_name, email, role, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&entity.username)
        .bind(&entity.password_hash)
        .bind(&entity.full_name)
        .bind(&entity.email)
        .bind(entity.role.as_str())
        .bind(entity.is_active)
        .map(Self::map_row)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating user: {}", e);
            if is_unique_violation(&e) {
                AppError::AlreadyExists(format!("User {} already exists", entity.username))
            } else {
                AppError::Database(format!("Failed to create user: {}", e))
            }
        })?;

        Ok(row)
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &User) -> AppResult<User> {
        debug!("Updating user: {}", entity.id);

        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET full_name = $2,
                email = $3,
                role = $4,
                is_active = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(entity.id)
        .bind(&entity.full_name)
        .bind(&entity.email)
        .bind(entity.role.as_str())
        .bind(entity.is_active)
        .map(Self::map_row)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating user {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update user: {}", e))
        })?
        .ok_or_else(|| AppError::UserNotFound(entity.id.to_string()))?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting user: {}", id);

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting user {}: {}", id, e);
                AppError::Database(format!("Failed to delete user: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        debug!("Finding user by username: {}", username);

        let result = sqlx::query(&format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(username.trim())
        .map(Self::map_row)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding user by username: {}", e);
            AppError::Database(format!("Failed to find user: {}", e))
        })?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn update_last_login(&self, id: i32) -> AppResult<()> {
        debug!("Updating last login for user: {}", id);

        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error updating last login for user {}: {}", id, e);
                AppError::Database(format!("Failed to update last login: {}", e))
            })?;

        Ok(())
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, id: i32, password_hash: &str) -> AppResult<bool> {
        debug!("Updating password for user: {}", id);

        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating password for user {}: {}", id, e);
            AppError::Database(format!("Failed to update password: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(PgUserRepository::parse_role("admin"), UserRole::Admin);
        assert_eq!(PgUserRepository::parse_role("operator"), UserRole::Operator);
        assert_eq!(
            PgUserRepository::parse_role("superadmin"),
            UserRole::Superadmin
        );
        assert_eq!(PgUserRepository::parse_role("invalid"), UserRole::Operator);
        // Staff rows never carry the holder session role
        assert_eq!(PgUserRepository::parse_role("holder"), UserRole::Operator);
    }
}
