//! Audit log repository implementation
//!
//! Provides PostgreSQL-backed storage for audit logs.

use edufund_core::{
    models::{AuditEntity, AuditLog, AuditLogData},
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder, Row};
use std::str::FromStr;
use tracing::{debug, error, instrument};

const AUDIT_COLUMNS: &str =
    "id, actor, action, entity_type, entity_id, details, ip_address, created_at";

/// Audit log listing conditions
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<AuditEntity>,
    pub entity_id: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// PostgreSQL implementation of AuditLog repository
pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    /// Create a new audit log repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> AuditLog {
        let entity_type: String = row.get("entity_type");
        AuditLog {
            id: row.get("id"),
            actor: row.get("actor"),
            action: row.get("action"),
            entity_type: AuditEntity::from_str(&entity_type).unwrap_or(AuditEntity::Session),
            entity_id: row.get("entity_id"),
            details: row.get("details"),
            ip_address: row.get("ip_address"),
            created_at: row.get("created_at"),
        }
    }

    /// Create a new audit log entry
    #[instrument(skip(self, data))]
    pub async fn create(&self, data: AuditLogData) -> AppResult<AuditLog> {
        debug!("Creating audit log: {} on {}", data.action, data.entity_type);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO audit_logs (
                actor, action, entity_type, entity_id, details, ip_address
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            AUDIT_COLUMNS
        ))
        .bind(&data.actor)
        .bind(&data.action)
        .bind(data.entity_type.as_str())
        .bind(&data.entity_id)
        .bind(&data.details)
        .bind(&data.ip_address)
        .map(Self::map_row)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating audit log: {}", e);
            AppError::Database(format!("Failed to create audit log: {}", e))
        })?;

        Ok(row)
    }

    /// Find audit logs with filters and pagination; returns the page and the total
    #[instrument(skip(self))]
    pub async fn find_with_filters(
        &self,
        filter: &AuditLogFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<AuditLog>, i64)> {
        debug!("Finding audit logs with filters");

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs WHERE 1=1");
        push_audit_filters(&mut count_qb, filter);

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM audit_logs WHERE 1=1",
            AUDIT_COLUMNS
        ));
        push_audit_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting audit logs: {}", e);
                AppError::Database(format!("Failed to count audit logs: {}", e))
            })?;

        let rows = qb
            .build()
            .map(Self::map_row)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding audit logs: {}", e);
                AppError::Database(format!("Failed to fetch audit logs: {}", e))
            })?;

        Ok((rows, total))
    }
}

fn push_audit_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AuditLogFilter) {
    if let Some(actor) = &filter.actor {
        qb.push(" AND actor = ").push_bind(actor.clone());
    }

    if let Some(action) = &filter.action {
        qb.push(" AND action = ").push_bind(action.clone());
    }

    if let Some(entity_type) = filter.entity_type {
        qb.push(" AND entity_type = ").push_bind(entity_type.as_str());
    }

    if let Some(entity_id) = &filter.entity_id {
        qb.push(" AND entity_id = ").push_bind(entity_id.clone());
    }

    if let Some(start) = filter.start_date {
        qb.push(" AND created_at >= ").push_bind(start);
    }

    if let Some(end) = filter.end_date {
        qb.push(" AND created_at <= ").push_bind(end);
    }
}
