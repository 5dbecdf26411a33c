//! Top-up rule repository implementation
//!
//! Provides PostgreSQL-backed storage for top-up rules and their lifecycle.

use super::{parse_column, parse_optional};
use edufund_core::{
    models::{TopUpRule, TopUpRuleStatus},
    traits::{Repository, TopUpRuleRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument};

const RULE_COLUMNS: &str = "id, name, description, amount, min_age, max_age, \
     residential_status, schooling_status, education_level, scheduled_date, status, \
     executed_at, created_by, created_at, updated_at";

/// PostgreSQL implementation of TopUpRuleRepository
pub struct PgTopUpRuleRepository {
    pool: PgPool,
}

impl PgTopUpRuleRepository {
    /// Create a new top-up rule repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn age_param(age: Option<u32>) -> Option<i32> {
    age.map(|a| a.min(i32::MAX as u32) as i32)
}

#[async_trait]
impl Repository<TopUpRule, i32> for PgTopUpRuleRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<TopUpRule>> {
        debug!("Finding top-up rule by id: {}", id);

        let row = sqlx::query_as::<Postgres, TopUpRuleRow>(&format!(
            "SELECT {} FROM top_up_rules WHERE id = $1",
            RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding top-up rule {}: {}", id, e);
            AppError::Database(format!("Failed to find top-up rule: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn find_all(&self, limit: i64, offset: i64) -> AppResult<Vec<TopUpRule>> {
        let rows = sqlx::query_as::<Postgres, TopUpRuleRow>(&format!(
            "SELECT {} FROM top_up_rules ORDER BY scheduled_date DESC, id DESC LIMIT $1 OFFSET $2",
            RULE_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding top-up rules: {}", e);
            AppError::Database(format!("Failed to fetch top-up rules: {}", e))
        })?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM top_up_rules")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting top-up rules: {}", e);
                AppError::Database(format!("Failed to count top-up rules: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, entity), fields(name = %entity.name))]
    async fn create(&self, entity: &TopUpRule) -> AppResult<TopUpRule> {
        debug!("Creating top-up rule");

        let row = sqlx::query_as::<Postgres, TopUpRuleRow>(&format!(
            r#"
            INSERT INTO top_up_rules (
                name, description, amount, min_age, max_age, residential_status,
                schooling_status, education_level, scheduled_date, status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'scheduled', $10)
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.amount)
        .bind(age_param(entity.min_age))
        .bind(age_param(entity.max_age))
        .bind(entity.residential_status.map(|s| s.as_str()))
        .bind(entity.schooling_status.map(|s| s.as_str()))
        .bind(entity.education_level.map(|l| l.as_str()))
        .bind(entity.scheduled_date)
        .bind(&entity.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating top-up rule: {}", e);
            AppError::Database(format!("Failed to create top-up rule: {}", e))
        })?;

        row.try_into()
    }

    #[instrument(skip(self, entity), fields(id = entity.id))]
    async fn update(&self, entity: &TopUpRule) -> AppResult<TopUpRule> {
        debug!("Updating top-up rule: {}", entity.id);

        // Only scheduled rules are editable
        let row = sqlx::query_as::<Postgres, TopUpRuleRow>(&format!(
            r#"
            UPDATE top_up_rules
            SET name = $2,
                description = $3,
                amount = $4,
                min_age = $5,
                max_age = $6,
                residential_status = $7,
                schooling_status = $8,
                education_level = $9,
                scheduled_date = $10,
                updated_at = NOW()
            WHERE id = $1 AND status = 'scheduled'
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(entity.id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(entity.amount)
        .bind(age_param(entity.min_age))
        .bind(age_param(entity.max_age))
        .bind(entity.residential_status.map(|s| s.as_str()))
        .bind(entity.schooling_status.map(|s| s.as_str()))
        .bind(entity.education_level.map(|l| l.as_str()))
        .bind(entity.scheduled_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating top-up rule {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update top-up rule: {}", e))
        })?
        .ok_or_else(|| {
            AppError::Conflict(format!("Top-up rule {} is no longer scheduled", entity.id))
        })?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i32) -> AppResult<bool> {
        debug!("Deleting top-up rule: {}", id);

        let result = sqlx::query("DELETE FROM top_up_rules WHERE id = $1 AND status = 'scheduled'")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting top-up rule {}: {}", id, e);
                AppError::Database(format!("Failed to delete top-up rule: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TopUpRuleRepository for PgTopUpRuleRepository {
    #[instrument(skip(self))]
    async fn find_due(&self, today: NaiveDate) -> AppResult<Vec<TopUpRule>> {
        debug!("Finding top-up rules due on {}", today);

        let rows = sqlx::query_as::<Postgres, TopUpRuleRow>(&format!(
            r#"
            SELECT {} FROM top_up_rules
            WHERE status = 'scheduled' AND scheduled_date <= $1
            ORDER BY scheduled_date, id
            "#,
            RULE_COLUMNS
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding due top-up rules: {}", e);
            AppError::Database(format!("Failed to fetch due top-up rules: {}", e))
        })?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn list_filtered(
        &self,
        status: Option<TopUpRuleStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<TopUpRule>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM top_up_rules");
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM top_up_rules",
            RULE_COLUMNS
        ));
        if let Some(status) = status {
            count_qb.push(" WHERE status = ").push_bind(status.as_str());
            qb.push(" WHERE status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY scheduled_date DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting top-up rules: {}", e);
                AppError::Database(format!("Failed to count top-up rules: {}", e))
            })?;

        let rows = qb
            .build_query_as::<TopUpRuleRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing top-up rules: {}", e);
                AppError::Database(format!("Failed to fetch top-up rules: {}", e))
            })?;

        let rules = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((rules, total))
    }

    #[instrument(skip(self))]
    async fn set_status(
        &self,
        id: i32,
        from: TopUpRuleStatus,
        to: TopUpRuleStatus,
        executed_at: Option<DateTime<Utc>>,
    ) -> AppResult<Option<TopUpRule>> {
        if !from.can_transition_to(to) {
            return Err(AppError::transition("top_up_rule", from, to));
        }

        let row = sqlx::query_as::<Postgres, TopUpRuleRow>(&format!(
            r#"
            UPDATE top_up_rules
            SET status = $3,
                executed_at = COALESCE($4, executed_at),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(executed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating top-up rule {}: {}", id, e);
            AppError::Database(format!("Failed to update top-up rule: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn release(&self, id: i32) -> AppResult<Option<TopUpRule>> {
        let row = sqlx::query_as::<Postgres, TopUpRuleRow>(&format!(
            r#"
            UPDATE top_up_rules
            SET status = 'scheduled',
                executed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'executed'
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error releasing top-up rule {}: {}", id, e);
            AppError::Database(format!("Failed to release top-up rule: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct TopUpRuleRow {
    id: i32,
    name: String,
    description: Option<String>,
    amount: Decimal,
    min_age: Option<i32>,
    max_age: Option<i32>,
    residential_status: Option<String>,
    schooling_status: Option<String>,
    education_level: Option<String>,
    scheduled_date: NaiveDate,
    status: String,
    executed_at: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn age_column(column: &str, value: Option<i32>) -> AppResult<Option<u32>> {
    value
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| AppError::Database(format!("Unexpected {} value {}", column, v)))
        })
        .transpose()
}

impl TryFrom<TopUpRuleRow> for TopUpRule {
    type Error = AppError;

    fn try_from(row: TopUpRuleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            amount: row.amount,
            min_age: age_column("min_age", row.min_age)?,
            max_age: age_column("max_age", row.max_age)?,
            residential_status: parse_optional("residential_status", row.residential_status.as_deref())?,
            schooling_status: parse_optional("schooling_status", row.schooling_status.as_deref())?,
            education_level: parse_optional("education_level", row.education_level.as_deref())?,
            scheduled_date: row.scheduled_date,
            status: parse_column("status", &row.status)?,
            executed_at: row.executed_at,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
