//! Education account repository implementation
//!
//! Provides PostgreSQL-backed storage for education accounts, including the
//! guarded status updates used by manual and age-based closure.

use super::account_holder_repo::HolderRow;
use super::{parse_column, parse_optional};
use edufund_core::{
    models::{AccountStatus, AccountWithHolder, ClosureReason, EducationAccount},
    traits::{AccountSummary, EducationAccountRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument};

pub(crate) const ACCOUNT_COLUMNS: &str = "id, account_number, holder_id, balance, status, \
     closure_reason, opened_at, closed_at, updated_at";

/// PostgreSQL implementation of EducationAccountRepository
pub struct PgEducationAccountRepository {
    pool: PgPool,
}

impl PgEducationAccountRepository {
    /// Create a new education account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_where<V>(&self, column: &'static str, value: V) -> AppResult<Option<EducationAccount>>
    where
        V: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send,
    {
        let sql = format!(
            "SELECT {} FROM education_accounts WHERE {} = $1",
            ACCOUNT_COLUMNS, column
        );

        let row = sqlx::query_as::<Postgres, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding account by {}: {}", column, e);
                AppError::Database(format!("Failed to find education account: {}", e))
            })?;

        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl EducationAccountRepository for PgEducationAccountRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<EducationAccount>> {
        debug!("Finding education account by id: {}", id);
        self.find_where("id", id).await
    }

    #[instrument(skip(self))]
    async fn find_by_holder(&self, holder_id: i32) -> AppResult<Option<EducationAccount>> {
        debug!("Finding education account of holder {}", holder_id);
        self.find_where("holder_id", holder_id).await
    }

    #[instrument(skip(self))]
    async fn find_by_number(&self, account_number: &str) -> AppResult<Option<EducationAccount>> {
        debug!("Finding education account by number: {}", account_number);
        self.find_where("account_number", account_number.trim().to_uppercase())
            .await
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        status: Option<AccountStatus>,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<EducationAccount>, i64)> {
        debug!(
            "Listing education accounts: status={:?}, limit={}, offset={}",
            status, limit, offset
        );

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM education_accounts");
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM education_accounts",
            ACCOUNT_COLUMNS
        ));
        if let Some(status) = status {
            count_qb.push(" WHERE status = ").push_bind(status.as_str());
            qb.push(" WHERE status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting education accounts: {}", e);
                AppError::Database(format!("Failed to count education accounts: {}", e))
            })?;

        let rows = qb
            .build_query_as::<AccountRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing education accounts: {}", e);
                AppError::Database(format!("Failed to fetch education accounts: {}", e))
            })?;

        let accounts = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((accounts, total))
    }

    #[instrument(skip(self))]
    async fn list_active_with_holders(&self) -> AppResult<Vec<AccountWithHolder>> {
        debug!("Scanning active accounts");

        let rows = sqlx::query_as::<Postgres, ActiveAccountRow>(
            r#"
            SELECT
                h.id, h.nric, h.full_name, h.date_of_birth, h.email, h.phone,
                h.residential_address, h.residential_status, h.schooling_status,
                h.education_level, h.password_hash, h.created_at, h.updated_at,
                a.id AS account_id, a.account_number, a.balance,
                a.status AS account_status, a.closure_reason, a.opened_at,
                a.closed_at, a.updated_at AS account_updated_at
            FROM education_accounts a
            JOIN account_holders h ON h.id = a.holder_id
            WHERE a.status = 'active'
            ORDER BY a.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error scanning active accounts: {}", e);
            AppError::Database(format!("Failed to fetch active accounts: {}", e))
        })?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn close(
        &self,
        id: i32,
        reason: ClosureReason,
        at: DateTime<Utc>,
    ) -> AppResult<Option<EducationAccount>> {
        debug!("Closing education account {} ({})", id, reason);

        let row = sqlx::query_as::<Postgres, AccountRow>(&format!(
            r#"
            UPDATE education_accounts
            SET status = 'closed',
                closure_reason = $2,
                closed_at = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .bind(reason.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error closing account {}: {}", id, e);
            AppError::Database(format!("Failed to close education account: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn close_many(&self, ids: &[i32], reason: ClosureReason, at: DateTime<Utc>) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE education_accounts
            SET status = 'closed',
                closure_reason = $2,
                closed_at = $3,
                updated_at = NOW()
            WHERE id = ANY($1) AND status = 'active'
            "#,
        )
        .bind(ids)
        .bind(reason.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error closing {} accounts: {}", ids.len(), e);
            AppError::Database(format!("Failed to close education accounts: {}", e))
        })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn reopen(&self, id: i32) -> AppResult<Option<EducationAccount>> {
        debug!("Reopening education account {}", id);

        let row = sqlx::query_as::<Postgres, AccountRow>(&format!(
            r#"
            UPDATE education_accounts
            SET status = 'active',
                closure_reason = NULL,
                closed_at = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'closed'
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error reopening account {}: {}", id, e);
            AppError::Database(format!("Failed to reopen education account: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn summary(&self) -> AppResult<AccountSummary> {
        let (active, closed, total_balance): (i64, i64, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'active'),
                COUNT(*) FILTER (WHERE status = 'closed'),
                COALESCE(SUM(balance) FILTER (WHERE status = 'active'), 0)
            FROM education_accounts
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error summarising accounts: {}", e);
            AppError::Database(format!("Failed to summarise accounts: {}", e))
        })?;

        Ok(AccountSummary {
            active,
            closed,
            total_balance,
        })
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AccountRow {
    pub id: i32,
    pub account_number: String,
    pub holder_id: i32,
    pub balance: Decimal,
    pub status: String,
    pub closure_reason: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for EducationAccount {
    type Error = AppError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            account_number: row.account_number,
            holder_id: row.holder_id,
            balance: row.balance,
            status: parse_column("status", &row.status)?,
            closure_reason: parse_optional("closure_reason", row.closure_reason.as_deref())?,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            updated_at: row.updated_at,
        })
    }
}

/// Account joined with its holder
#[derive(Debug, sqlx::FromRow)]
struct ActiveAccountRow {
    #[sqlx(flatten)]
    holder: HolderRow,
    account_id: i32,
    account_number: String,
    balance: Decimal,
    account_status: String,
    closure_reason: Option<String>,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    account_updated_at: DateTime<Utc>,
}

impl TryFrom<ActiveAccountRow> for AccountWithHolder {
    type Error = AppError;

    fn try_from(row: ActiveAccountRow) -> Result<Self, Self::Error> {
        let account = EducationAccount::try_from(AccountRow {
            id: row.account_id,
            account_number: row.account_number,
            holder_id: row.holder.id,
            balance: row.balance,
            status: row.account_status,
            closure_reason: row.closure_reason,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            updated_at: row.account_updated_at,
        })?;

        Ok(Self {
            account,
            holder: row.holder.try_into()?,
        })
    }
}
