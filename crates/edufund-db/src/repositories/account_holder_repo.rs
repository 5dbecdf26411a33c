//! Account holder repository implementation
//!
//! Provides PostgreSQL-backed storage for account holders. The admin listing
//! composes its WHERE clause from the optional filters with bound parameters.

use super::education_account_repo::{AccountRow, ACCOUNT_COLUMNS};
use super::{is_unique_violation, like_pattern, parse_column, parse_optional, tx_error};
use edufund_core::{
    models::{born_after, born_on_or_before, AccountHolder, AccountHolderListItem, EducationAccount},
    query::{AccountHolderFilter, AccountHolderQuery, HolderSortField, SortDirection},
    traits::AccountHolderRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument};

const HOLDER_COLUMNS: &str = "id, nric, full_name, date_of_birth, email, phone, \
     residential_address, residential_status, schooling_status, education_level, \
     password_hash, created_at, updated_at";

const LISTING_SELECT: &str = r#"
    SELECT
        h.id, h.nric, h.full_name, h.date_of_birth, h.email, h.phone,
        h.residential_address, h.residential_status, h.schooling_status,
        h.education_level, h.password_hash, h.created_at, h.updated_at,
        a.id AS account_id, a.account_number,
        a.status AS account_status, a.balance
    FROM account_holders h
    LEFT JOIN education_accounts a ON a.holder_id = h.id
    WHERE 1=1"#;

const LISTING_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM account_holders h
    LEFT JOIN education_accounts a ON a.holder_id = h.id
    WHERE 1=1"#;

/// PostgreSQL implementation of AccountHolderRepository
pub struct PgAccountHolderRepository {
    pool: PgPool,
}

impl PgAccountHolderRepository {
    /// Create a new account holder repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append one `AND ...` clause per present filter
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AccountHolderFilter, today: NaiveDate) {
    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(term);
        qb.push(" AND (h.full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR h.nric ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR h.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.account_number ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(status) = filter.residential_status {
        qb.push(" AND h.residential_status = ").push_bind(status.as_str());
    }

    if let Some(status) = filter.schooling_status {
        qb.push(" AND h.schooling_status = ").push_bind(status.as_str());
    }

    if let Some(level) = filter.education_level {
        qb.push(" AND h.education_level = ").push_bind(level.as_str());
    }

    if let Some(status) = filter.account_status {
        qb.push(" AND a.status = ").push_bind(status.as_str());
    }

    // Age bounds become birth-date bounds relative to `today`
    if let Some(min_age) = filter.min_age {
        qb.push(" AND h.date_of_birth <= ")
            .push_bind(born_on_or_before(min_age, today));
    }

    if let Some(max_age) = filter.max_age {
        qb.push(" AND h.date_of_birth > ")
            .push_bind(born_after(max_age, today));
    }

    if let Some(min_balance) = filter.min_balance {
        qb.push(" AND a.balance >= ").push_bind(min_balance);
    }

    if let Some(max_balance) = filter.max_balance {
        qb.push(" AND a.balance <= ").push_bind(max_balance);
    }

    if let Some(from) = filter.created_from {
        qb.push(" AND h.created_at >= ").push_bind(start_of_day(from));
    }

    if let Some(to) = filter.created_to {
        // Inclusive of the whole end day
        qb.push(" AND h.created_at < ")
            .push_bind(start_of_day(to.succ_opt().unwrap_or(to)));
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// ORDER BY clause for the listing; ties are broken by id
fn order_clause(sort_by: HolderSortField, direction: SortDirection) -> String {
    // A later birth date means a younger holder
    let (column, direction) = match sort_by {
        HolderSortField::FullName => ("LOWER(h.full_name)", direction),
        HolderSortField::Nric => ("h.nric", direction),
        HolderSortField::Age => ("h.date_of_birth", direction.reversed()),
        HolderSortField::Balance => ("a.balance", direction),
        HolderSortField::CreatedAt => ("h.created_at", direction),
    };

    let nulls = match sort_by {
        HolderSortField::Balance => " NULLS LAST",
        _ => "",
    };

    format!(
        " ORDER BY {} {}{}, h.id ASC",
        column,
        direction.as_str().to_uppercase(),
        nulls
    )
}

/// Build the page query for a listing request
pub(crate) fn build_search_query(query: &AccountHolderQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(LISTING_SELECT);
    push_filters(&mut qb, &query.filter, query.today);
    qb.push(order_clause(query.sort_by, query.direction));
    qb.push(" LIMIT ")
        .push_bind(query.pagination.limit())
        .push(" OFFSET ")
        .push_bind(query.pagination.offset());
    qb
}

/// Build the total-count query for a listing request
pub(crate) fn build_count_query(query: &AccountHolderQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(LISTING_COUNT);
    push_filters(&mut qb, &query.filter, query.today);
    qb
}

#[async_trait]
impl AccountHolderRepository for PgAccountHolderRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<AccountHolder>> {
        debug!("Finding account holder by id: {}", id);

        let row = sqlx::query_as::<Postgres, HolderRow>(&format!(
            "SELECT {} FROM account_holders WHERE id = $1",
            HOLDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding account holder {}: {}", id, e);
            AppError::Database(format!("Failed to find account holder: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, nric))]
    async fn find_by_nric(&self, nric: &str) -> AppResult<Option<AccountHolder>> {
        let normalized = AccountHolder::normalize_nric(nric);
        debug!("Finding account holder by NRIC");

        let row = sqlx::query_as::<Postgres, HolderRow>(&format!(
            "SELECT {} FROM account_holders WHERE nric = $1",
            HOLDER_COLUMNS
        ))
        .bind(&normalized)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding account holder by NRIC: {}", e);
            AppError::Database(format!("Failed to find account holder: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, query), fields(page = query.pagination.page, sort = %query.sort_by))]
    async fn search(&self, query: &AccountHolderQuery) -> AppResult<(Vec<AccountHolderListItem>, i64)> {
        debug!("Searching account holders: {:?}", query.filter);

        let mut count_qb = build_count_query(query);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting account holders: {}", e);
                AppError::Database(format!("Failed to count account holders: {}", e))
            })?;

        let mut qb = build_search_query(query);
        let rows = qb
            .build_query_as::<HolderListRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error searching account holders: {}", e);
                AppError::Database(format!("Failed to search account holders: {}", e))
            })?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((items, total))
    }

    #[instrument(skip(self, holder), fields(nric = %holder.nric))]
    async fn create_with_account(
        &self,
        holder: &AccountHolder,
        account_prefix: &str,
    ) -> AppResult<(AccountHolder, EducationAccount)> {
        debug!("Creating account holder with education account");

        let mut tx = self.pool.begin().await.map_err(|e| tx_error("begin", e))?;

        let holder_row = sqlx::query_as::<Postgres, HolderRow>(&format!(
            r#"
            INSERT INTO account_holders (
                nric, full_name, date_of_birth, email, phone, residential_address,
                residential_status, schooling_status, education_level, password_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            HOLDER_COLUMNS
        ))
        .bind(AccountHolder::normalize_nric(&holder.nric))
        .bind(&holder.full_name)
        .bind(holder.date_of_birth)
        .bind(&holder.email)
        .bind(&holder.phone)
        .bind(&holder.residential_address)
        .bind(holder.residential_status.as_str())
        .bind(holder.schooling_status.as_str())
        .bind(holder.education_level.as_str())
        .bind(&holder.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating account holder: {}", e);
            if is_unique_violation(&e) {
                AppError::AlreadyExists(format!("Account holder {} already exists", holder.nric))
            } else {
                AppError::Database(format!("Failed to create account holder: {}", e))
            }
        })?;

        let account_id: i64 =
            sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('education_accounts', 'id'))")
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Database error allocating account id: {}", e);
                    AppError::Database(format!("Failed to allocate account id: {}", e))
                })?;
        let account_id = i32::try_from(account_id)
            .map_err(|_| AppError::Internal("Education account id out of range".to_string()))?;

        let account_row = sqlx::query_as::<Postgres, AccountRow>(&format!(
            r#"
            INSERT INTO education_accounts (id, account_number, holder_id, balance, status)
            VALUES ($1, $2, $3, 0, 'active')
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .bind(EducationAccount::format_number(account_prefix, account_id))
        .bind(holder_row.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error opening education account: {}", e);
            AppError::Database(format!("Failed to open education account: {}", e))
        })?;

        tx.commit().await.map_err(|e| tx_error("commit", e))?;

        Ok((holder_row.try_into()?, account_row.try_into()?))
    }

    #[instrument(skip(self, holder), fields(id = holder.id))]
    async fn update(&self, holder: &AccountHolder) -> AppResult<AccountHolder> {
        debug!("Updating account holder: {}", holder.id);

        let row = sqlx::query_as::<Postgres, HolderRow>(&format!(
            r#"
            UPDATE account_holders
            SET full_name = $2,
                date_of_birth = $3,
                email = $4,
                phone = $5,
                residential_address = $6,
                residential_status = $7,
                schooling_status = $8,
                education_level = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            HOLDER_COLUMNS
        ))
        .bind(holder.id)
        .bind(&holder.full_name)
        .bind(holder.date_of_birth)
        .bind(&holder.email)
        .bind(&holder.phone)
        .bind(&holder.residential_address)
        .bind(holder.residential_status.as_str())
        .bind(holder.schooling_status.as_str())
        .bind(holder.education_level.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating account holder {}: {}", holder.id, e);
            AppError::Database(format!("Failed to update account holder: {}", e))
        })?
        .ok_or_else(|| AppError::AccountHolderNotFound(holder.id.to_string()))?;

        row.try_into()
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, id: i32, password_hash: Option<&str>) -> AppResult<bool> {
        debug!("Updating e-service password for holder {}", id);

        let result = sqlx::query(
            "UPDATE account_holders SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating password for holder {}: {}", id, e);
            AppError::Database(format!("Failed to update password: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM account_holders")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting account holders: {}", e);
                AppError::Database(format!("Failed to count account holders: {}", e))
            })?;

        Ok(result.0)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HolderRow {
    pub id: i32,
    pub nric: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub residential_address: Option<String>,
    pub residential_status: String,
    pub schooling_status: String,
    pub education_level: String,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<HolderRow> for AccountHolder {
    type Error = AppError;

    fn try_from(row: HolderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            nric: row.nric,
            full_name: row.full_name,
            date_of_birth: row.date_of_birth,
            email: row.email,
            phone: row.phone,
            residential_address: row.residential_address,
            residential_status: parse_column("residential_status", &row.residential_status)?,
            schooling_status: parse_column("schooling_status", &row.schooling_status)?,
            education_level: parse_column("education_level", &row.education_level)?,
            password_hash: row.password_hash,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Listing row: holder plus the summary of their account
#[derive(Debug, sqlx::FromRow)]
struct HolderListRow {
    #[sqlx(flatten)]
    holder: HolderRow,
    account_id: Option<i32>,
    account_number: Option<String>,
    account_status: Option<String>,
    balance: Option<Decimal>,
}

impl TryFrom<HolderListRow> for AccountHolderListItem {
    type Error = AppError;

    fn try_from(row: HolderListRow) -> Result<Self, Self::Error> {
        Ok(Self {
            holder: row.holder.try_into()?,
            account_id: row.account_id,
            account_number: row.account_number,
            account_status: parse_optional("account_status", row.account_status.as_deref())?,
            balance: row.balance,
        })
    }
}
