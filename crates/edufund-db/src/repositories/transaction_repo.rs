//! Transaction repository implementation
//!
//! Provides PostgreSQL-backed storage for the transaction ledger. Top-up runs
//! credit balances and write their ledger rows in one database transaction.

use super::{parse_column, parse_optional, tx_error};
use edufund_core::{
    models::{Transaction, TransactionKind},
    query::TransactionQuery,
    traits::{TopUpEntry, TransactionRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

pub(crate) const TRANSACTION_COLUMNS: &str = "id, reference, account_id, kind, amount, \
     balance_after, status, payment_method, invoice_id, topup_rule_id, description, \
     performed_by, created_at";

/// PostgreSQL implementation of TransactionRepository
pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    /// Create a new transaction repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert a ledger row on an open connection or transaction
pub(crate) async fn insert_transaction(
    conn: &mut PgConnection,
    txn: &Transaction,
) -> AppResult<Transaction> {
    let row = sqlx::query_as::<Postgres, TransactionRow>(&format!(
        r#"
        INSERT INTO transactions (
            reference, account_id, kind, amount, balance_after, status,
            payment_method, invoice_id, topup_rule_id, description, performed_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {}
        "#,
        TRANSACTION_COLUMNS
    ))
    .bind(txn.reference)
    .bind(txn.account_id)
    .bind(txn.kind.as_str())
    .bind(txn.amount)
    .bind(txn.balance_after)
    .bind(txn.status.as_str())
    .bind(txn.payment_method.map(|m| m.as_str()))
    .bind(txn.invoice_id)
    .bind(txn.topup_rule_id)
    .bind(&txn.description)
    .bind(&txn.performed_by)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        error!("Database error recording transaction {}: {}", txn.reference, e);
        AppError::Database(format!("Failed to record transaction: {}", e))
    })?;

    row.try_into()
}

fn push_transaction_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &TransactionQuery) {
    if let Some(account_id) = query.account_id {
        qb.push(" AND account_id = ").push_bind(account_id);
    }

    if let Some(kind) = query.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }

    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }

    if let Some(from) = query.from {
        qb.push(" AND created_at >= ").push_bind(day_start(from));
    }

    if let Some(to) = query.to {
        qb.push(" AND created_at < ")
            .push_bind(day_start(to.succ_opt().unwrap_or(to)));
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Transaction>> {
        debug!("Finding transaction by id: {}", id);

        let row = sqlx::query_as::<Postgres, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding transaction {}: {}", id, e);
            AppError::Database(format!("Failed to find transaction: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, query))]
    async fn list(&self, query: &TransactionQuery) -> AppResult<(Vec<Transaction>, i64)> {
        debug!("Listing transactions: {:?}", query);

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM transactions WHERE 1=1");
        push_transaction_filters(&mut count_qb, query);

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM transactions WHERE 1=1",
            TRANSACTION_COLUMNS
        ));
        push_transaction_filters(&mut qb, query);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.pagination.limit())
            .push(" OFFSET ")
            .push_bind(query.pagination.offset());

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting transactions: {}", e);
                AppError::Database(format!("Failed to count transactions: {}", e))
            })?;

        let rows = qb
            .build_query_as::<TransactionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing transactions: {}", e);
                AppError::Database(format!("Failed to fetch transactions: {}", e))
            })?;

        let transactions = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((transactions, total))
    }

    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    async fn record_top_ups(&self, entries: &[TopUpEntry]) -> AppResult<Vec<Transaction>> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(|e| tx_error("begin", e))?;
        let mut recorded = Vec::with_capacity(entries.len());

        for entry in entries {
            let balance: Option<Decimal> = sqlx::query_scalar(
                r#"
                UPDATE education_accounts
                SET balance = balance + $2,
                    updated_at = NOW()
                WHERE id = $1 AND status = 'active'
                RETURNING balance
                "#,
            )
            .bind(entry.account_id)
            .bind(entry.amount)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error crediting account {}: {}", entry.account_id, e);
                AppError::Database(format!("Failed to credit account: {}", e))
            })?;

            let Some(balance) = balance else {
                debug!("Skipping account {}: not active", entry.account_id);
                continue;
            };

            let mut txn = Transaction::completed(
                entry.account_id,
                TransactionKind::TopUp,
                entry.amount,
                &entry.performed_by,
            );
            txn.balance_after = Some(balance);
            txn.topup_rule_id = entry.topup_rule_id;
            txn.description = entry.description.clone();

            recorded.push(insert_transaction(&mut *tx, &txn).await?);
        }

        tx.commit().await.map_err(|e| tx_error("commit", e))?;

        info!(
            requested = entries.len(),
            credited = recorded.len(),
            "Top-up credits recorded"
        );

        Ok(recorded)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TransactionRow {
    id: i64,
    reference: Uuid,
    account_id: i32,
    kind: String,
    amount: Decimal,
    balance_after: Option<Decimal>,
    status: String,
    payment_method: Option<String>,
    invoice_id: Option<i32>,
    topup_rule_id: Option<i32>,
    description: Option<String>,
    performed_by: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            reference: row.reference,
            account_id: row.account_id,
            kind: parse_column("kind", &row.kind)?,
            amount: row.amount,
            balance_after: row.balance_after,
            status: parse_column("status", &row.status)?,
            payment_method: parse_optional("payment_method", row.payment_method.as_deref())?,
            invoice_id: row.invoice_id,
            topup_rule_id: row.topup_rule_id,
            description: row.description,
            performed_by: row.performed_by,
            created_at: row.created_at,
        })
    }
}
