//! Invoice repository implementation
//!
//! Provides PostgreSQL-backed storage for invoices. Payment locks the invoice
//! and the paying account, debits the balance-funded part and writes the
//! ledger rows before marking the invoice paid.

use super::transaction_repo::insert_transaction;
use super::{parse_column, tx_error};
use edufund_core::{
    models::{Invoice, InvoiceStatus, PaymentMethod, Transaction, TransactionKind},
    query::InvoiceQuery,
    traits::{InvoiceRepository, OutstandingSummary, PaymentEntry},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info, instrument, warn};

pub(crate) const INVOICE_COLUMNS: &str = "id, invoice_number, holder_id, enrollment_id, \
     amount, due_date, status, paid_at, created_at";

/// PostgreSQL implementation of InvoiceRepository
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    /// Create a new invoice repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_invoice_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &InvoiceQuery) {
    if let Some(holder_id) = query.holder_id {
        qb.push(" AND holder_id = ").push_bind(holder_id);
    }

    if let Some(enrollment_id) = query.enrollment_id {
        qb.push(" AND enrollment_id = ").push_bind(enrollment_id);
    }

    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }

    if let Some(due_before) = query.due_before {
        qb.push(" AND due_date < ").push_bind(due_before);
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Invoice>> {
        debug!("Finding invoice by id: {}", id);

        let row = sqlx::query_as::<Postgres, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding invoice {}: {}", id, e);
            AppError::Database(format!("Failed to find invoice: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, query))]
    async fn list(&self, query: &InvoiceQuery) -> AppResult<(Vec<Invoice>, i64)> {
        debug!("Listing invoices: {:?}", query);

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM invoices WHERE 1=1");
        push_invoice_filters(&mut count_qb, query);

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM invoices WHERE 1=1",
            INVOICE_COLUMNS
        ));
        push_invoice_filters(&mut qb, query);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(query.pagination.limit())
            .push(" OFFSET ")
            .push_bind(query.pagination.offset());

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting invoices: {}", e);
                AppError::Database(format!("Failed to count invoices: {}", e))
            })?;

        let rows = qb
            .build_query_as::<InvoiceRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing invoices: {}", e);
                AppError::Database(format!("Failed to fetch invoices: {}", e))
            })?;

        let invoices = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((invoices, total))
    }

    #[instrument(skip(self))]
    async fn transition(
        &self,
        id: i32,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> AppResult<Option<Invoice>> {
        from.ensure_transition(to)?;
        debug!("Moving invoice {} from {} to {}", id, from, to);

        let row = sqlx::query_as::<Postgres, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
            SET status = $3,
                paid_at = CASE WHEN $3 = 'paid' THEN NOW() ELSE paid_at END
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating invoice {}: {}", id, e);
            AppError::Database(format!("Failed to update invoice: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, payment), fields(invoice_id = payment.invoice_id, account_id = payment.account_id))]
    async fn pay(&self, payment: &PaymentEntry) -> AppResult<(Invoice, Vec<Transaction>)> {
        let mut tx = self.pool.begin().await.map_err(|e| tx_error("begin", e))?;

        let invoice: Invoice = sqlx::query_as::<Postgres, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE id = $1 FOR UPDATE",
            INVOICE_COLUMNS
        ))
        .bind(payment.invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error locking invoice {}: {}", payment.invoice_id, e);
            AppError::Database(format!("Failed to load invoice: {}", e))
        })?
        .ok_or_else(|| AppError::InvoiceNotFound(payment.invoice_id.to_string()))?
        .try_into()?;

        invoice.status.ensure_transition(InvoiceStatus::Paid)?;
        payment.split.validate_for(invoice.amount)?;

        let (status, balance): (String, Decimal) = sqlx::query_as(
            "SELECT status, balance FROM education_accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(payment.account_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error locking account {}: {}", payment.account_id, e);
            AppError::Database(format!("Failed to load education account: {}", e))
        })?
        .ok_or_else(|| AppError::EducationAccountNotFound(payment.account_id.to_string()))?;

        if status != "active" {
            warn!("Payment attempted on closed account {}", payment.account_id);
            return Err(AppError::AccountClosed(format!(
                "Account {} is closed",
                payment.account_id
            )));
        }

        let mut transactions = Vec::with_capacity(2);

        if payment.split.balance_amount > Decimal::ZERO {
            if balance < payment.split.balance_amount {
                return Err(AppError::InsufficientBalance {
                    required: payment.split.balance_amount.to_string(),
                    available: balance.to_string(),
                });
            }

            let new_balance: Decimal = sqlx::query_scalar(
                r#"
                UPDATE education_accounts
                SET balance = balance - $2,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING balance
                "#,
            )
            .bind(payment.account_id)
            .bind(payment.split.balance_amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error debiting account {}: {}", payment.account_id, e);
                AppError::Database(format!("Failed to debit account: {}", e))
            })?;

            let mut txn = Transaction::completed(
                payment.account_id,
                TransactionKind::CoursePayment,
                payment.split.balance_amount,
                &payment.performed_by,
            );
            txn.balance_after = Some(new_balance);
            txn.payment_method = Some(PaymentMethod::AccountBalance);
            txn.invoice_id = Some(invoice.id);
            txn.description = Some(format!("Payment of {}", invoice.invoice_number));
            transactions.push(insert_transaction(&mut *tx, &txn).await?);
        }

        if payment.split.external_amount > Decimal::ZERO {
            let mut txn = Transaction::completed(
                payment.account_id,
                TransactionKind::ExternalPayment,
                payment.split.external_amount,
                &payment.performed_by,
            );
            txn.payment_method = payment.split.external_method;
            txn.invoice_id = Some(invoice.id);
            txn.description = Some(format!("Payment of {}", invoice.invoice_number));
            transactions.push(insert_transaction(&mut *tx, &txn).await?);
        }

        let paid: Invoice = sqlx::query_as::<Postgres, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
            SET status = 'paid', paid_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(invoice.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error marking invoice {} paid: {}", invoice.id, e);
            AppError::Database(format!("Failed to update invoice: {}", e))
        })?
        .try_into()?;

        tx.commit().await.map_err(|e| tx_error("commit", e))?;

        info!(
            invoice = %paid.invoice_number,
            balance_amount = %payment.split.balance_amount,
            external_amount = %payment.split.external_amount,
            "Invoice paid"
        );

        Ok((paid, transactions))
    }

    #[instrument(skip(self))]
    async fn outstanding_summary(&self, holder_id: Option<i32>) -> AppResult<OutstandingSummary> {
        let (count, amount): (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(amount), 0)
            FROM invoices
            WHERE status = 'outstanding'
              AND ($1::INTEGER IS NULL OR holder_id = $1)
            "#,
        )
        .bind(holder_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error summarising invoices: {}", e);
            AppError::Database(format!("Failed to summarise invoices: {}", e))
        })?;

        Ok(OutstandingSummary { count, amount })
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct InvoiceRow {
    pub id: i32,
    pub invoice_number: String,
    pub holder_id: i32,
    pub enrollment_id: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = AppError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            invoice_number: row.invoice_number,
            holder_id: row.holder_id,
            enrollment_id: row.enrollment_id,
            amount: row.amount,
            due_date: row.due_date,
            status: parse_column("status", &row.status)?,
            paid_at: row.paid_at,
            created_at: row.created_at,
        })
    }
}
