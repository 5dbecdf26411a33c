//! Invoice service
//!
//! Invoice listing, cancellation and payment. Payment may be split between
//! the holder's education account balance and an external method.

use edufund_core::{
    models::{Invoice, InvoiceStatus, PaymentSplit, Transaction},
    query::InvoiceQuery,
    traits::{
        EducationAccountRepository, InvoiceRepository, OutstandingSummary, PaginatedResponse,
        PaymentEntry,
    },
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Invoice lookups and settlement
pub struct InvoiceService {
    invoices: Arc<dyn InvoiceRepository>,
    accounts: Arc<dyn EducationAccountRepository>,
}

impl InvoiceService {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        accounts: Arc<dyn EducationAccountRepository>,
    ) -> Self {
        Self { invoices, accounts }
    }

    pub async fn list(&self, query: &InvoiceQuery) -> AppResult<PaginatedResponse<Invoice>> {
        let (invoices, total) = self.invoices.list(query).await?;
        Ok(PaginatedResponse::new(invoices, total, query.pagination))
    }

    pub async fn get(&self, id: i32) -> AppResult<Invoice> {
        self.invoices
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::InvoiceNotFound(id.to_string()))
    }

    /// Fetch an invoice owned by `holder_id`; other holders' invoices are not found
    pub async fn get_for_holder(&self, holder_id: i32, id: i32) -> AppResult<Invoice> {
        match self.invoices.find_by_id(id).await? {
            Some(invoice) if invoice.holder_id == holder_id => Ok(invoice),
            _ => Err(AppError::InvoiceNotFound(id.to_string())),
        }
    }

    pub async fn outstanding_for_holder(&self, holder_id: i32) -> AppResult<OutstandingSummary> {
        self.invoices.outstanding_summary(Some(holder_id)).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, id: i32) -> AppResult<Invoice> {
        let invoice = self.get(id).await?;
        invoice.status.ensure_transition(InvoiceStatus::Cancelled)?;

        let cancelled = self
            .invoices
            .transition(id, invoice.status, InvoiceStatus::Cancelled)
            .await?
            .ok_or_else(|| AppError::transition("invoice", invoice.status, InvoiceStatus::Cancelled))?;

        info!(invoice = %cancelled.invoice_number, "Invoice cancelled");
        Ok(cancelled)
    }

    /// Pay a holder's own invoice
    #[instrument(skip(self, split))]
    pub async fn pay(
        &self,
        holder_id: i32,
        invoice_id: i32,
        split: PaymentSplit,
        performed_by: &str,
    ) -> AppResult<(Invoice, Vec<Transaction>)> {
        let invoice = self.get_for_holder(holder_id, invoice_id).await?;
        invoice.status.ensure_transition(InvoiceStatus::Paid)?;
        split.validate_for(invoice.amount)?;

        let account = self
            .accounts
            .find_by_holder(holder_id)
            .await?
            .ok_or_else(|| {
                AppError::EducationAccountNotFound(format!("for holder {}", holder_id))
            })?;
        if !account.can_transact() {
            return Err(AppError::AccountClosed(account.account_number));
        }

        self.invoices
            .pay(&PaymentEntry {
                invoice_id,
                account_id: account.id,
                split,
                performed_by: performed_by.to_string(),
            })
            .await
    }
}
