//! Admin Portal dashboard figures

use edufund_core::{
    models::BatchExecution,
    query::BatchExecutionQuery,
    traits::{
        AccountHolderRepository, AccountSummary, BatchExecutionRepository,
        EducationAccountRepository, InvoiceRepository, OutstandingSummary, Pagination,
    },
    AppResult,
};
use serde::Serialize;
use std::sync::Arc;

/// Number of batch runs shown on the dashboard
pub const RECENT_BATCH_LIMIT: i64 = 5;

/// Figures shown on the Admin Portal landing page
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub holder_count: i64,
    pub accounts: AccountSummary,
    pub outstanding: OutstandingSummary,
    pub recent_batches: Vec<BatchExecution>,
}

/// Aggregates the Admin Portal dashboard
pub struct DashboardService {
    holders: Arc<dyn AccountHolderRepository>,
    accounts: Arc<dyn EducationAccountRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    batches: Arc<dyn BatchExecutionRepository>,
}

impl DashboardService {
    pub fn new(
        holders: Arc<dyn AccountHolderRepository>,
        accounts: Arc<dyn EducationAccountRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        batches: Arc<dyn BatchExecutionRepository>,
    ) -> Self {
        Self {
            holders,
            accounts,
            invoices,
            batches,
        }
    }

    pub async fn summary(&self) -> AppResult<DashboardSummary> {
        let recent = BatchExecutionQuery {
            job_type: None,
            pagination: Pagination::new(1, RECENT_BATCH_LIMIT),
        };

        let (holder_count, accounts, outstanding, (recent_batches, _)) = tokio::try_join!(
            self.holders.count(),
            self.accounts.summary(),
            self.invoices.outstanding_summary(None),
            self.batches.list(&recent),
        )?;

        Ok(DashboardSummary {
            holder_count,
            accounts,
            outstanding,
            recent_batches,
        })
    }
}
