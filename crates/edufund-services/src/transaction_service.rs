//! Transaction history service

use edufund_core::{
    models::Transaction,
    query::TransactionQuery,
    traits::{EducationAccountRepository, PaginatedResponse, TransactionRepository},
    AppError, AppResult,
};
use std::sync::Arc;

/// Ledger queries scoped to an account or holder
pub struct TransactionService {
    transactions: Arc<dyn TransactionRepository>,
    accounts: Arc<dyn EducationAccountRepository>,
}

impl TransactionService {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        accounts: Arc<dyn EducationAccountRepository>,
    ) -> Self {
        Self {
            transactions,
            accounts,
        }
    }

    pub async fn list(&self, query: &TransactionQuery) -> AppResult<PaginatedResponse<Transaction>> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(AppError::Validation(format!(
                    "from {} is after to {}",
                    from, to
                )));
            }
        }
        let (transactions, total) = self.transactions.list(query).await?;
        Ok(PaginatedResponse::new(transactions, total, query.pagination))
    }

    pub async fn get(&self, id: i64) -> AppResult<Transaction> {
        self.transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    /// History of the caller's own account; any account filter in `query` is replaced
    pub async fn list_for_holder(
        &self,
        holder_id: i32,
        mut query: TransactionQuery,
    ) -> AppResult<PaginatedResponse<Transaction>> {
        let account = self
            .accounts
            .find_by_holder(holder_id)
            .await?
            .ok_or_else(|| {
                AppError::EducationAccountNotFound(format!("for holder {}", holder_id))
            })?;
        query.account_id = Some(account.id);
        self.list(&query).await
    }
}
