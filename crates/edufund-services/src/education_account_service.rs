//! Education account service
//!
//! Account lookups, manual closure and reopening, ad-hoc top-ups, and the
//! age-threshold auto-closure batch.

use chrono::{NaiveDate, Utc};
use edufund_core::{
    models::{
        check_money_scale, AccountStatus, BatchExecution, BatchJobType, BatchOutcome,
        ClosureReason, EducationAccount, Transaction,
    },
    traits::{
        BatchExecutionRepository, EducationAccountRepository, PaginatedResponse, Pagination,
        TopUpEntry, TransactionRepository,
    },
    AppError, AppResult,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Account lifecycle and balance credits
pub struct EducationAccountService {
    accounts: Arc<dyn EducationAccountRepository>,
    transactions: Arc<dyn TransactionRepository>,
    batches: Arc<dyn BatchExecutionRepository>,
    closure_age: u32,
}

impl EducationAccountService {
    pub fn new(
        accounts: Arc<dyn EducationAccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
        batches: Arc<dyn BatchExecutionRepository>,
        closure_age: u32,
    ) -> Self {
        Self {
            accounts,
            transactions,
            batches,
            closure_age,
        }
    }

    pub async fn get(&self, id: i32) -> AppResult<EducationAccount> {
        self.accounts
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::EducationAccountNotFound(id.to_string()))
    }

    pub async fn get_by_holder(&self, holder_id: i32) -> AppResult<EducationAccount> {
        self.accounts
            .find_by_holder(holder_id)
            .await?
            .ok_or_else(|| {
                AppError::EducationAccountNotFound(format!("for holder {}", holder_id))
            })
    }

    pub async fn list(
        &self,
        status: Option<AccountStatus>,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<EducationAccount>> {
        let (accounts, total) = self
            .accounts
            .list(status, pagination.limit(), pagination.offset())
            .await?;
        Ok(PaginatedResponse::new(accounts, total, pagination))
    }

    /// Close an active account by staff decision
    #[instrument(skip(self))]
    pub async fn close(&self, id: i32, performed_by: &str) -> AppResult<EducationAccount> {
        let account = self.get(id).await?;
        if !account.status.can_transition_to(AccountStatus::Closed) {
            return Err(AppError::transition(
                "education account",
                account.status,
                AccountStatus::Closed,
            ));
        }

        let closed = self
            .accounts
            .close(id, ClosureReason::Manual, Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::transition("education account", AccountStatus::Closed, AccountStatus::Closed)
            })?;

        info!(
            account_number = %closed.account_number,
            performed_by = %performed_by,
            "Education account closed"
        );
        Ok(closed)
    }

    #[instrument(skip(self))]
    pub async fn reopen(&self, id: i32) -> AppResult<EducationAccount> {
        let account = self.get(id).await?;
        if !account.status.can_transition_to(AccountStatus::Active) {
            return Err(AppError::transition(
                "education account",
                account.status,
                AccountStatus::Active,
            ));
        }

        let reopened = self.accounts.reopen(id).await?.ok_or_else(|| {
            AppError::transition("education account", AccountStatus::Active, AccountStatus::Active)
        })?;

        info!(account_number = %reopened.account_number, "Education account reopened");
        Ok(reopened)
    }

    /// Credit an active account outside of any top-up rule
    #[instrument(skip(self, description))]
    pub async fn top_up(
        &self,
        account_id: i32,
        amount: Decimal,
        description: Option<String>,
        performed_by: &str,
    ) -> AppResult<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "top-up amount must be positive".to_string(),
            ));
        }
        check_money_scale("amount", amount)?;

        let account = self.get(account_id).await?;
        if !account.can_transact() {
            warn!(account_number = %account.account_number, "Top-up refused on closed account");
            return Err(AppError::AccountClosed(account.account_number));
        }

        let entry = TopUpEntry {
            account_id,
            amount,
            topup_rule_id: None,
            description,
            performed_by: performed_by.to_string(),
        };

        // The repository skips accounts closed after the check above
        self.transactions
            .record_top_ups(std::slice::from_ref(&entry))
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::AccountClosed(account.account_number))
    }

    /// Close every active account whose holder has reached the closure age
    ///
    /// The run is recorded as a batch execution whether it succeeds or not.
    #[instrument(skip(self))]
    pub async fn auto_close(
        &self,
        today: NaiveDate,
        triggered_by: &str,
    ) -> AppResult<BatchExecution> {
        let run = self
            .batches
            .start(BatchJobType::AccountClosure, None, triggered_by)
            .await?;

        let outcome = match self.close_due(today).await {
            Ok((processed, affected)) => {
                info!(
                    processed,
                    affected,
                    closure_age = self.closure_age,
                    "Account auto-closure finished"
                );
                BatchOutcome::succeeded(processed, affected)
            }
            Err(e) => {
                error!("Account auto-closure failed: {}", e);
                BatchOutcome::failed(0, e.to_string())
            }
        };

        self.batches.finish(run.id, &outcome).await
    }

    async fn close_due(&self, today: NaiveDate) -> AppResult<(usize, usize)> {
        let active = self.accounts.list_active_with_holders().await?;
        let due: Vec<i32> = active
            .iter()
            .filter(|a| a.account.is_due_for_closure(&a.holder, today, self.closure_age))
            .map(|a| a.account.id)
            .collect();

        if due.is_empty() {
            return Ok((active.len(), 0));
        }

        let closed = self
            .accounts
            .close_many(&due, ClosureReason::AgeThreshold, Utc::now())
            .await?;

        Ok((active.len(), closed as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;
    use edufund_core::models::{BatchStatus, TransactionKind};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service(store: &Arc<MemoryStore>) -> EducationAccountService {
        EducationAccountService::new(store.clone(), store.clone(), store.clone(), 30)
    }

    #[tokio::test]
    async fn test_auto_close_uses_age_threshold() {
        let store = MemoryStore::new();
        let (_, turned_30) = store.seed_holder("S1000001A", "Turned Thirty", date(1994, 6, 1));
        let (_, almost_30) = store.seed_holder("S1000002B", "Almost Thirty", date(1994, 6, 2));
        let (_, young) = store.seed_holder("S1000003C", "Young", date(2010, 1, 1));
        let svc = service(&store);

        let run = svc.auto_close(date(2024, 6, 1), "scheduler").await.unwrap();

        assert_eq!(run.job_type, BatchJobType::AccountClosure);
        assert_eq!(run.status, BatchStatus::Succeeded);
        assert_eq!(run.processed_count, 3);
        assert_eq!(run.affected_count, 1);

        let closed = store.account(turned_30.id);
        assert_eq!(closed.status, AccountStatus::Closed);
        assert_eq!(closed.closure_reason, Some(ClosureReason::AgeThreshold));
        assert_eq!(store.account(almost_30.id).status, AccountStatus::Active);
        assert_eq!(store.account(young.id).status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn test_auto_close_with_nothing_due() {
        let store = MemoryStore::new();
        store.seed_holder("S1000004D", "Young", date(2012, 1, 1));
        let svc = service(&store);

        let run = svc.auto_close(date(2024, 6, 1), "admin").await.unwrap();
        assert_eq!(run.status, BatchStatus::Succeeded);
        assert_eq!(run.affected_count, 0);
        assert_eq!(run.triggered_by, "admin");
        assert!(run.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_auto_close_feb_29_birthday() {
        let store = MemoryStore::new();
        let (_, leapling) = store.seed_holder("S1000005E", "Leapling", date(1996, 2, 29));
        let svc = service(&store);

        // Not yet 30 on Feb 28 of a non-leap year
        svc.auto_close(date(2026, 2, 28), "scheduler").await.unwrap();
        assert_eq!(store.account(leapling.id).status, AccountStatus::Active);

        svc.auto_close(date(2026, 3, 1), "scheduler").await.unwrap();
        assert_eq!(store.account(leapling.id).status, AccountStatus::Closed);
    }

    #[tokio::test]
    async fn test_close_twice_is_a_transition_error() {
        let store = MemoryStore::new();
        let (_, account) = store.seed_holder("S1000006F", "Closer", date(2000, 1, 1));
        let svc = service(&store);

        let closed = svc.close(account.id, "admin").await.unwrap();
        assert_eq!(closed.closure_reason, Some(ClosureReason::Manual));

        let err = svc.close(account.id, "admin").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidStatusTransition { .. }));

        let reopened = svc.reopen(account.id).await.unwrap();
        assert_eq!(reopened.status, AccountStatus::Active);
        assert!(reopened.closure_reason.is_none());
    }

    #[tokio::test]
    async fn test_top_up_credits_active_account() {
        let store = MemoryStore::new();
        let (_, account) = store.seed_holder("S1000007G", "Saver", date(2005, 1, 1));
        store.set_balance(account.id, dec!(100.50));
        let svc = service(&store);

        let txn = svc
            .top_up(account.id, dec!(250), Some("Bursary".to_string()), "admin")
            .await
            .unwrap();

        assert_eq!(txn.kind, TransactionKind::TopUp);
        assert_eq!(txn.balance_after, Some(dec!(350.50)));
        assert_eq!(store.account(account.id).balance, dec!(350.50));
    }

    #[tokio::test]
    async fn test_top_up_refused_on_closed_account() {
        let store = MemoryStore::new();
        let (_, account) = store.seed_holder("S1000008H", "Closed", date(2005, 1, 1));
        let svc = service(&store);
        svc.close(account.id, "admin").await.unwrap();

        let err = svc
            .top_up(account.id, dec!(10), None, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccountClosed(_)));

        let err = svc
            .top_up(account.id, dec!(-5), None, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_top_up_rejects_fraction_of_cent() {
        let store = MemoryStore::new();
        let (_, account) = store.seed_holder("S1000009I", "Precise", date(2005, 1, 1));
        let svc = service(&store);

        let err = svc
            .top_up(account.id, dec!(0.001), None, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.account(account.id).balance, dec!(0));
        assert!(store.transactions().is_empty());
    }
}
