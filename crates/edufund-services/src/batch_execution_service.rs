//! Batch execution history

use edufund_core::{
    models::BatchExecution,
    query::BatchExecutionQuery,
    traits::{BatchExecutionRepository, PaginatedResponse},
    AppError, AppResult,
};
use std::sync::Arc;

/// Read access to batch run history
pub struct BatchExecutionService {
    batches: Arc<dyn BatchExecutionRepository>,
}

impl BatchExecutionService {
    pub fn new(batches: Arc<dyn BatchExecutionRepository>) -> Self {
        Self { batches }
    }

    /// Newest runs first
    pub async fn list(
        &self,
        query: &BatchExecutionQuery,
    ) -> AppResult<PaginatedResponse<BatchExecution>> {
        let (runs, total) = self.batches.list(query).await?;
        Ok(PaginatedResponse::new(runs, total, query.pagination))
    }

    pub async fn get(&self, id: i64) -> AppResult<BatchExecution> {
        self.batches
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::BatchExecutionNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStore;
    use edufund_core::models::{BatchJobType, BatchOutcome, BatchStatus};
    use edufund_core::traits::Pagination;

    #[tokio::test]
    async fn test_list_filters_by_job_type() {
        let store = MemoryStore::new();
        let closure = store
            .start(BatchJobType::AccountClosure, None, "scheduler")
            .await
            .unwrap();
        store
            .finish(closure.id, &BatchOutcome::succeeded(10, 1))
            .await
            .unwrap();
        store
            .start(BatchJobType::TopUp, Some("3".to_string()), "admin")
            .await
            .unwrap();
        let svc = BatchExecutionService::new(store.clone());

        let query = BatchExecutionQuery {
            job_type: Some(BatchJobType::AccountClosure),
            pagination: Pagination::new(1, 10),
        };
        let page = svc.list(&query).await.unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.data[0].status, BatchStatus::Succeeded);

        let all = svc.list(&BatchExecutionQuery::default()).await.unwrap();
        assert_eq!(all.data[0].job_type, BatchJobType::TopUp);

        let run = svc.get(closure.id).await.unwrap();
        assert_eq!(run.affected_count, 1);
        assert!(matches!(
            svc.get(9999).await,
            Err(AppError::BatchExecutionNotFound(_))
        ));
    }
}
