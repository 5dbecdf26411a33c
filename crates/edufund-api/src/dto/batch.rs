//! Batch execution DTOs

use super::common::{parse_param, PaginationParams};
use edufund_core::query::BatchExecutionQuery;
use edufund_core::AppResult;
use serde::Deserialize;

/// Query parameters of the batch run history
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchListParams {
    /// `account_closure` or `top_up`
    pub job_type: Option<String>,
}

impl BatchListParams {
    /// Typed listing query
    pub fn to_query(&self, pagination: &PaginationParams) -> AppResult<BatchExecutionQuery> {
        Ok(BatchExecutionQuery {
            job_type: parse_param("job_type", self.job_type.as_deref())?,
            pagination: pagination.pagination(),
        })
    }
}
