//! Batch execution repository implementation
//!
//! Keeps the history of batch runs, written at start and finish of each run.

use super::parse_column;
use edufund_core::{
    models::{BatchExecution, BatchJobType, BatchOutcome},
    query::BatchExecutionQuery,
    traits::BatchExecutionRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, instrument};

const BATCH_COLUMNS: &str = "id, job_type, reference, triggered_by, status, processed_count, \
     affected_count, error_message, started_at, finished_at";

/// PostgreSQL implementation of BatchExecutionRepository
pub struct PgBatchExecutionRepository {
    pool: PgPool,
}

impl PgBatchExecutionRepository {
    /// Create a new batch execution repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchExecutionRepository for PgBatchExecutionRepository {
    #[instrument(skip(self))]
    async fn start(
        &self,
        job_type: BatchJobType,
        reference: Option<String>,
        triggered_by: &str,
    ) -> AppResult<BatchExecution> {
        debug!("Starting {} batch run", job_type);

        let row = sqlx::query_as::<Postgres, BatchExecutionRow>(&format!(
            r#"
            INSERT INTO batch_executions (job_type, reference, triggered_by, status)
            VALUES ($1, $2, $3, 'running')
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(job_type.as_str())
        .bind(reference)
        .bind(triggered_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error recording batch start: {}", e);
            AppError::Database(format!("Failed to record batch execution: {}", e))
        })?;

        row.try_into()
    }

    #[instrument(skip(self, outcome), fields(status = %outcome.status))]
    async fn finish(&self, id: i64, outcome: &BatchOutcome) -> AppResult<BatchExecution> {
        let row = sqlx::query_as::<Postgres, BatchExecutionRow>(&format!(
            r#"
            UPDATE batch_executions
            SET status = $2,
                processed_count = $3,
                affected_count = $4,
                error_message = $5,
                finished_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BATCH_COLUMNS
        ))
        .bind(id)
        .bind(outcome.status.as_str())
        .bind(outcome.processed_count)
        .bind(outcome.affected_count)
        .bind(&outcome.error_message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error recording batch finish {}: {}", id, e);
            AppError::Database(format!("Failed to update batch execution: {}", e))
        })?
        .ok_or_else(|| AppError::BatchExecutionNotFound(id.to_string()))?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> AppResult<Option<BatchExecution>> {
        let row = sqlx::query_as::<Postgres, BatchExecutionRow>(&format!(
            "SELECT {} FROM batch_executions WHERE id = $1",
            BATCH_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding batch execution {}: {}", id, e);
            AppError::Database(format!("Failed to find batch execution: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, query))]
    async fn list(&self, query: &BatchExecutionQuery) -> AppResult<(Vec<BatchExecution>, i64)> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM batch_executions");
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM batch_executions",
            BATCH_COLUMNS
        ));
        if let Some(job_type) = query.job_type {
            count_qb.push(" WHERE job_type = ").push_bind(job_type.as_str());
            qb.push(" WHERE job_type = ").push_bind(job_type.as_str());
        }
        qb.push(" ORDER BY started_at DESC, id DESC LIMIT ")
            .push_bind(query.pagination.limit())
            .push(" OFFSET ")
            .push_bind(query.pagination.offset());

        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting batch executions: {}", e);
                AppError::Database(format!("Failed to count batch executions: {}", e))
            })?;

        let rows = qb
            .build_query_as::<BatchExecutionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing batch executions: {}", e);
                AppError::Database(format!("Failed to fetch batch executions: {}", e))
            })?;

        let runs = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((runs, total))
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct BatchExecutionRow {
    id: i64,
    job_type: String,
    reference: Option<String>,
    triggered_by: String,
    status: String,
    processed_count: i64,
    affected_count: i64,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<BatchExecutionRow> for BatchExecution {
    type Error = AppError;

    fn try_from(row: BatchExecutionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            job_type: parse_column("job_type", &row.job_type)?,
            reference: row.reference,
            triggered_by: row.triggered_by,
            status: parse_column("status", &row.status)?,
            processed_count: row.processed_count,
            affected_count: row.affected_count,
            error_message: row.error_message,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}
