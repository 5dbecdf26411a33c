//! Batch execution model
//!
//! One row per run of a batch job, whether started by the scheduler or by a
//! staff member from the Admin Portal.

use super::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Kind of batch job
    pub enum BatchJobType {
        AccountClosure => "account_closure",
        TopUp => "top_up",
    }
}

text_enum! {
    /// Run state
    pub enum BatchStatus {
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

/// Batch execution entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExecution {
    pub id: i64,
    pub job_type: BatchJobType,
    /// Job-specific reference, e.g. the top-up rule id
    pub reference: Option<String>,
    /// `scheduler` or the staff username
    pub triggered_by: String,
    pub status: BatchStatus,
    /// Records inspected
    pub processed_count: i64,
    /// Records changed
    pub affected_count: i64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchExecution {
    /// Wall-clock duration, once finished
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

/// Result written back when a run finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub status: BatchStatus,
    pub processed_count: i64,
    pub affected_count: i64,
    pub error_message: Option<String>,
}

impl BatchOutcome {
    pub fn succeeded(processed: usize, affected: usize) -> Self {
        Self {
            status: BatchStatus::Succeeded,
            processed_count: processed as i64,
            affected_count: affected as i64,
            error_message: None,
        }
    }

    pub fn failed(processed: usize, message: impl Into<String>) -> Self {
        Self {
            status: BatchStatus::Failed,
            processed_count: processed as i64,
            affected_count: 0,
            error_message: Some(message.into()),
        }
    }
}
