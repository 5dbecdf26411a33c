//! Audit log DTOs

use super::common::parse_param;
use chrono::{DateTime, Utc};
use edufund_core::AppResult;
use edufund_db::AuditLogFilter;
use serde::Deserialize;

/// Query parameters for filtering audit logs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogQueryParams {
    /// Staff username or holder NRIC
    pub actor: Option<String>,

    /// Action name, e.g. `close_account`
    pub action: Option<String>,

    /// Entity type, e.g. `education_account`
    pub entity_type: Option<String>,

    /// Id of the affected entity
    pub entity_id: Option<String>,

    /// Start date filter (RFC 3339)
    pub start_date: Option<String>,

    /// End date filter (RFC 3339)
    pub end_date: Option<String>,
}

impl AuditLogQueryParams {
    /// Typed filter; bad dates are a 400
    pub fn to_filter(&self) -> AppResult<AuditLogFilter> {
        let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        Ok(AuditLogFilter {
            actor: non_blank(&self.actor),
            action: non_blank(&self.action),
            entity_type: parse_param("entity_type", self.entity_type.as_deref())?,
            entity_id: non_blank(&self.entity_id),
            start_date: parse_param::<DateTime<Utc>>("start_date", self.start_date.as_deref())?,
            end_date: parse_param::<DateTime<Utc>>("end_date", self.end_date.as_deref())?,
        })
    }
}
