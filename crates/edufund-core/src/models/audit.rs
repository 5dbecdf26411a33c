//! Audit trail
//!
//! Staff actions in the Admin Portal and sign-ins on both portals are
//! recorded for compliance review.

use super::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

text_enum! {
    /// Kind of record an audit entry refers to
    pub enum AuditEntity {
        AccountHolder => "account_holder",
        EducationAccount => "education_account",
        Course => "course",
        Enrollment => "enrollment",
        Invoice => "invoice",
        TopUpRule => "top_up_rule",
        BatchExecution => "batch_execution",
        User => "user",
        Session => "session",
    }
}

/// Stored audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    /// Staff username or holder NRIC
    pub actor: String,
    pub action: String,
    pub entity_type: AuditEntity,
    pub entity_id: Option<String>,
    pub details: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// Start describing a new audit entry
    pub fn builder(actor: impl Into<String>, action: &str, entity_type: AuditEntity) -> AuditLogBuilder {
        AuditLogBuilder {
            data: AuditLogData {
                actor: actor.into(),
                action: action.to_string(),
                entity_type,
                entity_id: None,
                details: None,
                ip_address: None,
            },
        }
    }
}

/// Builder for [`AuditLogData`]
#[derive(Debug)]
pub struct AuditLogBuilder {
    data: AuditLogData,
}

impl AuditLogBuilder {
    pub fn entity_id(mut self, id: impl ToString) -> Self {
        self.data.entity_id = Some(id.to_string());
        self
    }

    pub fn details(mut self, details: JsonValue) -> Self {
        self.data.details = Some(details);
        self
    }

    pub fn ip_address(mut self, ip: Option<String>) -> Self {
        self.data.ip_address = ip;
        self
    }

    pub fn build(self) -> AuditLogData {
        self.data
    }
}

/// Audit entry ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogData {
    pub actor: String,
    pub action: String,
    pub entity_type: AuditEntity,
    pub entity_id: Option<String>,
    pub details: Option<JsonValue>,
    pub ip_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let data = AuditLog::builder("admin", "close_account", AuditEntity::EducationAccount)
            .entity_id(42)
            .details(json!({ "reason": "manual" }))
            .ip_address(Some("10.0.0.1".to_string()))
            .build();

        assert_eq!(data.actor, "admin");
        assert_eq!(data.entity_type, AuditEntity::EducationAccount);
        assert_eq!(data.entity_id.as_deref(), Some("42"));
        assert_eq!(data.details.unwrap()["reason"], "manual");
    }

    #[test]
    fn test_entity_names() {
        assert_eq!(AuditEntity::TopUpRule.as_str(), "top_up_rule");
        assert_eq!(
            "account_holder".parse::<AuditEntity>().unwrap(),
            AuditEntity::AccountHolder
        );
    }
}
