//! HTTP request handlers
//!
//! `admin` serves the Admin Portal, `eservice` the account-holder portal.
//! Both build their services per request through [`ServiceFactory`].

pub mod admin;
pub mod eservice;
pub mod health;

use crate::factory::ServiceFactory;
use actix_web::HttpRequest;
use edufund_core::models::AuditLogData;
use tracing::warn;

pub use admin::configure as configure_admin;
pub use eservice::configure as configure_eservice;
pub use health::configure as configure_health;

/// Write an audit entry; a failed write is logged and never fails the request
pub(crate) async fn record_audit(factory: &ServiceFactory, data: AuditLogData) {
    let action = data.action.clone();
    if let Err(e) = factory.audit_logs().create(data).await {
        warn!(action = %action, "Failed to write audit log: {}", e);
    }
}

/// Caller address as reported by the proxy chain or the socket
pub(crate) fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(str::to_string)
}
