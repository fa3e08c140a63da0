//! Paged audit log queries.

use crate::error::ApiResult;
use crate::gateway::HttpGateway;
use crate::models::AuditLogPage;
use crate::models::AuditLogQuery;
use crate::resource::ResourceSlot;

/// Permission required to read audit logs.
pub const VIEW_AUDIT_LOGS: &str = "view_audit_logs";

#[derive(Debug)]
pub struct AuditApi {
    gateway: HttpGateway,
    page: ResourceSlot<AuditLogPage>,
}

impl AuditApi {
    pub fn new(gateway: HttpGateway) -> Self {
        Self {
            gateway,
            page: ResourceSlot::new(),
        }
    }

    /// The most recently requested page.
    pub fn page(&self) -> &ResourceSlot<AuditLogPage> {
        &self.page
    }

    pub async fn list(&self, query: &AuditLogQuery) -> ApiResult<AuditLogPage> {
        let pairs = query.to_pairs();
        self.page
            .run(self.gateway.get_with_query("/audit-logs", &pairs))
            .await
    }
}
