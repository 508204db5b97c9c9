//! Audit Service
//!
//! Best-effort audit recording. Failures are logged and swallowed: an
//! unavailable audit collection must not take the login flow down with it.

use std::sync::Arc;
use tracing::error;

use crate::audit::entity::{AuditAction, AuditLog};
use crate::audit::repository::AuditLogRepository;

pub struct AuditService {
    repo: Arc<AuditLogRepository>,
}

impl AuditService {
    pub fn new(repo: Arc<AuditLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(&self, entry: AuditLog) {
        if let Err(e) = self.repo.insert(&entry).await {
            error!(error = %e, action = ?entry.action, entity = %entry.entity_type, "Failed to write audit log");
        }
    }

    pub async fn record_action(
        &self,
        entity_type: &str,
        entity_id: &str,
        action: AuditAction,
        actor: Option<&str>,
    ) {
        let mut entry = AuditLog::new(entity_type, action).with_entity_id(entity_id);
        if let Some(actor) = actor {
            entry = entry.with_actor(actor);
        }
        self.record(entry).await;
    }
}
