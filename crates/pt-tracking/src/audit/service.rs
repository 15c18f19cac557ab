//! Audit Recorder
//!
//! Appends one trail entry per committed mutation. Recording happens
//! strictly after the business write; a failed audit write surfaces as a
//! distinct error condition but never rolls the mutation back.

use std::sync::Arc;
use tracing::{error, info};

use crate::audit::entity::{AuditAction, NewAuditEntry};
use crate::audit::repository::AuditLogRepository;
use crate::shared::authorization::AuthContext;
use crate::shared::error::{Result, TrackingError};
use crate::shared::middleware::RequestMeta;

/// Who performed a mutation, and from where.
#[derive(Debug, Clone, Default)]
pub struct AuditActor {
    pub user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditActor {
    pub fn new(context: &AuthContext, meta: &RequestMeta) -> Self {
        Self {
            user_id: Some(context.user_id),
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
        }
    }
}

/// Audit service recording every mutating operation.
#[derive(Clone)]
pub struct AuditRecorder {
    repo: Arc<AuditLogRepository>,
}

impl AuditRecorder {
    pub fn new(repo: Arc<AuditLogRepository>) -> Self {
        Self { repo }
    }

    /// Append one immutable entry.
    ///
    /// The caller's mutation is already durably committed; on a failed
    /// write this reports `AuditWrite` instead of swallowing the error.
    pub async fn record(
        &self,
        actor: &AuditActor,
        action: AuditAction,
        entity_type: &str,
        entity_id: i64,
        detail: serde_json::Value,
    ) -> Result<()> {
        let entry = NewAuditEntry {
            user_id: actor.user_id,
            action,
            entity_type: entity_type.to_string(),
            entity_id,
            detail,
            ip_address: actor.ip_address.clone(),
            user_agent: actor.user_agent.clone(),
        };

        info!(
            action = action.as_str(),
            entity_type = %entry.entity_type,
            entity_id,
            user_id = ?entry.user_id,
            "Audit entry recorded"
        );

        self.repo.insert(&entry).await.map_err(|e| {
            error!(error = %e, entity_type, entity_id, "Failed to write audit entry");
            TrackingError::audit_write(e.to_string())
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::repository::AuditFilter;
    use crate::shared::db::memory_pool;

    #[tokio::test]
    async fn test_record_appends_entry() {
        let pool = memory_pool().await.unwrap();
        let repo = Arc::new(AuditLogRepository::new(pool));
        let recorder = AuditRecorder::new(repo.clone());

        let actor = AuditActor {
            user_id: Some(3),
            ip_address: Some("192.0.2.1".to_string()),
            user_agent: Some("tests".to_string()),
        };

        recorder
            .record(
                &actor,
                AuditAction::DeleteRecord,
                "ErrorRecord",
                7,
                serde_json::json!({ "product": "Coxinha", "cost": 12.5 }),
            )
            .await
            .unwrap();

        let entries = repo.search(&AuditFilter::default(), 0, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::DeleteRecord);
        assert_eq!(entries[0].entity_id, 7);
        assert_eq!(entries[0].user_id, Some(3));
        assert_eq!(entries[0].detail["product"], "Coxinha");
    }
}
