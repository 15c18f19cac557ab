//! Record Service
//!
//! The uniform list/get/create/update/remove contract shared by every
//! tracked record type. Each entity module contributes a `RecordStore`
//! implementation (its SQL) and a delete policy; the orchestration
//! (pagination, active-row checks, pre-deletion snapshots, audit
//! emission) is written once here.
//!
//! Updates and deletes are single conditional statements guarded on
//! `deleted_at IS NULL`, so a concurrent delete between check and write
//! cannot resurrect or mutate a dead row; zero affected rows reads as
//! `NotFound` either way.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::audit::entity::AuditAction;
use crate::audit::service::{AuditActor, AuditRecorder};
use crate::shared::api_common::{PageMeta, PaginationParams};
use crate::shared::error::{Result, TrackingError};

/// Whether removal marks the row (`deleted_at`) or physically deletes it.
///
/// The asymmetry across entity types is intentional retention policy, kept
/// explicit here instead of being unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    Soft,
    Hard,
}

/// Per-entity persistence primitives consumed by [`RecordService`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Record: Serialize + Send + Sync;
    type Create: Serialize + Send + Sync;
    type Update: Serialize + Send + Sync;

    const ENTITY_TYPE: &'static str;
    const DELETE_POLICY: DeletePolicy;

    fn id_of(record: &Self::Record) -> i64;

    /// The fixed subset of identifying fields captured before deletion
    /// for the audit trail.
    fn snapshot(record: &Self::Record) -> serde_json::Value;

    /// One page of active records plus the total active count, both
    /// against the same filter.
    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<Self::Record>, u64)>;

    /// Fetch one active record. Soft-deleted rows are indistinguishable
    /// from absent rows.
    async fn fetch_active(&self, id: i64) -> Result<Option<Self::Record>>;

    async fn insert(&self, input: &Self::Create) -> Result<Self::Record>;

    /// Apply a partial update to a still-active row; `None` when no
    /// active row matched.
    async fn apply_update(&self, id: i64, patch: &Self::Update) -> Result<Option<Self::Record>>;

    /// Set `deleted_at` on a still-active row (soft-delete entities).
    async fn mark_deleted(&self, id: i64) -> Result<bool>;

    /// Physically delete the row (hard-delete entities).
    async fn delete_row(&self, id: i64) -> Result<bool>;
}

/// Generic record service, one instance per entity type.
pub struct RecordService<S: RecordStore> {
    store: Arc<S>,
    audit: AuditRecorder,
}

impl<S: RecordStore> RecordService<S> {
    pub fn new(store: Arc<S>, audit: AuditRecorder) -> Self {
        Self { store, audit }
    }

    pub async fn list(&self, pagination: &PaginationParams) -> Result<(Vec<S::Record>, PageMeta)> {
        let (records, total) = self
            .store
            .fetch_page(pagination.skip(), pagination.limit())
            .await?;
        let meta = PageMeta::new(pagination.page(), pagination.limit(), total);
        Ok((records, meta))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<S::Record> {
        self.store
            .fetch_active(id)
            .await?
            .ok_or_else(|| TrackingError::not_found(S::ENTITY_TYPE, id.to_string()))
    }

    /// Persist a validated record and audit it with the full input payload.
    pub async fn create(&self, actor: &AuditActor, input: S::Create) -> Result<S::Record> {
        let detail = serde_json::to_value(&input)?;
        let record = self.store.insert(&input).await?;

        self.audit
            .record(
                actor,
                AuditAction::CreateRecord,
                S::ENTITY_TYPE,
                S::id_of(&record),
                detail,
            )
            .await?;

        Ok(record)
    }

    /// Apply a partial update and audit the supplied fields.
    pub async fn update(&self, actor: &AuditActor, id: i64, patch: S::Update) -> Result<S::Record> {
        let detail = serde_json::to_value(&patch)?;
        if detail.as_object().map(|m| m.is_empty()).unwrap_or(true) {
            return Err(TrackingError::validation("No fields to update"));
        }

        let record = self
            .store
            .apply_update(id, &patch)
            .await?
            .ok_or_else(|| TrackingError::not_found(S::ENTITY_TYPE, id.to_string()))?;

        self.audit
            .record(actor, AuditAction::UpdateRecord, S::ENTITY_TYPE, id, detail)
            .await?;

        Ok(record)
    }

    /// Remove a record according to the entity's delete policy, auditing
    /// the pre-deletion snapshot rather than the full record.
    pub async fn remove(&self, actor: &AuditActor, id: i64) -> Result<()> {
        let record = self.get_by_id(id).await?;
        let snapshot = S::snapshot(&record);

        let removed = match S::DELETE_POLICY {
            DeletePolicy::Soft => self.store.mark_deleted(id).await?,
            DeletePolicy::Hard => self.store.delete_row(id).await?,
        };
        if !removed {
            // Lost the race against a concurrent delete
            return Err(TrackingError::not_found(S::ENTITY_TYPE, id.to_string()));
        }

        self.audit
            .record(actor, AuditAction::DeleteRecord, S::ENTITY_TYPE, id, snapshot)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::repository::AuditLogRepository;
    use crate::shared::db::memory_pool;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Serialize)]
    struct Widget {
        id: i64,
        name: String,
        deleted: bool,
    }

    #[derive(Debug, Serialize)]
    struct NewWidget {
        name: String,
    }

    #[derive(Debug, Serialize)]
    struct WidgetPatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    }

    #[derive(Default)]
    struct WidgetStore {
        rows: Mutex<Vec<Widget>>,
    }

    #[async_trait]
    impl RecordStore for WidgetStore {
        type Record = Widget;
        type Create = NewWidget;
        type Update = WidgetPatch;

        const ENTITY_TYPE: &'static str = "Widget";
        const DELETE_POLICY: DeletePolicy = DeletePolicy::Soft;

        fn id_of(record: &Widget) -> i64 {
            record.id
        }

        fn snapshot(record: &Widget) -> serde_json::Value {
            serde_json::json!({ "name": record.name })
        }

        async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<Widget>, u64)> {
            let rows = self.rows.lock().unwrap();
            let active: Vec<Widget> = rows.iter().filter(|w| !w.deleted).cloned().collect();
            let total = active.len() as u64;
            let page = active
                .into_iter()
                .skip(skip as usize)
                .take(take as usize)
                .collect();
            Ok((page, total))
        }

        async fn fetch_active(&self, id: i64) -> Result<Option<Widget>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|w| w.id == id && !w.deleted).cloned())
        }

        async fn insert(&self, input: &NewWidget) -> Result<Widget> {
            let mut rows = self.rows.lock().unwrap();
            let widget = Widget {
                id: rows.len() as i64 + 1,
                name: input.name.clone(),
                deleted: false,
            };
            rows.push(widget.clone());
            Ok(widget)
        }

        async fn apply_update(&self, id: i64, patch: &WidgetPatch) -> Result<Option<Widget>> {
            let mut rows = self.rows.lock().unwrap();
            let Some(widget) = rows.iter_mut().find(|w| w.id == id && !w.deleted) else {
                return Ok(None);
            };
            if let Some(ref name) = patch.name {
                widget.name = name.clone();
            }
            Ok(Some(widget.clone()))
        }

        async fn mark_deleted(&self, id: i64) -> Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            let Some(widget) = rows.iter_mut().find(|w| w.id == id && !w.deleted) else {
                return Ok(false);
            };
            widget.deleted = true;
            Ok(true)
        }

        async fn delete_row(&self, id: i64) -> Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|w| w.id != id);
            Ok(rows.len() < before)
        }
    }

    async fn service() -> (RecordService<WidgetStore>, Arc<AuditLogRepository>) {
        let pool = memory_pool().await.unwrap();
        let audit_repo = Arc::new(AuditLogRepository::new(pool));
        let service = RecordService::new(
            Arc::new(WidgetStore::default()),
            AuditRecorder::new(audit_repo.clone()),
        );
        (service, audit_repo)
    }

    fn actor() -> AuditActor {
        AuditActor {
            user_id: Some(1),
            ip_address: None,
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (service, _) = service().await;
        let created = service
            .create(&actor(), NewWidget { name: "w1".into() })
            .await
            .unwrap();

        let fetched = service.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched.name, "w1");

        // Idempotent read
        let again = service.get_by_id(created.id).await.unwrap();
        assert_eq!(again.name, fetched.name);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (service, _) = service().await;
        let err = service.get_by_id(99).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_empty_patch_rejected() {
        let (service, audit_repo) = service().await;
        let created = service
            .create(&actor(), NewWidget { name: "w1".into() })
            .await
            .unwrap();

        let err = service
            .update(&actor(), created.id, WidgetPatch { name: None })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        // Only the create was audited
        let count = audit_repo
            .count(&crate::audit::repository::AuditFilter::default())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_remove_then_everything_is_not_found() {
        let (service, audit_repo) = service().await;
        let created = service
            .create(&actor(), NewWidget { name: "w1".into() })
            .await
            .unwrap();

        service.remove(&actor(), created.id).await.unwrap();

        assert_eq!(service.get_by_id(created.id).await.unwrap_err().code(), "NOT_FOUND");
        let err = service.remove(&actor(), created.id).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        let err = service
            .update(&actor(), created.id, WidgetPatch { name: Some("x".into()) })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        // Delete audit entry carries the snapshot, not the whole record
        let entries = audit_repo
            .search(&crate::audit::repository::AuditFilter::default(), 0, 10)
            .await
            .unwrap();
        let delete_entry = entries
            .iter()
            .find(|e| e.action == AuditAction::DeleteRecord)
            .unwrap();
        assert_eq!(delete_entry.detail, serde_json::json!({ "name": "w1" }));
    }

    #[tokio::test]
    async fn test_list_excludes_removed() {
        let (service, _) = service().await;
        let w1 = service.create(&actor(), NewWidget { name: "w1".into() }).await.unwrap();
        service.create(&actor(), NewWidget { name: "w2".into() }).await.unwrap();
        service.remove(&actor(), w1.id).await.unwrap();

        let (records, meta) = service.list(&PaginationParams::default()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "w2");
        assert_eq!(meta.total, 1);
    }
}
