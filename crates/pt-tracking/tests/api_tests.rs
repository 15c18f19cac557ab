//! Record Lifecycle Integration Tests
//!
//! Exercises the record service pattern against real repositories on an
//! in-memory database: canonicalization, soft/hard delete, pagination,
//! authorization, and audit emission.

use std::sync::Arc;

use chrono::NaiveDate;
use pt_tracking::api::PaginationParams;
use pt_tracking::loss::entity::{LossPatch, NewLoss};
use pt_tracking::production_error::entity::NewError;
use pt_tracking::shared::db::memory_pool;
use pt_tracking::{
    AbsenceRepository, AuditAction, AuditActor, AuditFilter, AuditLogRepository, AuditRecorder,
    ErrorCategory, ErrorRepository, LossRepository, LossType, RecordService, Role, Sector,
};

struct Harness {
    losses: RecordService<LossRepository>,
    errors: RecordService<ErrorRepository>,
    absences: RecordService<AbsenceRepository>,
    audit_repo: Arc<AuditLogRepository>,
}

async fn harness() -> Harness {
    let pool = memory_pool().await.unwrap();
    let audit_repo = Arc::new(AuditLogRepository::new(pool.clone()));
    let audit = AuditRecorder::new(audit_repo.clone());

    Harness {
        losses: RecordService::new(Arc::new(LossRepository::new(pool.clone())), audit.clone()),
        errors: RecordService::new(Arc::new(ErrorRepository::new(pool.clone())), audit.clone()),
        absences: RecordService::new(Arc::new(AbsenceRepository::new(pool.clone())), audit.clone()),
        audit_repo,
    }
}

fn actor() -> AuditActor {
    AuditActor {
        user_id: Some(1),
        ip_address: Some("10.1.2.3".to_string()),
        user_agent: Some("api-tests".to_string()),
    }
}

fn loss(product: &str, date: &str, quantity: f64, unit_cost: f64) -> NewLoss {
    NewLoss {
        product: product.to_string(),
        sector: Sector::Paes,
        loss_type: LossType::Massa,
        quantity,
        unit: "kg".to_string(),
        unit_cost,
        total_cost: quantity * unit_cost,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
    }
}

fn error_record(product: &str) -> NewError {
    NewError {
        product: product.to_string(),
        sector: Sector::Confeitaria,
        category: ErrorCategory::Producao,
        description: None,
        cost: 12.5,
        date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
    }
}

mod record_lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_loss_numeric_round_trip() {
        let h = harness().await;
        let created = h
            .losses
            .create(&actor(), loss("Pão Francês", "2026-01-20", 10.0, 2.5))
            .await
            .unwrap();

        let fetched = h.losses.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched.quantity, 10.0);
        assert_eq!(fetched.unit_cost, 2.5);
        assert_eq!(fetched.total_cost, 25.0);
        assert_eq!(fetched.sector, Sector::Paes);
        assert_eq!(fetched.date.to_string(), "2026-01-20");
    }

    #[tokio::test]
    async fn test_get_by_id_is_idempotent() {
        let h = harness().await;
        let created = h
            .losses
            .create(&actor(), loss("Sonho", "2026-01-21", 4.0, 1.2))
            .await
            .unwrap();

        let first = h.losses.get_by_id(created.id).await.unwrap();
        let second = h.losses.get_by_id(created.id).await.unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_soft_deleted_never_listed() {
        let h = harness().await;
        let keep = h
            .losses
            .create(&actor(), loss("Baguete", "2026-01-22", 2.0, 3.0))
            .await
            .unwrap();
        let gone = h
            .losses
            .create(&actor(), loss("Ciabatta", "2026-01-23", 1.0, 4.0))
            .await
            .unwrap();

        h.losses.remove(&actor(), gone.id).await.unwrap();

        let (records, meta) = h.losses.list(&PaginationParams::default()).await.unwrap();
        assert_eq!(meta.total, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, keep.id);

        // The physical row is still there, just marked
        assert_eq!(h.losses.get_by_id(gone.id).await.unwrap_err().code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_remove_twice_is_not_found() {
        let h = harness().await;
        let record = h
            .losses
            .create(&actor(), loss("Broa", "2026-01-24", 5.0, 0.8))
            .await
            .unwrap();

        h.losses.remove(&actor(), record.id).await.unwrap();
        let err = h.losses.remove(&actor(), record.id).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let err = h.losses.remove(&actor(), 9999).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let h = harness().await;
        let patch = LossPatch {
            quantity: Some(3.0),
            ..Default::default()
        };
        let err = h.losses.update(&actor(), 42, patch).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        // Nothing was audited for the failed update
        let count = h.audit_repo.count(&AuditFilter::default()).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_update_recomputes_total_cost() {
        let h = harness().await;
        let record = h
            .losses
            .create(&actor(), loss("Pão de Forma", "2026-01-25", 10.0, 2.0))
            .await
            .unwrap();
        assert_eq!(record.total_cost, 20.0);

        let patch = LossPatch {
            quantity: Some(4.0),
            ..Default::default()
        };
        let updated = h.losses.update(&actor(), record.id, patch).await.unwrap();
        assert_eq!(updated.quantity, 4.0);
        assert_eq!(updated.total_cost, 8.0);
    }

    #[tokio::test]
    async fn test_hard_delete_removes_error_row() {
        let h = harness().await;
        let record = h.errors.create(&actor(), error_record("Coxinha")).await.unwrap();

        h.errors.remove(&actor(), record.id).await.unwrap();

        assert_eq!(h.errors.get_by_id(record.id).await.unwrap_err().code(), "NOT_FOUND");
        let (records, meta) = h.errors.list(&PaginationParams::default()).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(meta.total, 0);
    }
}

mod pagination_tests {
    use super::*;

    #[tokio::test]
    async fn test_forty_five_records_paginate_to_three_pages() {
        let h = harness().await;
        for i in 0..45 {
            h.losses
                .create(
                    &actor(),
                    loss(&format!("Produto {:02}", i), "2026-02-01", 1.0, 1.0),
                )
                .await
                .unwrap();
        }

        let page1: PaginationParams = serde_json::from_str(r#"{"page":1,"limit":20}"#).unwrap();
        let (records, meta) = h.losses.list(&page1).await.unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(meta.total, 45);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);

        let page3: PaginationParams = serde_json::from_str(r#"{"page":3,"limit":20}"#).unwrap();
        let (records, meta) = h.losses.list(&page3).await.unwrap();
        assert_eq!(records.len(), 5);
        assert!(!meta.has_next);
    }

    #[tokio::test]
    async fn test_list_ordered_by_date_desc() {
        let h = harness().await;
        h.losses.create(&actor(), loss("Antigo", "2026-01-01", 1.0, 1.0)).await.unwrap();
        h.losses.create(&actor(), loss("Recente", "2026-03-01", 1.0, 1.0)).await.unwrap();
        h.losses.create(&actor(), loss("Meio", "2026-02-01", 1.0, 1.0)).await.unwrap();

        let (records, _) = h.losses.list(&PaginationParams::default()).await.unwrap();
        let products: Vec<&str> = records.iter().map(|r| r.product.as_str()).collect();
        assert_eq!(products, vec!["Recente", "Meio", "Antigo"]);
    }
}

mod audit_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_audits_snapshot_only() {
        let h = harness().await;

        // Occupy ids 1..=6 so the target lands on id 7
        for i in 0..6 {
            h.errors
                .create(&actor(), error_record(&format!("Produto {}", i)))
                .await
                .unwrap();
        }
        let target = h.errors.create(&actor(), error_record("Empada")).await.unwrap();
        assert_eq!(target.id, 7);

        h.errors.remove(&actor(), 7).await.unwrap();

        let filter = AuditFilter {
            action: Some(AuditAction::DeleteRecord),
            ..Default::default()
        };
        let entries = h.audit_repo.search(&filter, 0, 10).await.unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.entity_type, "ErrorRecord");
        assert_eq!(entry.entity_id, 7);
        assert_eq!(entry.user_id, Some(1));
        assert_eq!(entry.ip_address.as_deref(), Some("10.1.2.3"));

        // Snapshot carries the identifying fields, not the full record
        let detail = entry.detail.as_object().unwrap();
        let mut keys: Vec<&str> = detail.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["category", "cost", "date", "product"]);
        assert_eq!(detail["product"], "Empada");
    }

    #[tokio::test]
    async fn test_create_audits_full_payload() {
        let h = harness().await;
        let record = h
            .absences
            .create(
                &actor(),
                pt_tracking::absenteeism::entity::NewAbsence {
                    employee_name: "João Pereira".to_string(),
                    sector: Sector::PaoDeQueijo,
                    date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
                    absence_type: pt_tracking::AbsenceType::Atestado,
                    days_absent: 2,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let filter = AuditFilter {
            entity_type: Some("AbsenceRecord".to_string()),
            entity_id: Some(record.id),
            ..Default::default()
        };
        let entries = h.audit_repo.search(&filter, 0, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::CreateRecord);
        assert_eq!(entries[0].detail["employeeName"], "João Pereira");
        assert_eq!(entries[0].detail["sector"], "PAO_DE_QUEIJO");
        assert_eq!(entries[0].detail["daysAbsent"], 2);
    }

    #[tokio::test]
    async fn test_update_audits_supplied_fields_only() {
        let h = harness().await;
        let record = h
            .losses
            .create(&actor(), loss("Rosca", "2026-02-11", 2.0, 1.5))
            .await
            .unwrap();

        let patch = LossPatch {
            quantity: Some(6.0),
            ..Default::default()
        };
        h.losses.update(&actor(), record.id, patch).await.unwrap();

        let filter = AuditFilter {
            action: Some(AuditAction::UpdateRecord),
            ..Default::default()
        };
        let entries = h.audit_repo.search(&filter, 0, 10).await.unwrap();
        assert_eq!(entries.len(), 1);

        let detail = entries[0].detail.as_object().unwrap();
        assert_eq!(detail.len(), 1);
        assert_eq!(detail["quantity"], 6.0);
    }
}

mod authorization_tests {
    use super::*;
    use pt_tracking::{require_permission, AuthContext};

    #[tokio::test]
    async fn test_espectador_create_denied_before_any_side_effect() {
        let h = harness().await;
        let viewer = AuthContext::new(9, "Visitante", "viewer@example.com", Role::Espectador);

        // The handler checks the policy before validation and the service;
        // denial therefore leaves no record and no audit entry.
        let err = require_permission(&viewer, "losses:create").unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        let (records, meta) = h.losses.list(&PaginationParams::default()).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(meta.total, 0);
        assert_eq!(h.audit_repo.count(&AuditFilter::default()).await.unwrap(), 0);
    }

    #[test]
    fn test_role_matrix() {
        let admin = AuthContext::new(1, "Admin", "a@x.com", Role::Admin);
        let sup = AuthContext::new(2, "Sup", "s@x.com", Role::SupervisorQualidade);
        let leader = AuthContext::new(3, "Lider", "l@x.com", Role::LiderProducao);
        let viewer = AuthContext::new(4, "Viewer", "v@x.com", Role::Espectador);

        for module in ["absenteeism", "losses", "errors", "production-speed"] {
            assert!(admin.has_permission(&format!("{}:delete", module)));
            assert!(sup.has_permission(&format!("{}:delete", module)));
            assert!(leader.has_permission(&format!("{}:create", module)));
            assert!(!leader.has_permission(&format!("{}:delete", module)));
            assert!(!viewer.has_permission(&format!("{}:create", module)));
        }

        assert!(admin.has_permission("audit:view"));
        assert!(!sup.has_permission("audit:view"));
    }
}

mod soft_delete_visibility_tests {
    use super::*;

    #[tokio::test]
    async fn test_deleted_record_indistinguishable_from_absent() {
        let h = harness().await;
        let record = h
            .absences
            .create(
                &actor(),
                pt_tracking::absenteeism::entity::NewAbsence {
                    employee_name: "Maria Souza".to_string(),
                    sector: Sector::Embaladora,
                    date: NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(),
                    absence_type: pt_tracking::AbsenceType::Ferias,
                    days_absent: 10,
                    notes: Some("Férias programadas".to_string()),
                },
            )
            .await
            .unwrap();

        h.absences.remove(&actor(), record.id).await.unwrap();

        let missing = h.absences.get_by_id(record.id).await.unwrap_err();
        let never_existed = h.absences.get_by_id(123456).await.unwrap_err();
        assert_eq!(missing.code(), never_existed.code());
        assert_eq!(missing.status(), never_existed.status());
    }

    #[tokio::test]
    async fn test_update_applies_partial_fields() {
        let h = harness().await;
        let record = h
            .absences
            .create(
                &actor(),
                pt_tracking::absenteeism::entity::NewAbsence {
                    employee_name: "Carlos Lima".to_string(),
                    sector: Sector::Salgado,
                    date: NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
                    absence_type: pt_tracking::AbsenceType::FaltaInjustificada,
                    days_absent: 1,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let patch = pt_tracking::absenteeism::entity::AbsencePatch {
            absence_type: Some(pt_tracking::AbsenceType::FaltaJustificada),
            notes: Some(Some("Apresentou justificativa".to_string())),
            ..Default::default()
        };
        let updated = h.absences.update(&actor(), record.id, patch).await.unwrap();

        assert_eq!(updated.absence_type, pt_tracking::AbsenceType::FaltaJustificada);
        assert_eq!(updated.notes.as_deref(), Some("Apresentou justificativa"));
        // Untouched fields survive
        assert_eq!(updated.employee_name, "Carlos Lima");
        assert_eq!(updated.days_absent, 1);
    }
}
