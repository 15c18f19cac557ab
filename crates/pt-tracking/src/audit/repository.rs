//! Audit Log Repository

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::audit::entity::{AuditAction, AuditEntry, NewAuditEntry};
use crate::shared::db::{format_datetime, parse_datetime};
use crate::shared::error::{Result, TrackingError};

/// Optional filters for audit log searches.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub action: Option<AuditAction>,
    pub user_id: Option<i64>,
}

pub struct AuditLogRepository {
    pool: SqlitePool,
}

impl AuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &NewAuditEntry) -> Result<i64> {
        let detail = serde_json::to_string(&entry.detail)?;
        let result = sqlx::query(
            "INSERT INTO audit_logs (user_id, action, entity_type, entity_id, detail, ip_address, user_agent, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(&entry.entity_type)
        .bind(entry.entity_id)
        .bind(detail)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(format_datetime(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<AuditEntry>> {
        let row = sqlx::query("SELECT * FROM audit_logs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    pub async fn search(&self, filter: &AuditFilter, skip: u64, limit: u32) -> Result<Vec<AuditEntry>> {
        let (clause, binds) = Self::filter_clause(filter);
        let query = format!(
            "SELECT * FROM audit_logs {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            clause
        );

        let mut q = sqlx::query(&query);
        for bind in binds {
            q = q.bind(bind);
        }
        let rows = q
            .bind(limit as i64)
            .bind(skip as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::parse_row).collect()
    }

    pub async fn count(&self, filter: &AuditFilter) -> Result<u64> {
        let (clause, binds) = Self::filter_clause(filter);
        let query = format!("SELECT COUNT(*) FROM audit_logs {}", clause);

        let mut q = sqlx::query_scalar::<_, i64>(&query);
        for bind in binds {
            q = q.bind(bind);
        }
        let count = q.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    fn filter_clause(filter: &AuditFilter) -> (String, Vec<String>) {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        if let Some(ref entity_type) = filter.entity_type {
            conditions.push("entity_type = ?");
            binds.push(entity_type.clone());
        }
        if let Some(entity_id) = filter.entity_id {
            conditions.push("entity_id = ?");
            binds.push(entity_id.to_string());
        }
        if let Some(action) = filter.action {
            conditions.push("action = ?");
            binds.push(action.as_str().to_string());
        }
        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?");
            binds.push(user_id.to_string());
        }

        if conditions.is_empty() {
            (String::new(), binds)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), binds)
        }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEntry> {
        let action_code: String = row.get("action");
        let action = AuditAction::from_code(&action_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt audit action: {}", action_code))
        })?;

        let detail_raw: String = row.get("detail");
        let detail = serde_json::from_str(&detail_raw)?;

        let created_at_raw: String = row.get("created_at");

        Ok(AuditEntry {
            id: row.get("id"),
            user_id: row.get("user_id"),
            action,
            entity_type: row.get("entity_type"),
            entity_id: row.get("entity_id"),
            detail,
            ip_address: row.get("ip_address"),
            user_agent: row.get("user_agent"),
            created_at: parse_datetime(&created_at_raw)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::db::memory_pool;

    fn entry(action: AuditAction, entity_type: &str, entity_id: i64) -> NewAuditEntry {
        NewAuditEntry {
            user_id: Some(1),
            action,
            entity_type: entity_type.to_string(),
            entity_id,
            detail: serde_json::json!({ "product": "Bolo de Cenoura" }),
            ip_address: Some("10.0.0.1".to_string()),
            user_agent: Some("tests".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let pool = memory_pool().await.unwrap();
        let repo = AuditLogRepository::new(pool);

        let id = repo
            .insert(&entry(AuditAction::CreateRecord, "LossRecord", 7))
            .await
            .unwrap();

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.action, AuditAction::CreateRecord);
        assert_eq!(found.entity_type, "LossRecord");
        assert_eq!(found.entity_id, 7);
        assert_eq!(found.detail["product"], "Bolo de Cenoura");
        assert_eq!(found.ip_address.as_deref(), Some("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_search_filters() {
        let pool = memory_pool().await.unwrap();
        let repo = AuditLogRepository::new(pool);

        repo.insert(&entry(AuditAction::CreateRecord, "LossRecord", 1)).await.unwrap();
        repo.insert(&entry(AuditAction::DeleteRecord, "LossRecord", 1)).await.unwrap();
        repo.insert(&entry(AuditAction::CreateRecord, "ErrorRecord", 2)).await.unwrap();

        let filter = AuditFilter {
            entity_type: Some("LossRecord".to_string()),
            ..Default::default()
        };
        assert_eq!(repo.count(&filter).await.unwrap(), 2);

        let filter = AuditFilter {
            action: Some(AuditAction::DeleteRecord),
            ..Default::default()
        };
        let entries = repo.search(&filter, 0, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity_type, "LossRecord");
    }
}
