//! Machine Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::machine::entity::{Machine, MachinePatch, NewMachine};
use crate::shared::canon::{MachineStatus, Sector};
use crate::shared::db::{format_datetime, parse_datetime};
use crate::shared::error::{Result, TrackingError};
use crate::shared::record::{DeletePolicy, RecordStore};

pub struct MachineRepository {
    pool: SqlitePool,
}

impl MachineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<Machine> {
        let sector_code: String = row.get("sector");
        let sector = Sector::from_input(&sector_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt sector in store: {}", sector_code))
        })?;

        let status_code: String = row.get("status");
        let status = MachineStatus::from_input(&status_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt machine status in store: {}", status_code))
        })?;

        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let deleted_at: Option<String> = row.get("deleted_at");

        Ok(Machine {
            id: row.get("id"),
            name: row.get("name"),
            sector,
            status,
            description: row.get("description"),
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
            deleted_at: deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

#[async_trait]
impl RecordStore for MachineRepository {
    type Record = Machine;
    type Create = NewMachine;
    type Update = MachinePatch;

    const ENTITY_TYPE: &'static str = "Machine";
    const DELETE_POLICY: DeletePolicy = DeletePolicy::Soft;

    fn id_of(record: &Machine) -> i64 {
        record.id
    }

    fn snapshot(record: &Machine) -> serde_json::Value {
        serde_json::json!({
            "name": record.name,
            "sector": record.sector,
            "status": record.status,
        })
    }

    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<Machine>, u64)> {
        let rows = sqlx::query(
            "SELECT * FROM machines WHERE deleted_at IS NULL \
             ORDER BY name ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(take as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM machines WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let records = rows.iter().map(Self::parse_row).collect::<Result<_>>()?;
        Ok((records, total as u64))
    }

    async fn fetch_active(&self, id: i64) -> Result<Option<Machine>> {
        let row = sqlx::query("SELECT * FROM machines WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    async fn insert(&self, input: &NewMachine) -> Result<Machine> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO machines (name, sector, status, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.sector.as_str())
        .bind(input.status.as_str())
        .bind(&input.description)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_active(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted machine not found"))
    }

    async fn apply_update(&self, id: i64, patch: &MachinePatch) -> Result<Option<Machine>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut binds: Vec<Option<String>> = Vec::new();

        if let Some(ref name) = patch.name {
            sets.push("name = ?");
            binds.push(Some(name.clone()));
        }
        if let Some(sector) = patch.sector {
            sets.push("sector = ?");
            binds.push(Some(sector.as_str().to_string()));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            binds.push(Some(status.as_str().to_string()));
        }
        if let Some(ref description) = patch.description {
            sets.push("description = ?");
            binds.push(description.clone());
        }

        if sets.is_empty() {
            return Ok(None);
        }
        sets.push("updated_at = ?");
        binds.push(Some(format_datetime(Utc::now())));

        let query = format!(
            "UPDATE machines SET {} WHERE id = ? AND deleted_at IS NULL",
            sets.join(", ")
        );
        let mut q = sqlx::query(&query);
        for bind in &binds {
            q = q.bind(bind);
        }
        let result = q.bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_active(id).await
    }

    async fn mark_deleted(&self, id: i64) -> Result<bool> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "UPDATE machines SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM machines WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
