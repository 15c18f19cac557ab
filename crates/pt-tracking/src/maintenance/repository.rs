//! Maintenance Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::maintenance::entity::{MaintenancePatch, MaintenanceRecord, NewMaintenance};
use crate::shared::canon::{MaintenanceType, Sector};
use crate::shared::db::{format_datetime, parse_datetime, parse_stored_date};
use crate::shared::error::{Result, TrackingError};
use crate::shared::record::{DeletePolicy, RecordStore};

pub struct MaintenanceRepository {
    pool: SqlitePool,
}

impl MaintenanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<MaintenanceRecord> {
        let sector_code: String = row.get("sector");
        let sector = Sector::from_input(&sector_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt sector in store: {}", sector_code))
        })?;

        let type_code: String = row.get("maintenance_type");
        let maintenance_type = MaintenanceType::from_input(&type_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt maintenance type in store: {}", type_code))
        })?;

        let date: String = row.get("date");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let deleted_at: Option<String> = row.get("deleted_at");

        Ok(MaintenanceRecord {
            id: row.get("id"),
            machine_name: row.get("machine_name"),
            sector,
            date: parse_stored_date(&date)?,
            maintenance_type,
            description: row.get("description"),
            cost: row.get("cost"),
            downtime_hours: row.get("downtime_hours"),
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
            deleted_at: deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

#[async_trait]
impl RecordStore for MaintenanceRepository {
    type Record = MaintenanceRecord;
    type Create = NewMaintenance;
    type Update = MaintenancePatch;

    const ENTITY_TYPE: &'static str = "MaintenanceRecord";
    const DELETE_POLICY: DeletePolicy = DeletePolicy::Soft;

    fn id_of(record: &MaintenanceRecord) -> i64 {
        record.id
    }

    fn snapshot(record: &MaintenanceRecord) -> serde_json::Value {
        serde_json::json!({
            "machineName": record.machine_name,
            "date": record.date,
            "maintenanceType": record.maintenance_type,
            "cost": record.cost,
        })
    }

    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<MaintenanceRecord>, u64)> {
        let rows = sqlx::query(
            "SELECT * FROM maintenance WHERE deleted_at IS NULL \
             ORDER BY date DESC, machine_name ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(take as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM maintenance WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let records = rows.iter().map(Self::parse_row).collect::<Result<_>>()?;
        Ok((records, total as u64))
    }

    async fn fetch_active(&self, id: i64) -> Result<Option<MaintenanceRecord>> {
        let row = sqlx::query("SELECT * FROM maintenance WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    async fn insert(&self, input: &NewMaintenance) -> Result<MaintenanceRecord> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO maintenance (machine_name, sector, date, maintenance_type, description, cost, downtime_hours, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.machine_name)
        .bind(input.sector.as_str())
        .bind(input.date.to_string())
        .bind(input.maintenance_type.as_str())
        .bind(&input.description)
        .bind(input.cost)
        .bind(input.downtime_hours)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_active(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted maintenance record not found"))
    }

    async fn apply_update(&self, id: i64, patch: &MaintenancePatch) -> Result<Option<MaintenanceRecord>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut binds: Vec<Option<String>> = Vec::new();

        if let Some(ref machine_name) = patch.machine_name {
            sets.push("machine_name = ?");
            binds.push(Some(machine_name.clone()));
        }
        if let Some(sector) = patch.sector {
            sets.push("sector = ?");
            binds.push(Some(sector.as_str().to_string()));
        }
        if let Some(date) = patch.date {
            sets.push("date = ?");
            binds.push(Some(date.to_string()));
        }
        if let Some(maintenance_type) = patch.maintenance_type {
            sets.push("maintenance_type = ?");
            binds.push(Some(maintenance_type.as_str().to_string()));
        }
        if let Some(ref description) = patch.description {
            sets.push("description = ?");
            binds.push(description.clone());
        }
        if let Some(cost) = patch.cost {
            sets.push("cost = ?");
            binds.push(Some(cost.to_string()));
        }
        if let Some(downtime) = patch.downtime_hours {
            sets.push("downtime_hours = ?");
            binds.push(Some(downtime.to_string()));
        }

        if sets.is_empty() {
            return Ok(None);
        }
        sets.push("updated_at = ?");
        binds.push(Some(format_datetime(Utc::now())));

        let query = format!(
            "UPDATE maintenance SET {} WHERE id = ? AND deleted_at IS NULL",
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
            "UPDATE maintenance SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM maintenance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
