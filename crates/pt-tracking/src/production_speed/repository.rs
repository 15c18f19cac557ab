//! Production Speed Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::production_speed::entity::{NewSpeed, SpeedPatch, SpeedRecord};
use crate::shared::canon::{Sector, Shift};
use crate::shared::db::{format_datetime, parse_datetime, parse_stored_date};
use crate::shared::error::{Result, TrackingError};
use crate::shared::record::{DeletePolicy, RecordStore};

pub struct SpeedRepository {
    pool: SqlitePool,
}

impl SpeedRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<SpeedRecord> {
        let sector_code: String = row.get("sector");
        let sector = Sector::from_input(&sector_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt sector in store: {}", sector_code))
        })?;

        let shift_code: Option<String> = row.get("shift");
        let shift = match shift_code {
            Some(ref code) => Some(Shift::from_input(code).ok_or_else(|| {
                TrackingError::internal(format!("Corrupt shift in store: {}", code))
            })?),
            None => None,
        };

        let date: String = row.get("date");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let deleted_at: Option<String> = row.get("deleted_at");

        Ok(SpeedRecord {
            id: row.get("id"),
            product: row.get("product"),
            sector,
            date: parse_stored_date(&date)?,
            units_per_hour: row.get("units_per_hour"),
            shift,
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
            deleted_at: deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

#[async_trait]
impl RecordStore for SpeedRepository {
    type Record = SpeedRecord;
    type Create = NewSpeed;
    type Update = SpeedPatch;

    const ENTITY_TYPE: &'static str = "SpeedRecord";
    const DELETE_POLICY: DeletePolicy = DeletePolicy::Soft;

    fn id_of(record: &SpeedRecord) -> i64 {
        record.id
    }

    fn snapshot(record: &SpeedRecord) -> serde_json::Value {
        serde_json::json!({
            "product": record.product,
            "date": record.date,
            "sector": record.sector,
            "unitsPerHour": record.units_per_hour,
        })
    }

    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<SpeedRecord>, u64)> {
        let rows = sqlx::query(
            "SELECT * FROM production_speed WHERE deleted_at IS NULL \
             ORDER BY date DESC, sector ASC, product ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(take as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM production_speed WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let records = rows.iter().map(Self::parse_row).collect::<Result<_>>()?;
        Ok((records, total as u64))
    }

    async fn fetch_active(&self, id: i64) -> Result<Option<SpeedRecord>> {
        let row = sqlx::query("SELECT * FROM production_speed WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    async fn insert(&self, input: &NewSpeed) -> Result<SpeedRecord> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO production_speed (product, sector, date, units_per_hour, shift, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.product)
        .bind(input.sector.as_str())
        .bind(input.date.to_string())
        .bind(input.units_per_hour)
        .bind(input.shift.map(|s| s.as_str()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_active(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted speed record not found"))
    }

    async fn apply_update(&self, id: i64, patch: &SpeedPatch) -> Result<Option<SpeedRecord>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut binds: Vec<Option<String>> = Vec::new();

        if let Some(ref product) = patch.product {
            sets.push("product = ?");
            binds.push(Some(product.clone()));
        }
        if let Some(sector) = patch.sector {
            sets.push("sector = ?");
            binds.push(Some(sector.as_str().to_string()));
        }
        if let Some(date) = patch.date {
            sets.push("date = ?");
            binds.push(Some(date.to_string()));
        }
        if let Some(units) = patch.units_per_hour {
            sets.push("units_per_hour = ?");
            binds.push(Some(units.to_string()));
        }
        if let Some(shift) = patch.shift {
            sets.push("shift = ?");
            binds.push(shift.map(|s| s.as_str().to_string()));
        }

        if sets.is_empty() {
            return Ok(None);
        }
        sets.push("updated_at = ?");
        binds.push(Some(format_datetime(Utc::now())));

        let query = format!(
            "UPDATE production_speed SET {} WHERE id = ? AND deleted_at IS NULL",
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
            "UPDATE production_speed SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM production_speed WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
