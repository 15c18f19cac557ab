//! Loss Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::loss::entity::{LossPatch, LossRecord, NewLoss};
use crate::shared::canon::{LossType, Sector};
use crate::shared::db::{format_datetime, parse_datetime, parse_stored_date};
use crate::shared::error::{Result, TrackingError};
use crate::shared::record::{DeletePolicy, RecordStore};

pub struct LossRepository {
    pool: SqlitePool,
}

impl LossRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<LossRecord> {
        let sector_code: String = row.get("sector");
        let sector = Sector::from_input(&sector_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt sector in store: {}", sector_code))
        })?;

        let type_code: String = row.get("loss_type");
        let loss_type = LossType::from_input(&type_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt loss type in store: {}", type_code))
        })?;

        let date: String = row.get("date");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let deleted_at: Option<String> = row.get("deleted_at");

        Ok(LossRecord {
            id: row.get("id"),
            product: row.get("product"),
            sector,
            loss_type,
            quantity: row.get("quantity"),
            unit: row.get("unit"),
            unit_cost: row.get("unit_cost"),
            total_cost: row.get("total_cost"),
            date: parse_stored_date(&date)?,
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
            deleted_at: deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

#[async_trait]
impl RecordStore for LossRepository {
    type Record = LossRecord;
    type Create = NewLoss;
    type Update = LossPatch;

    const ENTITY_TYPE: &'static str = "LossRecord";
    const DELETE_POLICY: DeletePolicy = DeletePolicy::Soft;

    fn id_of(record: &LossRecord) -> i64 {
        record.id
    }

    fn snapshot(record: &LossRecord) -> serde_json::Value {
        serde_json::json!({
            "product": record.product,
            "date": record.date,
            "lossType": record.loss_type,
            "quantity": record.quantity,
            "totalCost": record.total_cost,
        })
    }

    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<LossRecord>, u64)> {
        let rows = sqlx::query(
            "SELECT * FROM losses WHERE deleted_at IS NULL \
             ORDER BY date DESC, sector ASC, product ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(take as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM losses WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;

        let records = rows.iter().map(Self::parse_row).collect::<Result<_>>()?;
        Ok((records, total as u64))
    }

    async fn fetch_active(&self, id: i64) -> Result<Option<LossRecord>> {
        let row = sqlx::query("SELECT * FROM losses WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    async fn insert(&self, input: &NewLoss) -> Result<LossRecord> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO losses (product, sector, loss_type, quantity, unit, unit_cost, total_cost, date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.product)
        .bind(input.sector.as_str())
        .bind(input.loss_type.as_str())
        .bind(input.quantity)
        .bind(&input.unit)
        .bind(input.unit_cost)
        .bind(input.total_cost)
        .bind(input.date.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_active(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted loss record not found"))
    }

    async fn apply_update(&self, id: i64, patch: &LossPatch) -> Result<Option<LossRecord>> {
        let mut sets: Vec<String> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref product) = patch.product {
            sets.push("product = ?".into());
            binds.push(product.clone());
        }
        if let Some(sector) = patch.sector {
            sets.push("sector = ?".into());
            binds.push(sector.as_str().to_string());
        }
        if let Some(loss_type) = patch.loss_type {
            sets.push("loss_type = ?".into());
            binds.push(loss_type.as_str().to_string());
        }
        if let Some(quantity) = patch.quantity {
            sets.push("quantity = ?".into());
            binds.push(quantity.to_string());
        }
        if let Some(ref unit) = patch.unit {
            sets.push("unit = ?".into());
            binds.push(unit.clone());
        }
        if let Some(unit_cost) = patch.unit_cost {
            sets.push("unit_cost = ?".into());
            binds.push(unit_cost.to_string());
        }

        // Keep total consistent when it was not supplied explicitly.
        // SET expressions see the old row, so the new quantity/unit cost
        // must be re-bound where they apply.
        match (patch.total_cost, patch.quantity, patch.unit_cost) {
            (Some(total), _, _) => {
                sets.push("total_cost = ?".into());
                binds.push(total.to_string());
            }
            (None, Some(quantity), Some(unit_cost)) => {
                sets.push("total_cost = ?".into());
                binds.push((quantity * unit_cost).to_string());
            }
            (None, Some(quantity), None) => {
                sets.push("total_cost = ? * unit_cost".into());
                binds.push(quantity.to_string());
            }
            (None, None, Some(unit_cost)) => {
                sets.push("total_cost = quantity * ?".into());
                binds.push(unit_cost.to_string());
            }
            (None, None, None) => {}
        }

        if let Some(date) = patch.date {
            sets.push("date = ?".into());
            binds.push(date.to_string());
        }

        if sets.is_empty() {
            return Ok(None);
        }
        sets.push("updated_at = ?".into());
        binds.push(format_datetime(Utc::now()));

        let query = format!(
            "UPDATE losses SET {} WHERE id = ? AND deleted_at IS NULL",
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
            "UPDATE losses SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM losses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
