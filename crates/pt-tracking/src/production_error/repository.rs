//! Production Error Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::production_error::entity::{ErrorPatch, ErrorRecord, NewError};
use crate::shared::canon::{ErrorCategory, Sector};
use crate::shared::db::{format_datetime, parse_datetime, parse_stored_date};
use crate::shared::error::{Result, TrackingError};
use crate::shared::record::{DeletePolicy, RecordStore};

pub struct ErrorRepository {
    pool: SqlitePool,
}

impl ErrorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<ErrorRecord> {
        let sector_code: String = row.get("sector");
        let sector = Sector::from_input(&sector_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt sector in store: {}", sector_code))
        })?;

        let category_code: String = row.get("category");
        let category = ErrorCategory::from_input(&category_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt category in store: {}", category_code))
        })?;

        let date: String = row.get("date");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(ErrorRecord {
            id: row.get("id"),
            product: row.get("product"),
            sector,
            category,
            description: row.get("description"),
            cost: row.get("cost"),
            date: parse_stored_date(&date)?,
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
        })
    }
}

#[async_trait]
impl RecordStore for ErrorRepository {
    type Record = ErrorRecord;
    type Create = NewError;
    type Update = ErrorPatch;

    const ENTITY_TYPE: &'static str = "ErrorRecord";
    const DELETE_POLICY: DeletePolicy = DeletePolicy::Hard;

    fn id_of(record: &ErrorRecord) -> i64 {
        record.id
    }

    fn snapshot(record: &ErrorRecord) -> serde_json::Value {
        serde_json::json!({
            "product": record.product,
            "date": record.date,
            "category": record.category,
            "cost": record.cost,
        })
    }

    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<ErrorRecord>, u64)> {
        let rows = sqlx::query(
            "SELECT * FROM errors ORDER BY date DESC, product ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(take as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM errors")
            .fetch_one(&self.pool)
            .await?;

        let records = rows.iter().map(Self::parse_row).collect::<Result<_>>()?;
        Ok((records, total as u64))
    }

    async fn fetch_active(&self, id: i64) -> Result<Option<ErrorRecord>> {
        let row = sqlx::query("SELECT * FROM errors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    async fn insert(&self, input: &NewError) -> Result<ErrorRecord> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO errors (product, sector, category, description, cost, date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.product)
        .bind(input.sector.as_str())
        .bind(input.category.as_str())
        .bind(&input.description)
        .bind(input.cost)
        .bind(input.date.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_active(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted error record not found"))
    }

    async fn apply_update(&self, id: i64, patch: &ErrorPatch) -> Result<Option<ErrorRecord>> {
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
        if let Some(category) = patch.category {
            sets.push("category = ?");
            binds.push(Some(category.as_str().to_string()));
        }
        if let Some(ref description) = patch.description {
            sets.push("description = ?");
            binds.push(description.clone());
        }
        if let Some(cost) = patch.cost {
            sets.push("cost = ?");
            binds.push(Some(cost.to_string()));
        }
        if let Some(date) = patch.date {
            sets.push("date = ?");
            binds.push(Some(date.to_string()));
        }

        if sets.is_empty() {
            return Ok(None);
        }
        sets.push("updated_at = ?");
        binds.push(Some(format_datetime(Utc::now())));

        let query = format!("UPDATE errors SET {} WHERE id = ?", sets.join(", "));
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

    async fn mark_deleted(&self, _id: i64) -> Result<bool> {
        Err(TrackingError::internal(
            "ErrorRecord uses hard deletes; soft delete is not supported",
        ))
    }

    async fn delete_row(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM errors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
