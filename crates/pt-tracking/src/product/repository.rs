//! Product Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::product::entity::{NewProduct, Product, ProductPatch};
use crate::shared::canon::Sector;
use crate::shared::db::{format_datetime, parse_datetime};
use crate::shared::error::{Result, TrackingError};
use crate::shared::record::{DeletePolicy, RecordStore};

pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
        let sector_code: String = row.get("sector");
        let sector = Sector::from_input(&sector_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt sector in store: {}", sector_code))
        })?;

        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let deleted_at: Option<String> = row.get("deleted_at");

        Ok(Product {
            id: row.get("id"),
            name: row.get("name"),
            sector,
            unit: row.get("unit"),
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
            deleted_at: deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

#[async_trait]
impl RecordStore for ProductRepository {
    type Record = Product;
    type Create = NewProduct;
    type Update = ProductPatch;

    const ENTITY_TYPE: &'static str = "Product";
    const DELETE_POLICY: DeletePolicy = DeletePolicy::Soft;

    fn id_of(record: &Product) -> i64 {
        record.id
    }

    fn snapshot(record: &Product) -> serde_json::Value {
        serde_json::json!({
            "name": record.name,
            "sector": record.sector,
            "unit": record.unit,
        })
    }

    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<Product>, u64)> {
        let rows = sqlx::query(
            "SELECT * FROM products WHERE deleted_at IS NULL \
             ORDER BY name ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(take as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let records = rows.iter().map(Self::parse_row).collect::<Result<_>>()?;
        Ok((records, total as u64))
    }

    async fn fetch_active(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    async fn insert(&self, input: &NewProduct) -> Result<Product> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO products (name, sector, unit, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.sector.as_str())
        .bind(&input.unit)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_active(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted product not found"))
    }

    async fn apply_update(&self, id: i64, patch: &ProductPatch) -> Result<Option<Product>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut binds: Vec<String> = Vec::new();

        if let Some(ref name) = patch.name {
            sets.push("name = ?");
            binds.push(name.clone());
        }
        if let Some(sector) = patch.sector {
            sets.push("sector = ?");
            binds.push(sector.as_str().to_string());
        }
        if let Some(ref unit) = patch.unit {
            sets.push("unit = ?");
            binds.push(unit.clone());
        }

        if sets.is_empty() {
            return Ok(None);
        }
        sets.push("updated_at = ?");
        binds.push(format_datetime(Utc::now()));

        let query = format!(
            "UPDATE products SET {} WHERE id = ? AND deleted_at IS NULL",
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
            "UPDATE products SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
