//! Employee Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::employee::entity::{Employee, EmployeePatch, NewEmployee};
use crate::shared::canon::Sector;
use crate::shared::db::{format_datetime, parse_datetime, parse_stored_date};
use crate::shared::error::{Result, TrackingError};
use crate::shared::record::{DeletePolicy, RecordStore};

pub struct EmployeeRepository {
    pool: SqlitePool,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<Employee> {
        let sector_code: String = row.get("sector");
        let sector = Sector::from_input(&sector_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt sector in store: {}", sector_code))
        })?;

        let hired_at: Option<String> = row.get("hired_at");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let deleted_at: Option<String> = row.get("deleted_at");

        Ok(Employee {
            id: row.get("id"),
            name: row.get("name"),
            sector,
            position: row.get("position"),
            hired_at: hired_at.as_deref().map(parse_stored_date).transpose()?,
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
            deleted_at: deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

#[async_trait]
impl RecordStore for EmployeeRepository {
    type Record = Employee;
    type Create = NewEmployee;
    type Update = EmployeePatch;

    const ENTITY_TYPE: &'static str = "Employee";
    const DELETE_POLICY: DeletePolicy = DeletePolicy::Soft;

    fn id_of(record: &Employee) -> i64 {
        record.id
    }

    fn snapshot(record: &Employee) -> serde_json::Value {
        serde_json::json!({
            "name": record.name,
            "sector": record.sector,
            "position": record.position,
        })
    }

    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<Employee>, u64)> {
        let rows = sqlx::query(
            "SELECT * FROM employees WHERE deleted_at IS NULL \
             ORDER BY name ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(take as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let records = rows.iter().map(Self::parse_row).collect::<Result<_>>()?;
        Ok((records, total as u64))
    }

    async fn fetch_active(&self, id: i64) -> Result<Option<Employee>> {
        let row = sqlx::query("SELECT * FROM employees WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    async fn insert(&self, input: &NewEmployee) -> Result<Employee> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO employees (name, sector, position, hired_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.sector.as_str())
        .bind(&input.position)
        .bind(input.hired_at.map(|d| d.to_string()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_active(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted employee not found"))
    }

    async fn apply_update(&self, id: i64, patch: &EmployeePatch) -> Result<Option<Employee>> {
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
        if let Some(ref position) = patch.position {
            sets.push("position = ?");
            binds.push(Some(position.clone()));
        }
        if let Some(hired_at) = patch.hired_at {
            sets.push("hired_at = ?");
            binds.push(hired_at.map(|d| d.to_string()));
        }

        if sets.is_empty() {
            return Ok(None);
        }
        sets.push("updated_at = ?");
        binds.push(Some(format_datetime(Utc::now())));

        let query = format!(
            "UPDATE employees SET {} WHERE id = ? AND deleted_at IS NULL",
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
            "UPDATE employees SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
