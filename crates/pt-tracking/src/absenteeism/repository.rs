//! Absenteeism Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::absenteeism::entity::{AbsencePatch, AbsenceRecord, NewAbsence};
use crate::shared::canon::{AbsenceType, Sector};
use crate::shared::db::{format_datetime, parse_datetime, parse_stored_date};
use crate::shared::error::{Result, TrackingError};
use crate::shared::record::{DeletePolicy, RecordStore};

pub struct AbsenceRepository {
    pool: SqlitePool,
}

impl AbsenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> Result<AbsenceRecord> {
        let sector_code: String = row.get("sector");
        let sector = Sector::from_input(&sector_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt sector in store: {}", sector_code))
        })?;

        let type_code: String = row.get("absence_type");
        let absence_type = AbsenceType::from_input(&type_code).ok_or_else(|| {
            TrackingError::internal(format!("Corrupt absence type in store: {}", type_code))
        })?;

        let date: String = row.get("date");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");
        let deleted_at: Option<String> = row.get("deleted_at");

        Ok(AbsenceRecord {
            id: row.get("id"),
            employee_name: row.get("employee_name"),
            sector,
            date: parse_stored_date(&date)?,
            absence_type,
            days_absent: row.get("days_absent"),
            notes: row.get("notes"),
            created_at: parse_datetime(&created_at)?,
            updated_at: parse_datetime(&updated_at)?,
            deleted_at: deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

#[async_trait]
impl RecordStore for AbsenceRepository {
    type Record = AbsenceRecord;
    type Create = NewAbsence;
    type Update = AbsencePatch;

    const ENTITY_TYPE: &'static str = "AbsenceRecord";
    const DELETE_POLICY: DeletePolicy = DeletePolicy::Soft;

    fn id_of(record: &AbsenceRecord) -> i64 {
        record.id
    }

    fn snapshot(record: &AbsenceRecord) -> serde_json::Value {
        serde_json::json!({
            "employeeName": record.employee_name,
            "date": record.date,
            "absenceType": record.absence_type,
            "daysAbsent": record.days_absent,
        })
    }

    async fn fetch_page(&self, skip: u64, take: u32) -> Result<(Vec<AbsenceRecord>, u64)> {
        let rows = sqlx::query(
            "SELECT * FROM absenteeism WHERE deleted_at IS NULL \
             ORDER BY date DESC, employee_name ASC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(take as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM absenteeism WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let records = rows.iter().map(Self::parse_row).collect::<Result<_>>()?;
        Ok((records, total as u64))
    }

    async fn fetch_active(&self, id: i64) -> Result<Option<AbsenceRecord>> {
        let row = sqlx::query("SELECT * FROM absenteeism WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::parse_row(&r)).transpose()
    }

    async fn insert(&self, input: &NewAbsence) -> Result<AbsenceRecord> {
        let now = format_datetime(Utc::now());
        let result = sqlx::query(
            "INSERT INTO absenteeism (employee_name, sector, date, absence_type, days_absent, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.employee_name)
        .bind(input.sector.as_str())
        .bind(input.date.to_string())
        .bind(input.absence_type.as_str())
        .bind(input.days_absent)
        .bind(&input.notes)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.fetch_active(result.last_insert_rowid())
            .await?
            .ok_or_else(|| TrackingError::internal("Inserted absence record not found"))
    }

    async fn apply_update(&self, id: i64, patch: &AbsencePatch) -> Result<Option<AbsenceRecord>> {
        let mut sets: Vec<&str> = Vec::new();
        let mut binds: Vec<Option<String>> = Vec::new();

        if let Some(ref name) = patch.employee_name {
            sets.push("employee_name = ?");
            binds.push(Some(name.clone()));
        }
        if let Some(sector) = patch.sector {
            sets.push("sector = ?");
            binds.push(Some(sector.as_str().to_string()));
        }
        if let Some(date) = patch.date {
            sets.push("date = ?");
            binds.push(Some(date.to_string()));
        }
        if let Some(absence_type) = patch.absence_type {
            sets.push("absence_type = ?");
            binds.push(Some(absence_type.as_str().to_string()));
        }
        if let Some(days) = patch.days_absent {
            sets.push("days_absent = ?");
            binds.push(Some(days.to_string()));
        }
        if let Some(ref notes) = patch.notes {
            sets.push("notes = ?");
            binds.push(notes.clone());
        }

        if sets.is_empty() {
            return Ok(None);
        }
        sets.push("updated_at = ?");
        binds.push(Some(format_datetime(Utc::now())));

        let query = format!(
            "UPDATE absenteeism SET {} WHERE id = ? AND deleted_at IS NULL",
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
            "UPDATE absenteeism SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_row(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM absenteeism WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
