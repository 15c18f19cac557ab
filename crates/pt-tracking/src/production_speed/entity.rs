//! Production Speed Entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::canon::{Sector, Shift};

/// One measured production rate for a product on a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedRecord {
    pub id: i64,
    pub product: String,
    pub sector: Sector,
    pub date: NaiveDate,
    pub units_per_hour: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Validated create payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpeed {
    pub product: String,
    pub sector: Sector,
    pub date: NaiveDate,
    pub units_per_hour: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
}

/// Validated partial update; `shift: Some(None)` clears the field.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<Sector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units_per_hour: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<Option<Shift>>,
}
