//! Audit Trail Entity
//!
//! One immutable entry per mutating operation: who did what to which
//! record, from where. Entries are only ever appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit action code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRecord => "CREATE_RECORD",
            Self::UpdateRecord => "UPDATE_RECORD",
            Self::DeleteRecord => "DELETE_RECORD",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CREATE_RECORD" => Some(Self::CreateRecord),
            "UPDATE_RECORD" => Some(Self::UpdateRecord),
            "DELETE_RECORD" => Some(Self::DeleteRecord),
            _ => None,
        }
    }
}

/// A persisted audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,

    /// Acting user; null when an unauthenticated actor reached the endpoint.
    pub user_id: Option<i64>,

    pub action: AuditAction,

    /// Entity type name, e.g. "LossRecord".
    pub entity_type: String,

    pub entity_id: i64,

    /// Free-form map of created/changed/deleted fields.
    pub detail: serde_json::Value,

    pub ip_address: Option<String>,

    pub user_agent: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A not-yet-persisted entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: i64,
    pub detail: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes() {
        assert_eq!(AuditAction::CreateRecord.as_str(), "CREATE_RECORD");
        assert_eq!(AuditAction::from_code("DELETE_RECORD"), Some(AuditAction::DeleteRecord));
        assert_eq!(AuditAction::from_code("ARCHIVE"), None);
    }

    #[test]
    fn test_action_serde() {
        let json = serde_json::to_string(&AuditAction::UpdateRecord).unwrap();
        assert_eq!(json, "\"UPDATE_RECORD\"");
    }
}
