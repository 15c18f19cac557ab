//! Audit Logs Admin API
//!
//! Read-only access to the audit trail; entries are never mutated or
//! deleted through this system.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::audit::entity::{AuditAction, AuditEntry};
use crate::audit::repository::{AuditFilter, AuditLogRepository};
use crate::shared::api_common::{ListResponse, PageMeta, PaginationParams};
use crate::shared::authorization::{permissions, require_permission};
use crate::shared::error::{Result, TrackingError};
use crate::shared::middleware::Authenticated;

/// Query parameters for the audit log list
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuditLogsQuery {
    #[serde(flatten)]
    pub pagination: PaginationParams,

    /// Filter by entity type name
    pub entity_type: Option<String>,

    /// Filter by entity id
    #[serde(
        default,
        deserialize_with = "crate::shared::api_common::string_or_number::deserialize_i64_opt"
    )]
    pub entity_id: Option<i64>,

    /// Filter by action code
    pub action: Option<String>,

    /// Filter by acting user
    #[serde(
        default,
        deserialize_with = "crate::shared::api_common::string_or_number::deserialize_i64_opt"
    )]
    pub user_id: Option<i64>,
}

/// Audit entry response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryResponse {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub detail: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

impl From<AuditEntry> for AuditEntryResponse {
    fn from(e: AuditEntry) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            action: e.action.as_str().to_string(),
            entity_type: e.entity_type,
            entity_id: e.entity_id,
            detail: e.detail,
            ip_address: e.ip_address,
            user_agent: e.user_agent,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

/// Audit logs service state
#[derive(Clone)]
pub struct AuditLogsState {
    pub audit_repo: Arc<AuditLogRepository>,
}

/// List audit log entries
#[utoipa::path(
    get,
    path = "",
    tag = "audit-logs",
    params(AuditLogsQuery),
    responses(
        (status = 200, description = "Audit trail page", body = [AuditEntryResponse]),
        (status = 403, description = "Missing audit:view permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_audit_logs(
    State(state): State<AuditLogsState>,
    auth: Authenticated,
    Query(query): Query<AuditLogsQuery>,
) -> Result<Json<ListResponse<AuditEntryResponse>>> {
    require_permission(&auth, permissions::AUDIT_VIEW)?;

    let action = match query.action.as_deref() {
        Some(raw) => Some(AuditAction::from_code(raw).ok_or_else(|| {
            TrackingError::validation(format!("action has unknown value: {}", raw))
        })?),
        None => None,
    };

    let filter = AuditFilter {
        entity_type: query.entity_type,
        entity_id: query.entity_id,
        action,
        user_id: query.user_id,
    };

    let pagination = query.pagination;
    let entries = state
        .audit_repo
        .search(&filter, pagination.skip(), pagination.limit())
        .await?;
    let total = state.audit_repo.count(&filter).await?;

    let meta = PageMeta::new(pagination.page(), pagination.limit(), total);
    Ok(Json(ListResponse::new(
        entries.into_iter().map(Into::into).collect(),
        meta,
    )))
}

pub fn audit_logs_router(state: AuditLogsState) -> Router {
    Router::new()
        .route("/", get(list_audit_logs))
        .with_state(state)
}
