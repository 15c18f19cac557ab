//! Losses API
//!
//! REST endpoints for loss records, mounted at `/api/losses`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::audit::service::AuditActor;
use crate::loss::entity::{LossPatch, LossRecord, NewLoss};
use crate::loss::repository::LossRepository;
use crate::shared::api_common::{parse_id, ApiResponse, ListResponse, PaginationParams};
use crate::shared::authorization::require_permission;
use crate::shared::canon::{LossType, Sector};
use crate::shared::error::Result;
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::record::RecordService;
use crate::shared::validate::{self, Violations};

/// Create loss request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateLossRequest {
    pub product: Option<String>,
    pub sector: Option<String>,
    pub loss_type: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub date: Option<String>,
}

/// Update loss request (partial)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateLossRequest {
    pub product: Option<String>,
    pub sector: Option<String>,
    pub loss_type: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub date: Option<String>,
}

/// Loss response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LossResponse {
    pub id: i64,
    pub product: String,
    pub sector: String,
    pub loss_type: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_cost: f64,
    pub total_cost: f64,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<LossRecord> for LossResponse {
    fn from(r: LossRecord) -> Self {
        Self {
            id: r.id,
            product: r.product,
            sector: r.sector.as_str().to_string(),
            loss_type: r.loss_type.as_str().to_string(),
            quantity: r.quantity,
            unit: r.unit,
            unit_cost: r.unit_cost,
            total_cost: r.total_cost,
            date: r.date.to_string(),
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

fn validate_create(req: CreateLossRequest) -> Result<NewLoss> {
    let mut v = Violations::new();
    let product = validate::required_text(&mut v, "product", req.product.as_deref(), 1, 120);
    let sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    let loss_type = validate::required_enum(&mut v, "lossType", req.loss_type.as_deref(), LossType::from_input);
    let quantity = validate::required_positive_f64(&mut v, "quantity", req.quantity);
    let unit = validate::required_text(&mut v, "unit", req.unit.as_deref(), 1, 20);
    let unit_cost = validate::required_nonnegative_f64(&mut v, "unitCost", req.unit_cost);
    let total_cost = validate::optional_nonnegative_f64(&mut v, "totalCost", req.total_cost);
    let date = validate::required_date(&mut v, "date", req.date.as_deref());
    v.finish()?;

    let quantity = quantity.unwrap();
    let unit_cost = unit_cost.unwrap();
    Ok(NewLoss {
        product: product.unwrap(),
        sector: sector.unwrap(),
        loss_type: loss_type.unwrap(),
        quantity,
        unit: unit.unwrap(),
        unit_cost,
        total_cost: total_cost.unwrap_or(quantity * unit_cost),
        date: date.unwrap(),
    })
}

fn validate_update(req: UpdateLossRequest) -> Result<LossPatch> {
    let mut v = Violations::new();
    let mut patch = LossPatch::default();

    if req.product.is_some() {
        patch.product = validate::required_text(&mut v, "product", req.product.as_deref(), 1, 120);
    }
    if req.sector.is_some() {
        patch.sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    }
    if req.loss_type.is_some() {
        patch.loss_type =
            validate::required_enum(&mut v, "lossType", req.loss_type.as_deref(), LossType::from_input);
    }
    if req.quantity.is_some() {
        patch.quantity = validate::required_positive_f64(&mut v, "quantity", req.quantity);
    }
    if req.unit.is_some() {
        patch.unit = validate::required_text(&mut v, "unit", req.unit.as_deref(), 1, 20);
    }
    if req.unit_cost.is_some() {
        patch.unit_cost = validate::required_nonnegative_f64(&mut v, "unitCost", req.unit_cost);
    }
    if req.total_cost.is_some() {
        patch.total_cost = validate::required_nonnegative_f64(&mut v, "totalCost", req.total_cost);
    }
    if req.date.is_some() {
        patch.date = validate::required_date(&mut v, "date", req.date.as_deref());
    }

    v.finish()?;
    Ok(patch)
}

/// Losses service state
#[derive(Clone)]
pub struct LossesState {
    pub service: Arc<RecordService<LossRepository>>,
}

/// List loss records
#[utoipa::path(
    get,
    path = "",
    tag = "losses",
    params(PaginationParams),
    responses((status = 200, description = "Page of loss records", body = [LossResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_losses(
    State(state): State<LossesState>,
    _auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ListResponse<LossResponse>>> {
    let (records, meta) = state.service.list(&pagination).await?;
    Ok(Json(ListResponse::new(
        records.into_iter().map(Into::into).collect(),
        meta,
    )))
}

/// Get one loss record
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "losses",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Loss record", body = LossResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_loss(
    State(state): State<LossesState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LossResponse>>> {
    let id = parse_id(&id)?;
    let record = state.service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// Create a loss record
#[utoipa::path(
    post,
    path = "",
    tag = "losses",
    request_body = CreateLossRequest,
    responses(
        (status = 201, description = "Created", body = LossResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_loss(
    State(state): State<LossesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_permission(&auth, "losses:create")?;
    let req: CreateLossRequest = validate::decode(body)?;
    let input = validate_create(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.create(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            LossResponse::from(record),
            "Loss record created",
        )),
    ))
}

/// Update a loss record
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "losses",
    params(("id" = String, Path, description = "Record id")),
    request_body = UpdateLossRequest,
    responses(
        (status = 200, description = "Updated", body = LossResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_loss(
    State(state): State<LossesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<LossResponse>>> {
    require_permission(&auth, "losses:edit")?;
    let id = parse_id(&id)?;
    let req: UpdateLossRequest = validate::decode(body)?;
    let patch = validate_update(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.update(&actor, id, patch).await?;

    Ok(Json(ApiResponse::with_message(
        LossResponse::from(record),
        "Loss record updated",
    )))
}

/// Remove a loss record (soft delete)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "losses",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Removed"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_loss(
    State(state): State<LossesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>> {
    require_permission(&auth, "losses:delete")?;
    let id = parse_id(&id)?;

    let actor = AuditActor::new(&auth, &meta);
    state.service.remove(&actor, id).await?;

    Ok(Json(ApiResponse::with_message(None, "Loss record removed")))
}

pub fn losses_router(state: LossesState) -> Router {
    Router::new()
        .route("/", get(list_losses).post(create_loss))
        .route("/:id", get(get_loss).put(update_loss).delete(remove_loss))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_cost_computed_when_absent() {
        let req = CreateLossRequest {
            product: Some("Pão Francês".to_string()),
            sector: Some("Pães".to_string()),
            loss_type: Some("Massa".to_string()),
            quantity: Some(10.0),
            unit: Some("kg".to_string()),
            unit_cost: Some(2.5),
            total_cost: None,
            date: Some("2026-01-20".to_string()),
        };
        let input = validate_create(req).unwrap();
        assert_eq!(input.total_cost, 25.0);
        assert_eq!(input.loss_type, LossType::Massa);
    }

    #[test]
    fn test_negative_unit_cost_rejected() {
        let req = CreateLossRequest {
            product: Some("Pão Francês".to_string()),
            sector: Some("Pães".to_string()),
            loss_type: Some("Massa".to_string()),
            quantity: Some(10.0),
            unit: Some("kg".to_string()),
            unit_cost: Some(-2.5),
            total_cost: None,
            date: Some("2026-01-20".to_string()),
        };
        assert!(validate_create(req).is_err());
    }
}
