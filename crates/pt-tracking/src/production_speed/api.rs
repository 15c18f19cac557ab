//! Production Speed API
//!
//! REST endpoints for production rate records, mounted at
//! `/api/production-speed`.

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
use crate::production_speed::entity::{NewSpeed, SpeedPatch, SpeedRecord};
use crate::production_speed::repository::SpeedRepository;
use crate::shared::api_common::{parse_id, ApiResponse, ListResponse, PaginationParams};
use crate::shared::authorization::require_permission;
use crate::shared::canon::{Sector, Shift};
use crate::shared::error::Result;
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::record::RecordService;
use crate::shared::validate::{self, Violations};

/// Create speed request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateSpeedRequest {
    pub product: Option<String>,
    pub sector: Option<String>,
    pub date: Option<String>,
    pub units_per_hour: Option<f64>,
    pub shift: Option<String>,
}

/// Update speed request (partial)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateSpeedRequest {
    pub product: Option<String>,
    pub sector: Option<String>,
    pub date: Option<String>,
    pub units_per_hour: Option<f64>,
    pub shift: Option<String>,
}

/// Speed response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpeedResponse {
    pub id: i64,
    pub product: String,
    pub sector: String,
    pub date: String,
    pub units_per_hour: f64,
    pub shift: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SpeedRecord> for SpeedResponse {
    fn from(r: SpeedRecord) -> Self {
        Self {
            id: r.id,
            product: r.product,
            sector: r.sector.as_str().to_string(),
            date: r.date.to_string(),
            units_per_hour: r.units_per_hour,
            shift: r.shift.map(|s| s.as_str().to_string()),
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

fn validate_create(req: CreateSpeedRequest) -> Result<NewSpeed> {
    let mut v = Violations::new();
    let product = validate::required_text(&mut v, "product", req.product.as_deref(), 1, 120);
    let sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    let date = validate::required_date(&mut v, "date", req.date.as_deref());
    let units_per_hour = validate::required_positive_f64(&mut v, "unitsPerHour", req.units_per_hour);
    let shift = validate::optional_enum(&mut v, "shift", req.shift.as_deref(), Shift::from_input);
    v.finish()?;

    Ok(NewSpeed {
        product: product.unwrap(),
        sector: sector.unwrap(),
        date: date.unwrap(),
        units_per_hour: units_per_hour.unwrap(),
        shift,
    })
}

fn validate_update(req: UpdateSpeedRequest) -> Result<SpeedPatch> {
    let mut v = Violations::new();
    let mut patch = SpeedPatch::default();

    if req.product.is_some() {
        patch.product = validate::required_text(&mut v, "product", req.product.as_deref(), 1, 120);
    }
    if req.sector.is_some() {
        patch.sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    }
    if req.date.is_some() {
        patch.date = validate::required_date(&mut v, "date", req.date.as_deref());
    }
    if req.units_per_hour.is_some() {
        patch.units_per_hour =
            validate::required_positive_f64(&mut v, "unitsPerHour", req.units_per_hour);
    }
    if req.shift.is_some() {
        // Empty string clears the field
        patch.shift = Some(validate::optional_enum(
            &mut v,
            "shift",
            req.shift.as_deref(),
            Shift::from_input,
        ));
    }

    v.finish()?;
    Ok(patch)
}

/// Production speed service state
#[derive(Clone)]
pub struct ProductionSpeedState {
    pub service: Arc<RecordService<SpeedRepository>>,
}

/// List speed records
#[utoipa::path(
    get,
    path = "",
    tag = "production-speed",
    params(PaginationParams),
    responses((status = 200, description = "Page of speed records", body = [SpeedResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_speeds(
    State(state): State<ProductionSpeedState>,
    _auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ListResponse<SpeedResponse>>> {
    let (records, meta) = state.service.list(&pagination).await?;
    Ok(Json(ListResponse::new(
        records.into_iter().map(Into::into).collect(),
        meta,
    )))
}

/// Get one speed record
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "production-speed",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Speed record", body = SpeedResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_speed(
    State(state): State<ProductionSpeedState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SpeedResponse>>> {
    let id = parse_id(&id)?;
    let record = state.service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// Create a speed record
#[utoipa::path(
    post,
    path = "",
    tag = "production-speed",
    request_body = CreateSpeedRequest,
    responses(
        (status = 201, description = "Created", body = SpeedResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_speed(
    State(state): State<ProductionSpeedState>,
    auth: Authenticated,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_permission(&auth, "production-speed:create")?;
    let req: CreateSpeedRequest = validate::decode(body)?;
    let input = validate_create(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.create(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            SpeedResponse::from(record),
            "Speed record created",
        )),
    ))
}

/// Update a speed record
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "production-speed",
    params(("id" = String, Path, description = "Record id")),
    request_body = UpdateSpeedRequest,
    responses(
        (status = 200, description = "Updated", body = SpeedResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_speed(
    State(state): State<ProductionSpeedState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<SpeedResponse>>> {
    require_permission(&auth, "production-speed:edit")?;
    let id = parse_id(&id)?;
    let req: UpdateSpeedRequest = validate::decode(body)?;
    let patch = validate_update(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.update(&actor, id, patch).await?;

    Ok(Json(ApiResponse::with_message(
        SpeedResponse::from(record),
        "Speed record updated",
    )))
}

/// Remove a speed record (soft delete)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "production-speed",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Removed"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_speed(
    State(state): State<ProductionSpeedState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>> {
    require_permission(&auth, "production-speed:delete")?;
    let id = parse_id(&id)?;

    let actor = AuditActor::new(&auth, &meta);
    state.service.remove(&actor, id).await?;

    Ok(Json(ApiResponse::with_message(None, "Speed record removed")))
}

pub fn production_speed_router(state: ProductionSpeedState) -> Router {
    Router::new()
        .route("/", get(list_speeds).post(create_speed))
        .route("/:id", get(get_speed).put(update_speed).delete(remove_speed))
        .with_state(state)
}
