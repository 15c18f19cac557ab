//! Maintenance API
//!
//! REST endpoints for maintenance records, mounted at `/api/maintenance`.

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
use crate::maintenance::entity::{MaintenancePatch, MaintenanceRecord, NewMaintenance};
use crate::maintenance::repository::MaintenanceRepository;
use crate::shared::api_common::{parse_id, ApiResponse, ListResponse, PaginationParams};
use crate::shared::authorization::require_permission;
use crate::shared::canon::{MaintenanceType, Sector};
use crate::shared::error::Result;
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::record::RecordService;
use crate::shared::validate::{self, Violations};

/// Create maintenance request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateMaintenanceRequest {
    pub machine_name: Option<String>,
    pub sector: Option<String>,
    pub date: Option<String>,
    pub maintenance_type: Option<String>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub downtime_hours: Option<f64>,
}

/// Update maintenance request (partial)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateMaintenanceRequest {
    pub machine_name: Option<String>,
    pub sector: Option<String>,
    pub date: Option<String>,
    pub maintenance_type: Option<String>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub downtime_hours: Option<f64>,
}

/// Maintenance response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceResponse {
    pub id: i64,
    pub machine_name: String,
    pub sector: String,
    pub date: String,
    pub maintenance_type: String,
    pub description: Option<String>,
    pub cost: f64,
    pub downtime_hours: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MaintenanceRecord> for MaintenanceResponse {
    fn from(r: MaintenanceRecord) -> Self {
        Self {
            id: r.id,
            machine_name: r.machine_name,
            sector: r.sector.as_str().to_string(),
            date: r.date.to_string(),
            maintenance_type: r.maintenance_type.as_str().to_string(),
            description: r.description,
            cost: r.cost,
            downtime_hours: r.downtime_hours,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

fn validate_create(req: CreateMaintenanceRequest) -> Result<NewMaintenance> {
    let mut v = Violations::new();
    let machine_name = validate::required_text(&mut v, "machineName", req.machine_name.as_deref(), 1, 120);
    let sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    let date = validate::required_date(&mut v, "date", req.date.as_deref());
    let maintenance_type = validate::required_enum(
        &mut v,
        "maintenanceType",
        req.maintenance_type.as_deref(),
        MaintenanceType::from_input,
    );
    let description = validate::optional_text(&mut v, "description", req.description.as_deref(), 500);
    let cost = validate::required_nonnegative_f64(&mut v, "cost", req.cost);
    let downtime_hours = validate::optional_nonnegative_f64(&mut v, "downtimeHours", req.downtime_hours);
    v.finish()?;

    Ok(NewMaintenance {
        machine_name: machine_name.unwrap(),
        sector: sector.unwrap(),
        date: date.unwrap(),
        maintenance_type: maintenance_type.unwrap(),
        description,
        cost: cost.unwrap(),
        downtime_hours: downtime_hours.unwrap_or(0.0),
    })
}

fn validate_update(req: UpdateMaintenanceRequest) -> Result<MaintenancePatch> {
    let mut v = Violations::new();
    let mut patch = MaintenancePatch::default();

    if req.machine_name.is_some() {
        patch.machine_name =
            validate::required_text(&mut v, "machineName", req.machine_name.as_deref(), 1, 120);
    }
    if req.sector.is_some() {
        patch.sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    }
    if req.date.is_some() {
        patch.date = validate::required_date(&mut v, "date", req.date.as_deref());
    }
    if req.maintenance_type.is_some() {
        patch.maintenance_type = validate::required_enum(
            &mut v,
            "maintenanceType",
            req.maintenance_type.as_deref(),
            MaintenanceType::from_input,
        );
    }
    if req.description.is_some() {
        patch.description = Some(validate::optional_text(
            &mut v,
            "description",
            req.description.as_deref(),
            500,
        ));
    }
    if req.cost.is_some() {
        patch.cost = validate::required_nonnegative_f64(&mut v, "cost", req.cost);
    }
    if req.downtime_hours.is_some() {
        patch.downtime_hours =
            validate::required_nonnegative_f64(&mut v, "downtimeHours", req.downtime_hours);
    }

    v.finish()?;
    Ok(patch)
}

/// Maintenance service state
#[derive(Clone)]
pub struct MaintenanceState {
    pub service: Arc<RecordService<MaintenanceRepository>>,
}

/// List maintenance records
#[utoipa::path(
    get,
    path = "",
    tag = "maintenance",
    params(PaginationParams),
    responses((status = 200, description = "Page of maintenance records", body = [MaintenanceResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_maintenance(
    State(state): State<MaintenanceState>,
    _auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ListResponse<MaintenanceResponse>>> {
    let (records, meta) = state.service.list(&pagination).await?;
    Ok(Json(ListResponse::new(
        records.into_iter().map(Into::into).collect(),
        meta,
    )))
}

/// Get one maintenance record
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "maintenance",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Maintenance record", body = MaintenanceResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_maintenance(
    State(state): State<MaintenanceState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MaintenanceResponse>>> {
    let id = parse_id(&id)?;
    let record = state.service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// Create a maintenance record
#[utoipa::path(
    post,
    path = "",
    tag = "maintenance",
    request_body = CreateMaintenanceRequest,
    responses(
        (status = 201, description = "Created", body = MaintenanceResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_maintenance(
    State(state): State<MaintenanceState>,
    auth: Authenticated,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_permission(&auth, "maintenance:create")?;
    let req: CreateMaintenanceRequest = validate::decode(body)?;
    let input = validate_create(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.create(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            MaintenanceResponse::from(record),
            "Maintenance record created",
        )),
    ))
}

/// Update a maintenance record
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "maintenance",
    params(("id" = String, Path, description = "Record id")),
    request_body = UpdateMaintenanceRequest,
    responses(
        (status = 200, description = "Updated", body = MaintenanceResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_maintenance(
    State(state): State<MaintenanceState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<MaintenanceResponse>>> {
    require_permission(&auth, "maintenance:edit")?;
    let id = parse_id(&id)?;
    let req: UpdateMaintenanceRequest = validate::decode(body)?;
    let patch = validate_update(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.update(&actor, id, patch).await?;

    Ok(Json(ApiResponse::with_message(
        MaintenanceResponse::from(record),
        "Maintenance record updated",
    )))
}

/// Remove a maintenance record (soft delete)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "maintenance",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Removed"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_maintenance(
    State(state): State<MaintenanceState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>> {
    require_permission(&auth, "maintenance:delete")?;
    let id = parse_id(&id)?;

    let actor = AuditActor::new(&auth, &meta);
    state.service.remove(&actor, id).await?;

    Ok(Json(ApiResponse::with_message(
        None,
        "Maintenance record removed",
    )))
}

pub fn maintenance_router(state: MaintenanceState) -> Router {
    Router::new()
        .route("/", get(list_maintenance).post(create_maintenance))
        .route(
            "/:id",
            get(get_maintenance)
                .put(update_maintenance)
                .delete(remove_maintenance),
        )
        .with_state(state)
}
