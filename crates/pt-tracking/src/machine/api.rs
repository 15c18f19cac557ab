//! Machines API
//!
//! REST endpoints for machines, mounted at `/api/machines`.

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
use crate::machine::entity::{Machine, MachinePatch, NewMachine};
use crate::machine::repository::MachineRepository;
use crate::shared::api_common::{parse_id, ApiResponse, ListResponse, PaginationParams};
use crate::shared::authorization::require_permission;
use crate::shared::canon::{MachineStatus, Sector};
use crate::shared::error::Result;
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::record::RecordService;
use crate::shared::validate::{self, Violations};

/// Create machine request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateMachineRequest {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
}

/// Update machine request (partial)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateMachineRequest {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
}

/// Machine response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineResponse {
    pub id: i64,
    pub name: String,
    pub sector: String,
    pub status: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Machine> for MachineResponse {
    fn from(r: Machine) -> Self {
        Self {
            id: r.id,
            name: r.name,
            sector: r.sector.as_str().to_string(),
            status: r.status.as_str().to_string(),
            description: r.description,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

fn validate_create(req: CreateMachineRequest) -> Result<NewMachine> {
    let mut v = Violations::new();
    let name = validate::required_text(&mut v, "name", req.name.as_deref(), 1, 120);
    let sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    let status = validate::optional_enum(&mut v, "status", req.status.as_deref(), MachineStatus::from_input);
    let description = validate::optional_text(&mut v, "description", req.description.as_deref(), 500);
    v.finish()?;

    Ok(NewMachine {
        name: name.unwrap(),
        sector: sector.unwrap(),
        status: status.unwrap_or(MachineStatus::Operando),
        description,
    })
}

fn validate_update(req: UpdateMachineRequest) -> Result<MachinePatch> {
    let mut v = Violations::new();
    let mut patch = MachinePatch::default();

    if req.name.is_some() {
        patch.name = validate::required_text(&mut v, "name", req.name.as_deref(), 1, 120);
    }
    if req.sector.is_some() {
        patch.sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    }
    if req.status.is_some() {
        patch.status =
            validate::required_enum(&mut v, "status", req.status.as_deref(), MachineStatus::from_input);
    }
    if req.description.is_some() {
        patch.description = Some(validate::optional_text(
            &mut v,
            "description",
            req.description.as_deref(),
            500,
        ));
    }

    v.finish()?;
    Ok(patch)
}

/// Machines service state
#[derive(Clone)]
pub struct MachinesState {
    pub service: Arc<RecordService<MachineRepository>>,
}

/// List machines
#[utoipa::path(
    get,
    path = "",
    tag = "machines",
    params(PaginationParams),
    responses((status = 200, description = "Page of machines", body = [MachineResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_machines(
    State(state): State<MachinesState>,
    _auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ListResponse<MachineResponse>>> {
    let (records, meta) = state.service.list(&pagination).await?;
    Ok(Json(ListResponse::new(
        records.into_iter().map(Into::into).collect(),
        meta,
    )))
}

/// Get one machine
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "machines",
    params(("id" = String, Path, description = "Machine id")),
    responses(
        (status = 200, description = "Machine", body = MachineResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_machine(
    State(state): State<MachinesState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MachineResponse>>> {
    let id = parse_id(&id)?;
    let record = state.service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// Create a machine
#[utoipa::path(
    post,
    path = "",
    tag = "machines",
    request_body = CreateMachineRequest,
    responses(
        (status = 201, description = "Created", body = MachineResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_machine(
    State(state): State<MachinesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_permission(&auth, "machines:create")?;
    let req: CreateMachineRequest = validate::decode(body)?;
    let input = validate_create(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.create(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            MachineResponse::from(record),
            "Machine created",
        )),
    ))
}

/// Update a machine
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "machines",
    params(("id" = String, Path, description = "Machine id")),
    request_body = UpdateMachineRequest,
    responses(
        (status = 200, description = "Updated", body = MachineResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_machine(
    State(state): State<MachinesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<MachineResponse>>> {
    require_permission(&auth, "machines:edit")?;
    let id = parse_id(&id)?;
    let req: UpdateMachineRequest = validate::decode(body)?;
    let patch = validate_update(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.update(&actor, id, patch).await?;

    Ok(Json(ApiResponse::with_message(
        MachineResponse::from(record),
        "Machine updated",
    )))
}

/// Remove a machine (soft delete)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "machines",
    params(("id" = String, Path, description = "Machine id")),
    responses(
        (status = 200, description = "Removed"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_machine(
    State(state): State<MachinesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>> {
    require_permission(&auth, "machines:delete")?;
    let id = parse_id(&id)?;

    let actor = AuditActor::new(&auth, &meta);
    state.service.remove(&actor, id).await?;

    Ok(Json(ApiResponse::with_message(None, "Machine removed")))
}

pub fn machines_router(state: MachinesState) -> Router {
    Router::new()
        .route("/", get(list_machines).post(create_machine))
        .route(
            "/:id",
            get(get_machine).put(update_machine).delete(remove_machine),
        )
        .with_state(state)
}
