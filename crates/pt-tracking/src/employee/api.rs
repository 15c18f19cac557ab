//! Employees API
//!
//! REST endpoints for employees, mounted at `/api/employees`.

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
use crate::employee::entity::{Employee, EmployeePatch, NewEmployee};
use crate::employee::repository::EmployeeRepository;
use crate::shared::api_common::{parse_id, ApiResponse, ListResponse, PaginationParams};
use crate::shared::authorization::require_permission;
use crate::shared::canon::Sector;
use crate::shared::error::Result;
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::record::RecordService;
use crate::shared::validate::{self, Violations};

/// Create employee request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub position: Option<String>,
    pub hired_at: Option<String>,
}

/// Update employee request (partial)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub position: Option<String>,
    pub hired_at: Option<String>,
}

/// Employee response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeResponse {
    pub id: i64,
    pub name: String,
    pub sector: String,
    pub position: String,
    pub hired_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Employee> for EmployeeResponse {
    fn from(r: Employee) -> Self {
        Self {
            id: r.id,
            name: r.name,
            sector: r.sector.as_str().to_string(),
            position: r.position,
            hired_at: r.hired_at.map(|d| d.to_string()),
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

fn validate_create(req: CreateEmployeeRequest) -> Result<NewEmployee> {
    let mut v = Violations::new();
    let name = validate::required_text(&mut v, "name", req.name.as_deref(), 1, 120);
    let sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    let position = validate::required_text(&mut v, "position", req.position.as_deref(), 1, 80);
    let hired_at = validate::optional_date(&mut v, "hiredAt", req.hired_at.as_deref());
    v.finish()?;

    Ok(NewEmployee {
        name: name.unwrap(),
        sector: sector.unwrap(),
        position: position.unwrap(),
        hired_at,
    })
}

fn validate_update(req: UpdateEmployeeRequest) -> Result<EmployeePatch> {
    let mut v = Violations::new();
    let mut patch = EmployeePatch::default();

    if req.name.is_some() {
        patch.name = validate::required_text(&mut v, "name", req.name.as_deref(), 1, 120);
    }
    if req.sector.is_some() {
        patch.sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    }
    if req.position.is_some() {
        patch.position = validate::required_text(&mut v, "position", req.position.as_deref(), 1, 80);
    }
    if req.hired_at.is_some() {
        // Empty string clears the field
        patch.hired_at = Some(validate::optional_date(&mut v, "hiredAt", req.hired_at.as_deref()));
    }

    v.finish()?;
    Ok(patch)
}

/// Employees service state
#[derive(Clone)]
pub struct EmployeesState {
    pub service: Arc<RecordService<EmployeeRepository>>,
}

/// List employees
#[utoipa::path(
    get,
    path = "",
    tag = "employees",
    params(PaginationParams),
    responses((status = 200, description = "Page of employees", body = [EmployeeResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    State(state): State<EmployeesState>,
    _auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ListResponse<EmployeeResponse>>> {
    let (records, meta) = state.service.list(&pagination).await?;
    Ok(Json(ListResponse::new(
        records.into_iter().map(Into::into).collect(),
        meta,
    )))
}

/// Get one employee
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "employees",
    params(("id" = String, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee", body = EmployeeResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    State(state): State<EmployeesState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<EmployeeResponse>>> {
    let id = parse_id(&id)?;
    let record = state.service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// Create an employee
#[utoipa::path(
    post,
    path = "",
    tag = "employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Created", body = EmployeeResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    State(state): State<EmployeesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_permission(&auth, "employees:create")?;
    let req: CreateEmployeeRequest = validate::decode(body)?;
    let input = validate_create(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.create(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            EmployeeResponse::from(record),
            "Employee created",
        )),
    ))
}

/// Update an employee
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "employees",
    params(("id" = String, Path, description = "Employee id")),
    request_body = UpdateEmployeeRequest,
    responses(
        (status = 200, description = "Updated", body = EmployeeResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    State(state): State<EmployeesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<EmployeeResponse>>> {
    require_permission(&auth, "employees:edit")?;
    let id = parse_id(&id)?;
    let req: UpdateEmployeeRequest = validate::decode(body)?;
    let patch = validate_update(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.update(&actor, id, patch).await?;

    Ok(Json(ApiResponse::with_message(
        EmployeeResponse::from(record),
        "Employee updated",
    )))
}

/// Remove an employee (soft delete)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "employees",
    params(("id" = String, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Removed"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_employee(
    State(state): State<EmployeesState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>> {
    require_permission(&auth, "employees:delete")?;
    let id = parse_id(&id)?;

    let actor = AuditActor::new(&auth, &meta);
    state.service.remove(&actor, id).await?;

    Ok(Json(ApiResponse::with_message(None, "Employee removed")))
}

pub fn employees_router(state: EmployeesState) -> Router {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/:id",
            get(get_employee)
                .put(update_employee)
                .delete(remove_employee),
        )
        .with_state(state)
}
