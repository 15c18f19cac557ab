//! Production Errors API
//!
//! REST endpoints for error records, mounted at `/api/errors`.

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
use crate::production_error::entity::{ErrorPatch, ErrorRecord, NewError};
use crate::production_error::repository::ErrorRepository;
use crate::shared::api_common::{parse_id, ApiResponse, ListResponse, PaginationParams};
use crate::shared::authorization::require_permission;
use crate::shared::canon::{ErrorCategory, Sector};
use crate::shared::error::Result;
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::record::RecordService;
use crate::shared::validate::{self, Violations};

/// Create error request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateErrorRequest {
    pub product: Option<String>,
    pub sector: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub date: Option<String>,
}

/// Update error request (partial)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateErrorRequest {
    pub product: Option<String>,
    pub sector: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub date: Option<String>,
}

/// Error response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecordResponse {
    pub id: i64,
    pub product: String,
    pub sector: String,
    pub category: String,
    pub description: Option<String>,
    pub cost: f64,
    pub date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ErrorRecord> for ErrorRecordResponse {
    fn from(r: ErrorRecord) -> Self {
        Self {
            id: r.id,
            product: r.product,
            sector: r.sector.as_str().to_string(),
            category: r.category.as_str().to_string(),
            description: r.description,
            cost: r.cost,
            date: r.date.to_string(),
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

fn validate_create(req: CreateErrorRequest) -> Result<NewError> {
    let mut v = Violations::new();
    let product = validate::required_text(&mut v, "product", req.product.as_deref(), 1, 120);
    let sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    let category =
        validate::required_enum(&mut v, "category", req.category.as_deref(), ErrorCategory::from_input);
    let description = validate::optional_text(&mut v, "description", req.description.as_deref(), 500);
    let cost = validate::required_nonnegative_f64(&mut v, "cost", req.cost);
    let date = validate::required_date(&mut v, "date", req.date.as_deref());
    v.finish()?;

    Ok(NewError {
        product: product.unwrap(),
        sector: sector.unwrap(),
        category: category.unwrap(),
        description,
        cost: cost.unwrap(),
        date: date.unwrap(),
    })
}

fn validate_update(req: UpdateErrorRequest) -> Result<ErrorPatch> {
    let mut v = Violations::new();
    let mut patch = ErrorPatch::default();

    if req.product.is_some() {
        patch.product = validate::required_text(&mut v, "product", req.product.as_deref(), 1, 120);
    }
    if req.sector.is_some() {
        patch.sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    }
    if req.category.is_some() {
        patch.category =
            validate::required_enum(&mut v, "category", req.category.as_deref(), ErrorCategory::from_input);
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
    if req.date.is_some() {
        patch.date = validate::required_date(&mut v, "date", req.date.as_deref());
    }

    v.finish()?;
    Ok(patch)
}

/// Errors service state
#[derive(Clone)]
pub struct ErrorsState {
    pub service: Arc<RecordService<ErrorRepository>>,
}

/// List error records
#[utoipa::path(
    get,
    path = "",
    tag = "errors",
    params(PaginationParams),
    responses((status = 200, description = "Page of error records", body = [ErrorRecordResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_errors(
    State(state): State<ErrorsState>,
    _auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ListResponse<ErrorRecordResponse>>> {
    let (records, meta) = state.service.list(&pagination).await?;
    Ok(Json(ListResponse::new(
        records.into_iter().map(Into::into).collect(),
        meta,
    )))
}

/// Get one error record
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "errors",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Error record", body = ErrorRecordResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_error(
    State(state): State<ErrorsState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ErrorRecordResponse>>> {
    let id = parse_id(&id)?;
    let record = state.service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// Create an error record
#[utoipa::path(
    post,
    path = "",
    tag = "errors",
    request_body = CreateErrorRequest,
    responses(
        (status = 201, description = "Created", body = ErrorRecordResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_error(
    State(state): State<ErrorsState>,
    auth: Authenticated,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_permission(&auth, "errors:create")?;
    let req: CreateErrorRequest = validate::decode(body)?;
    let input = validate_create(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.create(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            ErrorRecordResponse::from(record),
            "Error record created",
        )),
    ))
}

/// Update an error record
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "errors",
    params(("id" = String, Path, description = "Record id")),
    request_body = UpdateErrorRequest,
    responses(
        (status = 200, description = "Updated", body = ErrorRecordResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_error(
    State(state): State<ErrorsState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<ErrorRecordResponse>>> {
    require_permission(&auth, "errors:edit")?;
    let id = parse_id(&id)?;
    let req: UpdateErrorRequest = validate::decode(body)?;
    let patch = validate_update(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.update(&actor, id, patch).await?;

    Ok(Json(ApiResponse::with_message(
        ErrorRecordResponse::from(record),
        "Error record updated",
    )))
}

/// Remove an error record (hard delete)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "errors",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Removed"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_error(
    State(state): State<ErrorsState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>> {
    require_permission(&auth, "errors:delete")?;
    let id = parse_id(&id)?;

    let actor = AuditActor::new(&auth, &meta);
    state.service.remove(&actor, id).await?;

    Ok(Json(ApiResponse::with_message(None, "Error record removed")))
}

pub fn errors_router(state: ErrorsState) -> Router {
    Router::new()
        .route("/", get(list_errors).post(create_error))
        .route("/:id", get(get_error).put(update_error).delete(remove_error))
        .with_state(state)
}
