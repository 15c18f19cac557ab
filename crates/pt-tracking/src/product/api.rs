//! Products API
//!
//! REST endpoints for products, mounted at `/api/products`.

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
use crate::product::entity::{NewProduct, Product, ProductPatch};
use crate::product::repository::ProductRepository;
use crate::shared::api_common::{parse_id, ApiResponse, ListResponse, PaginationParams};
use crate::shared::authorization::require_permission;
use crate::shared::canon::Sector;
use crate::shared::error::Result;
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::record::RecordService;
use crate::shared::validate::{self, Violations};

/// Create product request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub unit: Option<String>,
}

/// Update product request (partial)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub unit: Option<String>,
}

/// Product response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub sector: String,
    pub unit: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(r: Product) -> Self {
        Self {
            id: r.id,
            name: r.name,
            sector: r.sector.as_str().to_string(),
            unit: r.unit,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

fn validate_create(req: CreateProductRequest) -> Result<NewProduct> {
    let mut v = Violations::new();
    let name = validate::required_text(&mut v, "name", req.name.as_deref(), 1, 120);
    let sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    let unit = validate::required_text(&mut v, "unit", req.unit.as_deref(), 1, 20);
    v.finish()?;

    Ok(NewProduct {
        name: name.unwrap(),
        sector: sector.unwrap(),
        unit: unit.unwrap(),
    })
}

fn validate_update(req: UpdateProductRequest) -> Result<ProductPatch> {
    let mut v = Violations::new();
    let mut patch = ProductPatch::default();

    if req.name.is_some() {
        patch.name = validate::required_text(&mut v, "name", req.name.as_deref(), 1, 120);
    }
    if req.sector.is_some() {
        patch.sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    }
    if req.unit.is_some() {
        patch.unit = validate::required_text(&mut v, "unit", req.unit.as_deref(), 1, 20);
    }

    v.finish()?;
    Ok(patch)
}

/// Products service state
#[derive(Clone)]
pub struct ProductsState {
    pub service: Arc<RecordService<ProductRepository>>,
}

/// List products
#[utoipa::path(
    get,
    path = "",
    tag = "products",
    params(PaginationParams),
    responses((status = 200, description = "Page of products", body = [ProductResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_products(
    State(state): State<ProductsState>,
    _auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ListResponse<ProductResponse>>> {
    let (records, meta) = state.service.list(&pagination).await?;
    Ok(Json(ListResponse::new(
        records.into_iter().map(Into::into).collect(),
        meta,
    )))
}

/// Get one product
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "products",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ProductResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_product(
    State(state): State<ProductsState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProductResponse>>> {
    let id = parse_id(&id)?;
    let record = state.service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// Create a product
#[utoipa::path(
    post,
    path = "",
    tag = "products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Created", body = ProductResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_product(
    State(state): State<ProductsState>,
    auth: Authenticated,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_permission(&auth, "products:create")?;
    let req: CreateProductRequest = validate::decode(body)?;
    let input = validate_create(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.create(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            ProductResponse::from(record),
            "Product created",
        )),
    ))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "products",
    params(("id" = String, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated", body = ProductResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_product(
    State(state): State<ProductsState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<ProductResponse>>> {
    require_permission(&auth, "products:edit")?;
    let id = parse_id(&id)?;
    let req: UpdateProductRequest = validate::decode(body)?;
    let patch = validate_update(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.update(&actor, id, patch).await?;

    Ok(Json(ApiResponse::with_message(
        ProductResponse::from(record),
        "Product updated",
    )))
}

/// Remove a product (soft delete)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "products",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Removed"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_product(
    State(state): State<ProductsState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>> {
    require_permission(&auth, "products:delete")?;
    let id = parse_id(&id)?;

    let actor = AuditActor::new(&auth, &meta);
    state.service.remove(&actor, id).await?;

    Ok(Json(ApiResponse::with_message(None, "Product removed")))
}

pub fn products_router(state: ProductsState) -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(remove_product),
        )
        .with_state(state)
}
