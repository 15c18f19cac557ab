//! Absenteeism API
//!
//! REST endpoints for absence records, mounted at `/api/absenteeism`.

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

use crate::absenteeism::entity::{AbsencePatch, AbsenceRecord, NewAbsence};
use crate::absenteeism::repository::AbsenceRepository;
use crate::audit::service::AuditActor;
use crate::shared::api_common::{parse_id, ApiResponse, ListResponse, PaginationParams};
use crate::shared::authorization::require_permission;
use crate::shared::canon::{AbsenceType, Sector};
use crate::shared::error::Result;
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::record::RecordService;
use crate::shared::validate::{self, Violations};

/// Create absence request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateAbsenceRequest {
    pub employee_name: Option<String>,
    pub sector: Option<String>,
    pub date: Option<String>,
    pub absence_type: Option<String>,
    pub days_absent: Option<i64>,
    pub notes: Option<String>,
}

/// Update absence request (partial)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateAbsenceRequest {
    pub employee_name: Option<String>,
    pub sector: Option<String>,
    pub date: Option<String>,
    pub absence_type: Option<String>,
    pub days_absent: Option<i64>,
    pub notes: Option<String>,
}

/// Absence response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceResponse {
    pub id: i64,
    pub employee_name: String,
    pub sector: String,
    pub date: String,
    pub absence_type: String,
    pub days_absent: i64,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AbsenceRecord> for AbsenceResponse {
    fn from(r: AbsenceRecord) -> Self {
        Self {
            id: r.id,
            employee_name: r.employee_name,
            sector: r.sector.as_str().to_string(),
            date: r.date.to_string(),
            absence_type: r.absence_type.as_str().to_string(),
            days_absent: r.days_absent,
            notes: r.notes,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}

fn validate_create(req: CreateAbsenceRequest) -> Result<NewAbsence> {
    let mut v = Violations::new();
    let employee_name = validate::required_text(&mut v, "employeeName", req.employee_name.as_deref(), 1, 120);
    let sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    let date = validate::required_date(&mut v, "date", req.date.as_deref());
    let absence_type =
        validate::required_enum(&mut v, "absenceType", req.absence_type.as_deref(), AbsenceType::from_input);
    let days_absent = validate::required_positive_int(&mut v, "daysAbsent", req.days_absent);
    let notes = validate::optional_text(&mut v, "notes", req.notes.as_deref(), 500);
    v.finish()?;

    Ok(NewAbsence {
        employee_name: employee_name.unwrap(),
        sector: sector.unwrap(),
        date: date.unwrap(),
        absence_type: absence_type.unwrap(),
        days_absent: days_absent.unwrap(),
        notes,
    })
}

fn validate_update(req: UpdateAbsenceRequest) -> Result<AbsencePatch> {
    let mut v = Violations::new();
    let mut patch = AbsencePatch::default();

    if let Some(ref name) = req.employee_name {
        patch.employee_name = validate::required_text(&mut v, "employeeName", Some(name), 1, 120);
    }
    if req.sector.is_some() {
        patch.sector = validate::required_enum(&mut v, "sector", req.sector.as_deref(), Sector::from_input);
    }
    if req.date.is_some() {
        patch.date = validate::required_date(&mut v, "date", req.date.as_deref());
    }
    if req.absence_type.is_some() {
        patch.absence_type =
            validate::required_enum(&mut v, "absenceType", req.absence_type.as_deref(), AbsenceType::from_input);
    }
    if req.days_absent.is_some() {
        patch.days_absent = validate::required_positive_int(&mut v, "daysAbsent", req.days_absent);
    }
    if req.notes.is_some() {
        // Empty string clears the field
        patch.notes = Some(validate::optional_text(&mut v, "notes", req.notes.as_deref(), 500));
    }

    v.finish()?;
    Ok(patch)
}

/// Absenteeism service state
#[derive(Clone)]
pub struct AbsenteeismState {
    pub service: Arc<RecordService<AbsenceRepository>>,
}

/// List absence records
#[utoipa::path(
    get,
    path = "",
    tag = "absenteeism",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of absence records", body = [AbsenceResponse])
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_absences(
    State(state): State<AbsenteeismState>,
    _auth: Authenticated,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ListResponse<AbsenceResponse>>> {
    let (records, meta) = state.service.list(&pagination).await?;
    Ok(Json(ListResponse::new(
        records.into_iter().map(Into::into).collect(),
        meta,
    )))
}

/// Get one absence record
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "absenteeism",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Absence record", body = AbsenceResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_absence(
    State(state): State<AbsenteeismState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AbsenceResponse>>> {
    let id = parse_id(&id)?;
    let record = state.service.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(record.into())))
}

/// Create an absence record
#[utoipa::path(
    post,
    path = "",
    tag = "absenteeism",
    request_body = CreateAbsenceRequest,
    responses(
        (status = 201, description = "Created", body = AbsenceResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Missing permission")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_absence(
    State(state): State<AbsenteeismState>,
    auth: Authenticated,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    require_permission(&auth, "absenteeism:create")?;
    let req: CreateAbsenceRequest = validate::decode(body)?;
    let input = validate_create(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.create(&actor, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            AbsenceResponse::from(record),
            "Absence record created",
        )),
    ))
}

/// Update an absence record
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "absenteeism",
    params(("id" = String, Path, description = "Record id")),
    request_body = UpdateAbsenceRequest,
    responses(
        (status = 200, description = "Updated", body = AbsenceResponse),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_absence(
    State(state): State<AbsenteeismState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<AbsenceResponse>>> {
    require_permission(&auth, "absenteeism:edit")?;
    let id = parse_id(&id)?;
    let req: UpdateAbsenceRequest = validate::decode(body)?;
    let patch = validate_update(req)?;

    let actor = AuditActor::new(&auth, &meta);
    let record = state.service.update(&actor, id, patch).await?;

    Ok(Json(ApiResponse::with_message(
        AbsenceResponse::from(record),
        "Absence record updated",
    )))
}

/// Remove an absence record (soft delete)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "absenteeism",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Removed"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn remove_absence(
    State(state): State<AbsenteeismState>,
    auth: Authenticated,
    meta: RequestMeta,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Option<()>>>> {
    require_permission(&auth, "absenteeism:delete")?;
    let id = parse_id(&id)?;

    let actor = AuditActor::new(&auth, &meta);
    state.service.remove(&actor, id).await?;

    Ok(Json(ApiResponse::with_message(
        None,
        "Absence record removed",
    )))
}

pub fn absenteeism_router(state: AbsenteeismState) -> Router {
    Router::new()
        .route("/", get(list_absences).post(create_absence))
        .route(
            "/:id",
            get(get_absence).put(update_absence).delete(remove_absence),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_days_absent() {
        let req = CreateAbsenceRequest {
            employee_name: Some("João Pereira".to_string()),
            sector: Some("Pães".to_string()),
            date: Some("2026-02-10".to_string()),
            absence_type: Some("Atestado".to_string()),
            days_absent: None,
            notes: None,
        };
        let err = validate_create(req).unwrap_err();
        match err {
            crate::shared::error::TrackingError::Validation { details, .. } => {
                let text = details.unwrap().to_string();
                assert!(text.contains("daysAbsent"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_canonicalizes_labels() {
        let req = CreateAbsenceRequest {
            employee_name: Some("João Pereira".to_string()),
            sector: Some("Pães".to_string()),
            date: Some("2026-02-10T08:00:00Z".to_string()),
            absence_type: Some("Atestado Médico".to_string()),
            days_absent: Some(2),
            notes: Some("".to_string()),
        };
        let input = validate_create(req).unwrap();
        assert_eq!(input.sector, Sector::Paes);
        assert_eq!(input.absence_type, AbsenceType::Atestado);
        assert_eq!(input.date.to_string(), "2026-02-10");
        assert_eq!(input.notes, None);
    }

    #[test]
    fn test_update_accepts_partial() {
        let req = UpdateAbsenceRequest {
            employee_name: None,
            sector: None,
            date: None,
            absence_type: None,
            days_absent: Some(3),
            notes: Some("".to_string()),
        };
        let patch = validate_update(req).unwrap();
        assert_eq!(patch.days_absent, Some(3));
        assert_eq!(patch.notes, Some(None));
        assert!(patch.employee_name.is_none());
    }
}
