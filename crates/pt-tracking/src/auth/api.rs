//! Auth API Endpoints
//!
//! - POST /api/auth/register - Account registration
//! - POST /api/auth/login - Password-based login
//! - GET /api/auth/me - Current user info

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::audit::entity::AuditAction;
use crate::audit::service::{AuditActor, AuditRecorder};
use crate::auth::password::PasswordService;
use crate::auth::service::AuthService;
use crate::shared::api_common::ApiResponse;
use crate::shared::authorization::permissions;
use crate::shared::canon::Role;
use crate::shared::error::{Result, TrackingError};
use crate::shared::middleware::{Authenticated, RequestMeta};
use crate::shared::rate_limit::RateLimitLayer;
use crate::shared::validate::{self, Violations};
use crate::user::entity::{NewUser, User};
use crate::user::repository::UserRepository;

/// Registration request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Honored only when the caller is an authenticated ADMIN;
    /// self-registration always yields ESPECTADOR.
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User payload returned by auth endpoints
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

/// Login response: access token plus the authenticated user
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Auth service state
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: Arc<AuthService>,
    pub password_service: Arc<PasswordService>,
    pub user_repo: Arc<UserRepository>,
    pub audit: AuditRecorder,
}

fn validate_register(req: RegisterRequest, caller: Option<&Authenticated>) -> Result<(String, String, String, Role)> {
    let mut v = Violations::new();
    let name = validate::required_text(&mut v, "name", req.name.as_deref(), 1, 120);
    let mut email = validate::required_text(&mut v, "email", req.email.as_deref(), 3, 254)
        .map(|e| e.to_lowercase());
    if let Some(ref e) = email {
        if !e.contains('@') {
            v.add("email", "email must be a valid address");
            email = None;
        }
    }
    let password = match req.password {
        Some(ref p) if !p.is_empty() => Some(p.clone()),
        _ => {
            v.add("password", "password is required");
            None
        }
    };

    // Role elevation is an admin-only operation
    let role = match req.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => {
            let can_manage = caller
                .map(|c| c.has_permission(permissions::USERS_MANAGE))
                .unwrap_or(false);
            if !can_manage {
                return Err(TrackingError::forbidden("Only an ADMIN can assign roles"));
            }
            match Role::from_input(raw) {
                Some(role) => role,
                None => {
                    v.add("role", format!("role has unknown value: {}", raw));
                    Role::Espectador
                }
            }
        }
        None => Role::Espectador,
    };

    v.finish()?;
    Ok((name.unwrap(), email.unwrap(), password.unwrap(), role))
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AuthApiState>,
    caller: Option<Authenticated>,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse> {
    let req: RegisterRequest = validate::decode(body)?;
    let (name, email, password, role) = validate_register(req, caller.as_ref())?;

    state.password_service.validate_password(&password)?;

    if state.user_repo.find_by_email(&email).await?.is_some() {
        return Err(TrackingError::duplicate("User", "email", email));
    }

    let password_hash = state.password_service.hash_password(&password)?;
    let user = state
        .user_repo
        .insert(&NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await?;

    let actor = AuditActor {
        user_id: caller.as_ref().map(|c| c.user_id),
        ip_address: meta.ip_address,
        user_agent: meta.user_agent,
    };
    state
        .audit
        .record(
            &actor,
            AuditAction::CreateRecord,
            "User",
            user.id,
            serde_json::json!({
                "name": user.name,
                "email": user.email,
                "role": user.role.as_str(),
            }),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            UserResponse::from(&user),
            "Account created",
        )),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthApiState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let req: LoginRequest = validate::decode(body)?;

    let mut v = Violations::new();
    let email = validate::required_text(&mut v, "email", req.email.as_deref(), 1, 254)
        .map(|e| e.to_lowercase());
    let password = req.password.clone().filter(|p| !p.is_empty());
    if password.is_none() {
        v.add("password", "password is required");
    }
    v.finish()?;

    let user = state
        .user_repo
        .find_by_email(&email.unwrap())
        .await?
        .ok_or(TrackingError::InvalidCredentials)?;

    let verified = state
        .password_service
        .verify_password(&password.unwrap(), &user.password_hash)?;
    if !verified {
        return Err(TrackingError::InvalidCredentials);
    }

    let token = state.auth_service.issue_token(&user)?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token,
        user: UserResponse::from(&user),
    })))
}

/// Get the current authenticated user
#[utoipa::path(
    get,
    path = "/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AuthApiState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let user = state
        .user_repo
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| TrackingError::unauthorized("Account no longer exists"))?;

    Ok(Json(ApiResponse::ok(UserResponse::from(&user))))
}

/// Create the auth router. Login and registration each carry their own
/// stricter per-IP rate-limit window.
pub fn auth_router(state: AuthApiState, limits: &pt_common::RateLimitConfig) -> Router {
    Router::new()
        .route(
            "/register",
            post(register).layer(RateLimitLayer::per_minute(
                limits.register_per_minute,
                "register",
            )),
        )
        .route(
            "/login",
            post(login).layer(RateLimitLayer::per_minute(limits.login_per_minute, "login")),
        )
        .route("/me", get(me))
        .with_state(state)
}
