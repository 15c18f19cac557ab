//! ProdTrack
//!
//! Production-tracking back office for a food manufacturing plant:
//! - Tracked record types: absenteeism, losses, errors, production speed,
//!   machines, maintenance, employees, products
//! - Uniform record lifecycle (validate → persist → audit) with per-entity
//!   soft/hard delete policy
//! - Role-based authorization with a declarative policy table
//! - Append-only audit trail for every mutation
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access (the Record Store for that entity)
//! - `api` - REST endpoints

// Tracked record aggregates
pub mod absenteeism;
pub mod employee;
pub mod loss;
pub mod machine;
pub mod maintenance;
pub mod product;
pub mod production_error;
pub mod production_speed;

// Users, authentication & audit trail
pub mod audit;
pub mod auth;
pub mod user;

// Shared infrastructure
pub mod shared;

// Re-export common types from shared
pub use shared::canon::{
    AbsenceType, ErrorCategory, LossType, MachineStatus, MaintenanceType, Role, Sector, Shift,
};
pub use shared::error::{Result, TrackingError};
pub use shared::record::{DeletePolicy, RecordService, RecordStore};

// Re-export main entity types for convenience
pub use absenteeism::entity::AbsenceRecord;
pub use audit::entity::{AuditAction, AuditEntry};
pub use employee::entity::Employee;
pub use loss::entity::LossRecord;
pub use machine::entity::Machine;
pub use maintenance::entity::MaintenanceRecord;
pub use product::entity::Product;
pub use production_error::entity::ErrorRecord;
pub use production_speed::entity::SpeedRecord;
pub use user::entity::User;

// Re-export repositories
pub use absenteeism::repository::AbsenceRepository;
pub use audit::repository::{AuditFilter, AuditLogRepository};
pub use employee::repository::EmployeeRepository;
pub use loss::repository::LossRepository;
pub use machine::repository::MachineRepository;
pub use maintenance::repository::MaintenanceRepository;
pub use product::repository::ProductRepository;
pub use production_error::repository::ErrorRepository;
pub use production_speed::repository::SpeedRepository;
pub use user::repository::UserRepository;

// Re-export services
pub use audit::service::{AuditActor, AuditRecorder};
pub use auth::password::PasswordService;
pub use auth::service::{AccessTokenClaims, AuthConfig, AuthService};
pub use shared::authorization::{permissions, require_permission, AuthContext};

/// Router and state exports for server assembly
pub mod api {
    pub use crate::shared::api_common::{
        parse_id, ApiResponse, ListResponse, PageMeta, PaginationParams,
    };
    pub use crate::shared::health_api::health_router;
    pub use crate::shared::middleware::{AppState, AuthLayer, Authenticated, RequestMeta};
    pub use crate::shared::rate_limit::RateLimitLayer;

    pub use crate::absenteeism::api::{absenteeism_router, AbsenteeismState};
    pub use crate::audit::api::{audit_logs_router, AuditLogsState};
    pub use crate::auth::api::{auth_router, AuthApiState};
    pub use crate::employee::api::{employees_router, EmployeesState};
    pub use crate::loss::api::{losses_router, LossesState};
    pub use crate::machine::api::{machines_router, MachinesState};
    pub use crate::maintenance::api::{maintenance_router, MaintenanceState};
    pub use crate::product::api::{products_router, ProductsState};
    pub use crate::production_error::api::{errors_router, ErrorsState};
    pub use crate::production_speed::api::{production_speed_router, ProductionSpeedState};
}
