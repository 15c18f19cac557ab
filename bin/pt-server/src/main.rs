//! ProdTrack API Server
//!
//! Production server for the tracking REST APIs consumed by the dashboard:
//! - Record APIs: absenteeism, losses, errors, production-speed, machines,
//!   maintenance, employees, products
//! - Auth APIs: register, login, me
//! - Admin APIs: audit-logs
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PT_API_PORT` | `8080` | HTTP API port |
//! | `PT_DATABASE_URL` | `sqlite://prodtrack.db?mode=rwc` | SQLite connection URL |
//! | `PT_JWT_SECRET` | - | HMAC secret for access tokens |
//! | `PT_JWT_ISSUER` | `prodtrack` | JWT issuer claim |
//! | `PT_CORS_ORIGINS` | `http://localhost:5173` | Comma-separated origin allow-list |
//! | `PT_RATE_LIMIT_PER_MIN` | `300` | Global per-IP requests per minute |
//! | `PT_LOGIN_RATE_LIMIT_PER_MIN` | `10` | Login attempts per IP per minute |
//! | `PT_REGISTER_RATE_LIMIT_PER_MIN` | `5` | Registrations per IP per minute |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pt_common::{CorsConfig, RateLimitConfig, ServerConfig};
use pt_tracking::api::{
    absenteeism_router, audit_logs_router, auth_router, employees_router, errors_router,
    health_router, losses_router, machines_router, maintenance_router, production_speed_router,
    products_router, AbsenteeismState, AppState, AuditLogsState, AuthApiState, AuthLayer,
    EmployeesState, ErrorsState, LossesState, MachinesState, MaintenanceState,
    ProductionSpeedState, ProductsState, RateLimitLayer,
};
use pt_tracking::shared::db;
use pt_tracking::{
    AbsenceRepository, AuditLogRepository, AuditRecorder, AuthConfig, AuthService,
    EmployeeRepository, ErrorRepository, LossRepository, MachineRepository,
    MaintenanceRepository, PasswordService, ProductRepository, RecordService, SpeedRepository,
    UserRepository,
};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn load_config() -> ServerConfig {
    let defaults = ServerConfig::default();
    ServerConfig {
        port: env_or_parse("PT_API_PORT", defaults.port),
        database_url: env_or("PT_DATABASE_URL", &defaults.database_url),
        cors: CorsConfig {
            allowed_origins: env_or("PT_CORS_ORIGINS", &defaults.cors.allowed_origins.join(","))
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        },
        rate_limit: RateLimitConfig {
            global_per_minute: env_or_parse(
                "PT_RATE_LIMIT_PER_MIN",
                defaults.rate_limit.global_per_minute,
            ),
            login_per_minute: env_or_parse(
                "PT_LOGIN_RATE_LIMIT_PER_MIN",
                defaults.rate_limit.login_per_minute,
            ),
            register_per_minute: env_or_parse(
                "PT_REGISTER_RATE_LIMIT_PER_MIN",
                defaults.rate_limit.register_per_minute,
            ),
        },
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

#[tokio::main]
async fn main() -> Result<()> {
    pt_common::logging::init_logging("pt-server");

    info!("Starting ProdTrack API Server");

    let config = load_config();

    let jwt_secret = match std::env::var("PT_JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => secret,
        _ => {
            warn!("PT_JWT_SECRET not set; using an insecure development secret");
            "prodtrack-dev-secret".to_string()
        }
    };
    let jwt_issuer = env_or("PT_JWT_ISSUER", "prodtrack");

    // Connect to the database and bootstrap the schema
    info!(url = %config.database_url, "Connecting to database");
    let pool = db::connect(&config.database_url).await?;
    db::init_schema(&pool).await?;

    // Initialize repositories
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let audit_repo = Arc::new(AuditLogRepository::new(pool.clone()));
    let absence_repo = Arc::new(AbsenceRepository::new(pool.clone()));
    let loss_repo = Arc::new(LossRepository::new(pool.clone()));
    let error_repo = Arc::new(ErrorRepository::new(pool.clone()));
    let speed_repo = Arc::new(SpeedRepository::new(pool.clone()));
    let machine_repo = Arc::new(MachineRepository::new(pool.clone()));
    let maintenance_repo = Arc::new(MaintenanceRepository::new(pool.clone()));
    let employee_repo = Arc::new(EmployeeRepository::new(pool.clone()));
    let product_repo = Arc::new(ProductRepository::new(pool.clone()));
    info!("Repositories initialized");

    // Services
    let audit = AuditRecorder::new(audit_repo.clone());
    let auth_service = Arc::new(AuthService::new(AuthConfig {
        secret_key: jwt_secret,
        issuer: jwt_issuer,
        ..AuthConfig::default()
    }));
    let password_service = Arc::new(PasswordService::new());
    info!("Auth services initialized");

    let app_state = AppState {
        auth_service: auth_service.clone(),
    };

    // Record services, one per entity type
    let absenteeism_state = AbsenteeismState {
        service: Arc::new(RecordService::new(absence_repo, audit.clone())),
    };
    let losses_state = LossesState {
        service: Arc::new(RecordService::new(loss_repo, audit.clone())),
    };
    let errors_state = ErrorsState {
        service: Arc::new(RecordService::new(error_repo, audit.clone())),
    };
    let production_speed_state = ProductionSpeedState {
        service: Arc::new(RecordService::new(speed_repo, audit.clone())),
    };
    let machines_state = MachinesState {
        service: Arc::new(RecordService::new(machine_repo, audit.clone())),
    };
    let maintenance_state = MaintenanceState {
        service: Arc::new(RecordService::new(maintenance_repo, audit.clone())),
    };
    let employees_state = EmployeesState {
        service: Arc::new(RecordService::new(employee_repo, audit.clone())),
    };
    let products_state = ProductsState {
        service: Arc::new(RecordService::new(product_repo, audit.clone())),
    };
    let auth_api_state = AuthApiState {
        auth_service,
        password_service,
        user_repo,
        audit,
    };
    let audit_logs_state = AuditLogsState { audit_repo };

    let app = Router::new()
        .nest("/api/absenteeism", absenteeism_router(absenteeism_state))
        .nest("/api/losses", losses_router(losses_state))
        .nest("/api/errors", errors_router(errors_state))
        .nest(
            "/api/production-speed",
            production_speed_router(production_speed_state),
        )
        .nest("/api/machines", machines_router(machines_state))
        .nest("/api/maintenance", maintenance_router(maintenance_state))
        .nest("/api/employees", employees_router(employees_state))
        .nest("/api/products", products_router(products_state))
        .nest(
            "/api/auth",
            auth_router(auth_api_state, &config.rate_limit),
        )
        .nest("/api/audit-logs", audit_logs_router(audit_logs_state))
        .merge(health_router())
        .layer(AuthLayer::new(app_state))
        .layer(RateLimitLayer::per_minute(
            config.rate_limit.global_per_minute,
            "global",
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors));

    let addr = format!("0.0.0.0:{}", config.port);
    info!("API server listening on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown signal received, closing database pool");
    pool.close().await;

    info!("ProdTrack API Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
