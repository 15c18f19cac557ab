use serde::{Deserialize, Serialize};

pub mod logging;

// ============================================================================
// Configuration Types
// ============================================================================

/// HTTP server configuration, filled from environment variables by the
/// server binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "sqlite://prodtrack.db?mode=rwc".to_string(),
            cors: CorsConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Cross-origin policy: explicit allow-list of origins, credentials allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Per-IP rate limit windows (requests per minute).
///
/// Login and registration carry stricter dedicated windows than the
/// global API limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub global_per_minute: u32,
    pub login_per_minute: u32,
    pub register_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: 300,
            login_per_minute: 10,
            register_per_minute: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.rate_limit.login_per_minute < config.rate_limit.global_per_minute);
    }
}
