//! API configuration.

use std::time::Duration;

/// Default body limit, sized for short video uploads.
const DEFAULT_MAX_BODY_SIZE: usize = 100 * 1024 * 1024;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Page sessions not seen for this long are dropped
    pub session_idle_ttl: Duration,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 20,
            request_timeout: Duration::from_secs(300),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            session_idle_ttl: virox_feed::SESSION_IDLE_TTL,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            request_timeout: std::env::var("REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            session_idle_ttl: std::env::var("SESSION_IDLE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle_ttl),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("API_PORT", "9100");
        std::env::set_var("CORS_ORIGINS", "https://a.example, https://b.example");
        std::env::set_var("MAX_BODY_SIZE", "not-a-number");
        std::env::set_var("ENVIRONMENT", "Production");
        std::env::set_var("SESSION_IDLE_TTL_SECS", "120");

        let config = ApiConfig::from_env();
        assert_eq!(config.port, 9100);
        assert_eq!(
            config.cors_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert!(config.is_production());
        assert_eq!(config.session_idle_ttl, Duration::from_secs(120));

        for key in [
            "API_PORT",
            "CORS_ORIGINS",
            "MAX_BODY_SIZE",
            "ENVIRONMENT",
            "SESSION_IDLE_TTL_SECS",
        ] {
            std::env::remove_var(key);
        }
    }
}
