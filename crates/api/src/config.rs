use std::path::PathBuf;

use chrono::Duration;

use vaptrack_core::UserId;

/// Access tokens live this long after issue.
pub const TOKEN_TTL_HOURS: i64 = 8;

/// Process configuration, resolved once at startup and threaded through the
/// application explicitly. There is no global mutable configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// Directory for proof-of-concept uploads and rendered reports.
    pub uploads_dir: PathBuf,
    /// Development-only escape hatch: when set, unauthenticated requests are
    /// attributed to this user with the route's required role. Must never be
    /// set in a release build.
    pub auth_bypass: Option<UserId>,
}

impl AppConfig {
    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let auth_bypass = std::env::var("VAPTRACK_AUTH_BYPASS_USER_ID")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .map(UserId::new);

        let config = Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/vaptrack".to_string()),
            jwt_secret,
            token_ttl: Duration::hours(TOKEN_TTL_HOURS),
            uploads_dir: PathBuf::from(
                std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ),
            auth_bypass,
        };
        config.assert_release_safe();
        config
    }

    /// A release binary refuses to start with the auth bypass enabled.
    pub fn assert_release_safe(&self) {
        if !cfg!(debug_assertions) && self.auth_bypass.is_some() {
            panic!("auth bypass is enabled in a release build; refusing to start");
        }
        if let Some(user_id) = self.auth_bypass {
            tracing::warn!(%user_id, "auth bypass is enabled; all requests run as this user");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_defaults_off() {
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            database_url: String::new(),
            jwt_secret: "s".to_string(),
            token_ttl: Duration::hours(TOKEN_TTL_HOURS),
            uploads_dir: PathBuf::from("uploads"),
            auth_bypass: None,
        };
        config.assert_release_safe();
        assert!(config.auth_bypass.is_none());
    }
}
