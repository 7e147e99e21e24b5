//! Engine configuration - all tunables of the lifecycle engine
//!
//! # Environment variables
//!
//! Every setting can be overridden through the environment:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | WORK_DIR | /var/lib/contract-engine | Working directory (database, logs) |
//! | DATABASE_PATH | <WORK_DIR>/contracts.db | SQLite database file |
//! | CLIENT_REGISTRY_URL | http://localhost:4101 | Client registry base URL |
//! | METER_REGISTRY_URL | http://localhost:4102 | Meter registry base URL |
//! | SUBSCRIPTION_REGISTRY_URL | http://localhost:4103 | Subscription registry base URL |
//! | INTERVENTION_URL | http://localhost:4104 | Field-intervention scheduler base URL |
//! | NOTIFICATION_URL | http://localhost:4105 | Notification dispatcher base URL |
//! | EXTERNAL_TIMEOUT_MS | 5000 | Bound on every external subsystem call |
//! | AUDIT_BUFFER_SIZE | 256 | Audit worker channel capacity |
//! | MAX_TARGET_YEARS | 5 | Horizon for transition target dates |
//! | ENVIRONMENT | development | development / staging / production |

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for database and log files
    pub work_dir: String,
    /// SQLite database file path
    pub database_path: String,
    /// Client registry base URL
    pub client_registry_url: String,
    /// Meter registry base URL
    pub meter_registry_url: String,
    /// Subscription registry base URL
    pub subscription_registry_url: String,
    /// Field-intervention scheduler base URL
    pub intervention_url: String,
    /// Notification dispatcher base URL
    pub notification_url: String,
    /// Bounded timeout for external subsystem calls (milliseconds);
    /// a timeout is treated identically to an explicit failure
    pub external_timeout_ms: u64,
    /// Audit worker channel capacity
    pub audit_buffer_size: usize,
    /// Transition target dates may not lie further out than this many years
    pub max_target_years: i32,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        let work_dir =
            std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/contract-engine".into());
        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| format!("{}/contracts.db", work_dir));
        Self {
            work_dir,
            database_path,
            client_registry_url: std::env::var("CLIENT_REGISTRY_URL")
                .unwrap_or_else(|_| "http://localhost:4101".into()),
            meter_registry_url: std::env::var("METER_REGISTRY_URL")
                .unwrap_or_else(|_| "http://localhost:4102".into()),
            subscription_registry_url: std::env::var("SUBSCRIPTION_REGISTRY_URL")
                .unwrap_or_else(|_| "http://localhost:4103".into()),
            intervention_url: std::env::var("INTERVENTION_URL")
                .unwrap_or_else(|_| "http://localhost:4104".into()),
            notification_url: std::env::var("NOTIFICATION_URL")
                .unwrap_or_else(|_| "http://localhost:4105".into()),
            external_timeout_ms: std::env::var("EXTERNAL_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            audit_buffer_size: std::env::var("AUDIT_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
            max_target_years: std::env::var("MAX_TARGET_YEARS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Override the filesystem locations, keeping everything else from the
    /// environment. Used by tests.
    pub fn with_overrides(work_dir: impl Into<String>, database_path: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.database_path = database_path.into();
        config
    }

    /// Whether running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Whether running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_overrides() {
        let config = Config::with_overrides("/tmp/engine", "/tmp/engine/test.db");
        assert_eq!(config.work_dir, "/tmp/engine");
        assert_eq!(config.database_path, "/tmp/engine/test.db");
        assert!(config.external_timeout_ms > 0);
        assert!(config.audit_buffer_size > 0);
    }
}
