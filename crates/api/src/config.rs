//! Process configuration.
//!
//! Values come from built-in defaults, overridden by `TASKBOARD_*`
//! environment variables (e.g. `TASKBOARD_BIND_ADDR`,
//! `TASKBOARD_DATABASE_URL`, `TASKBOARD_CORS_ALLOWED_ORIGINS='["http://localhost:3000"]'`).

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

use taskboard_observability::LogFormat;

pub const DEV_JWT_SECRET: &str = "dev-secret";
pub const ENV_PREFIX: &str = "TASKBOARD_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Postgres connection string. Without one the API runs on an in-memory store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub seed_demo_data: bool,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_minutes: 24 * 60,
            database_url: None,
            seed_demo_data: false,
            cors_allowed_origins: Vec::new(),
            log_format: LogFormat::Json,
        }
    }
}

impl ApiConfig {
    /// Defaults merged with the process environment.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(ApiConfig::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_in_memory_json_logging() {
        let cfg: ApiConfig = Figment::from(Serialized::defaults(ApiConfig::default()))
            .extract()
            .unwrap();
        assert_eq!(cfg, ApiConfig::default());
        assert!(cfg.uses_dev_secret());
        assert_eq!(cfg.token_ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let cfg: ApiConfig = Figment::from(Serialized::defaults(ApiConfig::default()))
            .merge(Serialized::default("jwt_secret", "s3cret"))
            .merge(Serialized::default("log_format", "pretty"))
            .merge(Serialized::default("cors_allowed_origins", vec!["http://localhost:3000"]))
            .extract()
            .unwrap();

        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.cors_allowed_origins, vec!["http://localhost:3000".to_string()]);
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }
}
