use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub dev: DevGatewayConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string. The in-memory store is used when unset.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub jwt_secret: String,
}

/// How caller errors from `/dev` are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorMode {
    /// 4xx status with the standard error envelope
    Strict,
    /// 200 with `{ "error": "<message>" }`
    Legacy,
}

impl ErrorMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(ErrorMode::Strict),
            "legacy" | "soft" => Some(ErrorMode::Legacy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevGatewayConfig {
    pub enabled: bool,
    pub error_mode: ErrorMode,
    pub allow_purge: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(port) = env::var("DEV_GATEWAY_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }

        // Gateway overrides
        if let Ok(v) = env::var("DEV_GATEWAY_ENABLED") {
            self.dev.enabled = v.parse().unwrap_or(self.dev.enabled);
        }
        if let Ok(v) = env::var("DEV_GATEWAY_ERROR_MODE") {
            self.dev.error_mode = ErrorMode::parse(&v).unwrap_or(self.dev.error_mode);
        }
        if let Ok(v) = env::var("DEV_GATEWAY_ALLOW_PURGE") {
            self.dev.allow_purge = v.parse().unwrap_or(self.dev.allow_purge);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: "development-secret".to_string(),
            },
            dev: DevGatewayConfig {
                enabled: true,
                error_mode: ErrorMode::Strict,
                allow_purge: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
            },
            dev: DevGatewayConfig {
                enabled: false,
                error_mode: ErrorMode::Strict,
                allow_purge: false,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
            },
            security: SecurityConfig {
                enable_cors: false,
                jwt_secret: String::new(),
            },
            dev: DevGatewayConfig {
                enabled: false,
                error_mode: ErrorMode::Strict,
                allow_purge: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
