/// Configuration management for the Talentgate portal
use crate::error::{PortalError, PortalResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub access_codes: AccessCodeConfig,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub portal_db: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Session token lifetime in hours
    pub token_validity_hours: i64,
}

/// Access code issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessCodeConfig {
    /// Default validity window in days when the issuer does not specify one
    pub default_validity_days: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> PortalResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("PORTAL_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("PORTAL_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| PortalError::Validation("Invalid port number".to_string()))?;
        let version = env::var("PORTAL_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("PORTAL_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let portal_db = env::var("PORTAL_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("portal.sqlite"));

        let jwt_secret = env::var("PORTAL_JWT_SECRET")
            .map_err(|_| PortalError::Validation("JWT secret required".to_string()))?;
        let token_validity_hours = env::var("PORTAL_TOKEN_VALIDITY_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        let default_validity_days = env::var("PORTAL_ACCESS_CODE_VALIDITY_DAYS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let email = if let Ok(smtp_url) = env::var("PORTAL_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("PORTAL_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                portal_db,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_validity_hours,
            },
            access_codes: AccessCodeConfig {
                default_validity_days,
            },
            email,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> PortalResult<()> {
        if self.service.hostname.is_empty() {
            return Err(PortalError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(PortalError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.access_codes.default_validity_days <= 0 {
            return Err(PortalError::Validation(
                "Access code validity must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
