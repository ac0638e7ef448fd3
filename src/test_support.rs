/// Shared helpers for manager tests
///
/// Pools are file-backed (tempfile) so concurrent connections see the same
/// database; the schema comes from the embedded migrations.
use crate::{
    account::AccountManager,
    config::{
        AccessCodeConfig, AuthConfig, LoggingConfig, ServerConfig, ServiceConfig, StorageConfig,
    },
    db::{self, models::Account, DatabaseOptions},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_JWT_SECRET: &str = "test-secret-0123456789abcdef0123456789abcdef";

/// Config for tests; only the fields the managers read matter
pub fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 0,
            version: "test".to_string(),
        },
        storage: StorageConfig {
            data_directory: "./data".into(),
            portal_db: "./data/portal.sqlite".into(),
        },
        authentication: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            token_validity_hours: 24,
        },
        access_codes: AccessCodeConfig {
            default_validity_days: 60,
        },
        email: None,
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

/// Migrated pool over a temp file; keep the TempDir alive for the test
pub async fn test_pool() -> (SqlitePool, TempDir) {
    let dir = TempDir::new().unwrap();
    let pool = db::create_pool(&dir.path().join("portal.sqlite"), DatabaseOptions::default())
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    (pool, dir)
}

pub fn test_account_manager(pool: &SqlitePool) -> AccountManager {
    AccountManager::new(pool.clone(), Arc::new(test_config()))
}

impl AccountManager {
    /// Seed an admin account for issuance tests
    pub async fn seed_admin(&self) -> Account {
        self.create_account(
            "admin@example.com",
            "admin",
            "adminpassword",
            crate::db::models::Role::Admin,
            None,
        )
        .await
        .unwrap()
    }

    /// Seed a poster account for job tests
    pub async fn seed_poster(&self) -> Account {
        self.create_account(
            "poster@example.com",
            "poster",
            "posterpassword",
            crate::db::models::Role::Poster,
            None,
        )
        .await
        .unwrap()
    }
}
