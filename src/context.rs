/// Application context and dependency injection
///
/// The pool is constructed once here and handed to every manager explicitly;
/// there is no process-wide lazily-initialized connection singleton.
use crate::{
    access_code::AccessCodeManager,
    account::AccountManager,
    config::ServerConfig,
    db,
    error::PortalResult,
    jobs::{ApplicationManager, JobManager},
    mailer::Mailer,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub access_code_manager: Arc<AccessCodeManager>,
    pub job_manager: Arc<JobManager>,
    pub application_manager: Arc<ApplicationManager>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> PortalResult<Self> {
        config.validate()?;

        let pool = db::create_pool(&config.storage.portal_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let config = Arc::new(config);

        let account_manager = Arc::new(AccountManager::new(pool.clone(), Arc::clone(&config)));
        let access_code_manager = Arc::new(AccessCodeManager::new(pool.clone()));
        let job_manager = Arc::new(JobManager::new(pool.clone()));
        let application_manager = Arc::new(ApplicationManager::new(pool.clone()));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config,
            db: pool,
            account_manager,
            access_code_manager,
            job_manager,
            application_manager,
            mailer,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
