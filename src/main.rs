/// Talentgate - referral-gated job portal backend
///
/// Access codes gate a seeker's first login and can retroactively revoke
/// access when they expire; the application lifecycle tracks job openings as
/// a race-safe shared counter.

mod access_code;
mod account;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod jobs;
mod mailer;
mod server;
#[cfg(test)]
mod test_support;

use config::ServerConfig;
use context::AppContext;
use error::PortalResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> PortalResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talentgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
