//! Opsledger API Server
//!
//! Main entry point for the Opsledger backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opsledger_api::{AppState, create_router};
use opsledger_core::storage::{StorageConfig, StorageService};
use opsledger_db::connect_with;
use opsledger_shared::{AppConfig, EmailService, JwtConfig, JwtService, StorageSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Connect to database
    let db = connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let email_service = EmailService::new(config.email.clone());
    info!(
        enabled = config.email.enabled,
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email service configured"
    );

    let storage = config.storage.as_ref().and_then(init_storage);

    let state = AppState {
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        email_service: Arc::new(email_service),
        storage,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the storage service; uploads answer 503 when this fails.
fn init_storage(settings: &StorageSettings) -> Option<Arc<StorageService>> {
    match StorageConfig::from_settings(settings).and_then(StorageService::from_config) {
        Ok(service) => {
            info!(
                provider = service.provider_name(),
                bucket = %settings.bucket,
                "Storage service configured"
            );
            Some(Arc::new(service))
        }
        Err(e) => {
            warn!(error = %e, "Storage disabled");
            None
        }
    }
}
