//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod storage;

use crate::auth::{ApiKeySessionVerifier, HmacTokenService, SessionVerifier};
use crate::constants::SHORTLINK_TIMEOUT_SECS;
use crate::services::{ShortLinkBinder, ShortLinkService, SweepService, UploadService, YourlsClient};
use crate::state::AppState;
use anyhow::{Context, Result};
use stashlink_core::{Config, NameResolver};
use stashlink_storage::{Storage, TempSpace};
use std::sync::Arc;
use std::time::Duration;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment,
        backend = %config.storage_backend,
        scratch_dir = %config.scratch_dir.display(),
        "Configuration loaded and validated successfully"
    );

    let storage = storage::setup_storage(&config);

    let shortlinks = YourlsClient::new(
        config.shortlink_api_url.clone(),
        config.shortlink_signature.clone(),
        Duration::from_secs(SHORTLINK_TIMEOUT_SECS),
    )
    .context("Failed to create short-link client")?;

    let sessions = ApiKeySessionVerifier::new(config.admin_api_key.clone());

    let state = build_state(config.clone(), storage, Arc::new(shortlinks), Arc::new(sessions))?;

    // The sweep task is detached and lives as long as the process.
    if state.sweeper.clone().start().is_some() {
        tracing::info!(
            interval_secs = config.sweep_interval_secs,
            max_age_secs = config.session_ttl_secs,
            "Periodic scratch sweep started"
        );
    } else {
        tracing::info!("Periodic scratch sweep disabled");
    }

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Wire services from their collaborators. The storage, short-link service
/// and session verifier are injected so they can be swapped out.
pub fn build_state(
    config: Config,
    storage: Arc<dyn Storage>,
    shortlinks: Arc<dyn ShortLinkService>,
    sessions: Arc<dyn SessionVerifier>,
) -> Result<Arc<AppState>> {
    let temp_space = TempSpace::new(config.scratch_dir.clone());
    let resolver = NameResolver::new(config.suffix_length)?;

    let uploads = UploadService::new(
        temp_space.clone(),
        resolver,
        storage.clone(),
        ShortLinkBinder::new(shortlinks),
    );
    let sweeper = Arc::new(SweepService::new(
        temp_space,
        config.session_ttl_secs,
        config.sweep_interval_secs,
    ));
    let tokens = Arc::new(HmacTokenService::new(
        config.token_secret.clone(),
        config.token_ttl_secs,
    ));

    Ok(Arc::new(AppState {
        config,
        storage,
        uploads,
        sweeper,
        tokens,
        sessions,
    }))
}
