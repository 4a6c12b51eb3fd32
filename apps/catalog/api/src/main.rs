//! Catalog API - product catalog pages and JSON API

use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::{connect_from_config_with_retry, run_migrations};
use domain_products::FileStorage;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(app = config.app.name, version = config.app.version, "Starting");

    let db = connect_from_config_with_retry(config.database.clone(), None).await?;
    run_migrations::<migration::Migrator>(&db, config.app.name).await?;

    let storage = FileStorage::new(&config.storage).await?;
    info!(upload_dir = %storage.root().display(), "Upload storage ready");

    let state = AppState {
        config,
        db,
        storage,
    };

    // create_router nests the API under /api and adds docs/middleware
    let router =
        axum_helpers::create_router::<openapi::ApiDoc>(api::routes(&state), api::pages(&state))
            .await?;

    let app = router
        .merge(health_router(state.config.app.clone()))
        .merge(api::ready_router(state.clone()));

    // state moves into the cleanup future
    let server = state.config.server.clone();
    create_production_app(
        app,
        &server,
        Duration::from_secs(30),
        async move {
            info!("Shutting down: closing database connections");
            match state.db.close().await {
                Ok(()) => info!("PostgreSQL connection closed"),
                Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
            }
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Catalog API shutdown complete");
    Ok(())
}
