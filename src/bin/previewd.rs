//! previewd server entry point.
//!
//! Builds every component explicitly at boot, starts the two background
//! tasks, and serves until a shutdown signal arrives; teardown drains
//! pooled clients before exit.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use previewd::capacity::CapacityMonitor;
use previewd::config::PreviewConfig;
use previewd::http_server::{self, AppState, InternalApiGuard};
use previewd::pool::ClientPool;
use previewd::provisioner::SchemaProvisioner;
use previewd::registry::SchemaRegistry;
use previewd::store::PgSchemaStore;
use previewd::studio::StudioClient;
use previewd::sweeper::OrphanSweeper;
use previewd::tasks;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match PreviewConfig::from_env() {
        Ok(config) => config,
        Err(errors) => {
            for error in &errors {
                tracing::error!("{}", error);
            }
            std::process::exit(1);
        }
    };

    let registry = SchemaRegistry::new();
    let store = match PgSchemaStore::connect_lazy(&config.database_url) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize admin pool");
            std::process::exit(1);
        }
    };
    let pool = match ClientPool::new(&config) {
        Ok(pool) => Arc::new(pool),
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize client pool");
            std::process::exit(1);
        }
    };
    let capacity = CapacityMonitor::new(&config, registry.clone());
    let provisioner = Arc::new(SchemaProvisioner::new(
        &config,
        registry.clone(),
        store.clone(),
        pool.clone(),
        capacity.clone(),
    ));
    let authority = match StudioClient::new(&config.studio_api_url) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize studio client");
            std::process::exit(1);
        }
    };
    let sweeper = Arc::new(OrphanSweeper::new(
        registry.clone(),
        provisioner.clone(),
        authority,
        config.orphan_grace,
        config.session_ttl,
    ));
    let guard = InternalApiGuard::new(&config.internal_api_secret, config.replay_window);

    let eviction_task = tasks::spawn_periodic("idle-eviction", config.eviction_interval, {
        let pool = pool.clone();
        move |_token| {
            let pool = pool.clone();
            async move {
                let evicted = pool.evict_idle().await;
                if evicted > 0 {
                    tracing::info!(evicted, "idle tenant clients evicted");
                }
            }
        }
    });
    let sweep_task = tasks::spawn_periodic("orphan-sweep", config.orphan_sweep_interval, {
        let sweeper = sweeper.clone();
        move |token| {
            let sweeper = sweeper.clone();
            async move {
                sweeper.run_once(&token).await;
            }
        }
    });

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        config,
        registry,
        pool: pool.clone(),
        capacity,
        provisioner,
        guard,
    });
    let app = http_server::router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(addr = %bind_addr, error = %err, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %bind_addr, "previewd listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
    }

    sweep_task.stop().await;
    eviction_task.stop().await;
    pool.disconnect_all().await;
    store.close().await;
    tracing::info!("previewd stopped");
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
