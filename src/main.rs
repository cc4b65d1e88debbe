//! Survivor pool backend entrypoint wiring REST, SSE, storage and result sync.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survivor_pool_back::{
    config::AppConfig,
    dao::survivor_store::{SurvivorStore, memory::InMemorySurvivorStore},
    routes,
    services::{result_scheduler, score_feed::PrioritizedScoreFeed},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    start_storage(&app_state)
        .await
        .context("selecting storage backend")?;
    start_result_sync(&app_state).context("configuring score feeds")?;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the in-memory store or spawn the MongoDB supervisor, per `STORAGE_BACKEND`.
async fn start_storage(state: &SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "mongo".into());
    match backend.as_str() {
        "memory" => {
            info!("using in-memory storage; data is lost on restart");
            let store: Arc<dyn SurvivorStore> = Arc::new(InMemorySurvivorStore::new());
            state.set_store(store).await;
            Ok(())
        }
        #[cfg(feature = "mongo-store")]
        "mongo" | "mongodb" => {
            use survivor_pool_back::{
                dao::{
                    storage::StorageError,
                    survivor_store::mongodb::{MongoConfig, MongoSurvivorStore},
                },
                services::storage_supervisor,
            };

            tokio::spawn(storage_supervisor::run(state.clone(), || async {
                let config = MongoConfig::from_env().await?;
                let store = MongoSurvivorStore::connect(config).await?;
                Ok::<_, StorageError>(Arc::new(store) as Arc<dyn SurvivorStore>)
            }));
            Ok(())
        }
        other => anyhow::bail!("unsupported STORAGE_BACKEND `{other}`"),
    }
}

/// Spawn the periodic score import when enabled and at least one feed is configured.
fn start_result_sync(state: &SharedState) -> anyhow::Result<()> {
    let sync = &state.config().result_sync;
    if !sync.enabled {
        info!("result sync disabled");
        return Ok(());
    }
    let Some(feed) = PrioritizedScoreFeed::from_config(&state.config().score_feeds)? else {
        warn!("result sync enabled but no score feed configured");
        return Ok(());
    };
    let interval = sync.interval();
    info!(interval_secs = interval.as_secs(), "starting result sync");
    tokio::spawn(result_scheduler::run(state.clone(), Arc::new(feed), interval));
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
