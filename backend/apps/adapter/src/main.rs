//! Bridge Adapter Entry Point
//!
//! Composition root: reads configuration, wires the LDAP directory and the
//! second-factor API into the bridge, and serves access requests.
//! Uses `anyhow` for startup errors; request-level failures are handled
//! inside the bridge and never stop the process.

mod config;
mod router;

use std::sync::Arc;
use std::time::Duration;

use bridge::application::{CorrelationTracker, ForestCache, SecondFactorOrchestrator};
use bridge::infra::LdapSettings;
use bridge::{AccessRequestHandler, HttpSecondFactorApi, InMemoryChallengeStore, LdapDirectory};
use platform::clock::{Clock, SystemClock};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Orchestrator =
    SecondFactorOrchestrator<LdapDirectory, HttpSecondFactorApi, InMemoryChallengeStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adapter=info,bridge=info,platform=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = |key: &str| std::env::var(key).ok();

    let bridge_config = config::bridge_config(env)?;
    let run_options = Arc::new(config::run_options(env));
    let clients = Arc::new(config::client_registry(env)?);
    let addr = config::listen_addr(env)?;

    if clients.is_empty() {
        tracing::warn!("No active clients; every access request will be rejected");
    }

    // Collaborators
    let http_client = platform::http::build_client(&bridge_config.http_client_config())?;
    let api = Arc::new(HttpSecondFactorApi::new(
        http_client,
        bridge_config.api_url.clone(),
    ));
    let directory = Arc::new(LdapDirectory::new(
        LdapSettings {
            url: bridge_config.directory_url.clone(),
            timeout: bridge_config.directory_timeout,
        },
        run_options,
    ));
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let orchestrator: Arc<Orchestrator> = Arc::new(SecondFactorOrchestrator::new(
        directory,
        api,
        challenges,
        ForestCache::new(),
        clock.clone(),
    ));
    let tracker = Arc::new(CorrelationTracker::new(clock));

    // Startup warm-up: errors here should not prevent startup
    for client in clients.iter() {
        match orchestrator.warm_up(client).await {
            Ok(0) => {}
            Ok(domains) => {
                tracing::info!(client = %client.name, domains, "Forest schema loaded");
            }
            Err(e) => {
                e.log();
                tracing::warn!(
                    client = %client.name,
                    "Forest schema warm-up failed, loading on first login instead"
                );
            }
        }
    }

    let purge = spawn_purge_task(orchestrator.clone(), bridge_config.purge_interval);

    let handler = AccessRequestHandler::new(clients, tracker, orchestrator);
    let app = router::bridge_router(handler).layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge.abort();
    tracing::info!("Shut down");

    Ok(())
}

/// Periodically drop challenges nobody answered
fn spawn_purge_task(orchestrator: Arc<Orchestrator>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match orchestrator.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Expired challenges purged"),
                Err(e) => e.log(),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
