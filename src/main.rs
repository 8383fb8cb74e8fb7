use std::sync::Arc;

use anyhow::{Context, Result};
use cdc_connector::{RegistrationSettings, read_document, register};
use delivery_dispatch::Orchestrator;
use delivery_tracker::http::{self, AppState};
use delivery_tracker::messaging;
use delivery_tracker::provider::{self, HttpClient, SystemClock};
use delivery_tracker::{Config, config::ConnectorConfig};
use driver_routes::{RouteTable, build_schedule};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracker_core::{ChangeStream, DocumentStore};
use trip_telemetry::Aggregator;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();

    let routes = match &config.routes_path {
        Some(path) => RouteTable::load(path)?,
        None => RouteTable::builtin()?,
    };
    let routes = Arc::new(routes);

    let schedule = build_schedule(routes.routes(), &mut rand::rng());
    info!(
        drivers = routes.len(),
        waypoints = schedule.len(),
        selections = ?schedule.selections(),
        "simulated route prepared"
    );

    let (store, mut stream) =
        provider::connect(&config.store_uri, config.store_target(), SystemClock)
            .context("connecting to position store")?;
    let store = Arc::new(store);

    match &config.connector {
        Some(connector) => register_connector(connector).await?,
        None => info!("CONNECTOR_URL not set, skipping connector registration"),
    }

    let aggregator = Arc::new(Aggregator::new(Arc::clone(&routes)));
    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&store), config.pacing));

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let consumer = tokio::spawn({
        let aggregator = Arc::clone(&aggregator);
        let topic = config.topic();
        async move {
            let stopped = async move {
                // an error means the sender is gone, which is also a stop
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            };
            messaging::consume(&mut stream, &aggregator, &topic, stopped).await;
            stream
        }
    });

    let state = AppState { routes, schedule: Arc::new(schedule), orchestrator, aggregator };
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("binding port {}", config.port))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving http")?;

    shutdown_tx.send_replace(true);
    let mut stream = consumer.await.context("joining change stream consumer")?;
    stream.close().await.context("closing change stream")?;
    store.close().await.context("closing position store")?;

    info!("shutdown complete");
    Ok(())
}

async fn register_connector(connector: &ConnectorConfig) -> Result<()> {
    let settings = RegistrationSettings {
        url: connector.url.clone(),
        document: read_document(&connector.config_path)?,
        max_attempts: connector.max_attempts,
        retry_delay: connector.retry_delay,
    };
    register(&HttpClient::new(), &settings).await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received ctrl-c, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
