//! paylink HTTP Server
//!
//! Axum-based server issuing YooKassa payment links and turning confirmed
//! payments into `BillingEvent` objects in the cluster.

mod config;
mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paylink_cluster::{fetch_setting, ClusterCredentials, ClusterLedgerStore, KubeClient};
use paylink_payments::{LedgerStore, LinkEncoder, PaymentProvider, YooKassaClient};

use crate::config::Args;
use crate::handlers::{create_payment, health_check, yookassa_webhook};
use crate::state::AppState;

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/payment", post(create_payment))
        .route("/yookassa/webhook", post(yookassa_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Cluster access
    let credentials = ClusterCredentials::load(args.kubeconfig.as_deref())
        .await
        .context("loading cluster credentials")?;
    let kube = KubeClient::with_timeout(&credentials, Duration::from_secs(args.cluster_timeout_secs))
        .context("building cluster client")?;
    tracing::info!(server = %kube.server(), "✓ Cluster client ready");

    // Dashboard base URL, read once
    let dashboard_url = fetch_setting(&kube, &args.payment_url_setting)
        .await
        .with_context(|| format!("reading setting {}", args.payment_url_setting))?;
    let links = LinkEncoder::with_return_path(&dashboard_url, &args.return_path);

    // Payment provider
    let provider: Arc<dyn PaymentProvider> =
        Arc::new(YooKassaClient::from_env().context("configuring YooKassa")?);
    tracing::info!("✓ YooKassa configured");

    let ledger: Arc<dyn LedgerStore> = Arc::new(ClusterLedgerStore::new(kube));

    let state = AppState::new(provider, links, ledger);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind_addr)
        .await
        .with_context(|| format!("binding {}", args.bind_addr))?;

    tracing::info!("paylink server running on http://{}", args.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /                  - Liveness probe");
    tracing::info!("  POST /payment           - Create payment link");
    tracing::info!("  POST /yookassa/webhook  - YooKassa notifications");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("paylink server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
