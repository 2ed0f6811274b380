//! HTTP bootstrap for the decision service. Routes live in [`crate::authz::web`].
use crate::authz::store::PolicyStore;
use crate::settings::Settings;
use axum::Router;
use miette::IntoDiagnostic;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub fn app(settings: &Settings, store: Arc<PolicyStore>) -> Router {
    crate::authz::web::router(store, settings.policy.allow_reload).layer(TraceLayer::new_for_http())
}

/// Bind the configured `host:port`; the host may be an IP literal or a hostname.
pub async fn bind(settings: &Settings) -> miette::Result<TcpListener> {
    let addr = settings.listen_addr();
    TcpListener::bind(addr.as_str())
        .await
        .map_err(|e| miette::miette!("failed to bind {addr}: {e}"))
}

pub async fn serve(settings: Settings, store: Arc<PolicyStore>) -> miette::Result<()> {
    if settings.policy.allow_reload {
        tracing::info!("Policy reload endpoint is ENABLED");
    } else {
        tracing::info!("Policy reload endpoint is DISABLED");
    }

    let listener = bind(&settings).await?;
    let addr = listener.local_addr().into_diagnostic()?;
    let router = app(&settings, store);
    tracing::info!(%addr, "Authorization decision API listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;
    tracing::info!("Authorization decision API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}
