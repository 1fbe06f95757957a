//! Webhook wiring and HTTP(S) serving

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use k8s_openapi::api::core::v1::Pod;
use tracing::info;

use admitter::{webhook_router, MutatingWebhook, StaticResolver, Webhook};

use crate::config::{Config, ResolverMode};
use crate::error::ServerError;

/// Time in-flight reviews get to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Build the webhook selected by `config.mode`
pub fn build_webhook(config: &Config) -> Arc<dyn Webhook> {
    let mutator = config.metadata_mutator();
    match config.mode {
        ResolverMode::Dynamic => Arc::new(MutatingWebhook::dynamic(mutator)),
        ResolverMode::StaticPod => {
            Arc::new(MutatingWebhook::<StaticResolver<Pod>, _>::for_kind(mutator))
        }
    }
}

/// Build the full application router
pub fn build_router(config: &Config) -> Router {
    webhook_router(build_webhook(config), config.router_config())
}

/// Serve until ctrl-c, over TLS when a certificate is configured
pub async fn run(config: Config) -> Result<(), ServerError> {
    let app = build_router(&config);
    let addr = config.listen_addr;

    match config.tls() {
        Some((cert, key)) => {
            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(|e| ServerError::TlsConfig(e.to_string()))?;

            let handle = axum_server::Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            info!(
                addr = %addr,
                path = %config.webhook_path,
                mode = ?config.mode,
                "Starting HTTPS webhook server"
            );
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|source| ServerError::Bind { addr, source })?;

            info!(
                addr = %addr,
                path = %config.webhook_path,
                mode = ?config.mode,
                "Starting HTTP webhook server"
            );
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    info!("Webhook server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
