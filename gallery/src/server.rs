use std::sync::Arc;

use aide::openapi::{Info, OpenApi};
use axum::{extract::DefaultBodyLimit, http::StatusCode, Extension, Router};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::routes;
use crate::{gateway::ImageGateway, identity::JwtVerifier, types::Environment};

/// Time budget for a whole HTTP request
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Builds the application router with its dependencies attached
pub fn app(
    environment: Environment,
    gateway: Arc<ImageGateway>,
    verifier: Arc<JwtVerifier>,
) -> Router {
    let mut openapi = OpenApi {
        info: Info {
            title: "Gallery".to_string(),
            description: Some("Per-user image gallery backed by an object store".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Info::default()
        },
        ..OpenApi::default()
    };

    routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(DefaultBodyLimit::max(environment.max_upload_bytes()))
        .layer(Extension(environment))
        .layer(Extension(gateway))
        .layer(Extension(verifier))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    gateway: Arc<ImageGateway>,
    verifier: Arc<JwtVerifier>,
) -> anyhow::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], environment.port()?));

    let router = app(environment, gateway, verifier);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Gallery started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {e}"),
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
