mod config;
mod error;
mod extract;
mod pdf_pipeline;
mod routes;
mod upload;

use std::net::SocketAddr;

use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::routes::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let config = Config::from_env()?;
    config.ensure_dirs().await?;

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|err| AppError::Config(format!("Invalid bind addr: {err}")))?;
    info!(
        documents = %config.documents_dir.display(),
        ocr_inbox = %config.ocr_inbox_dir.display(),
        completed = %config.completed_dir.display(),
        "doc-compare server listening on {addr}"
    );

    let app = build_router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::Http(format!("Bind error: {err}")))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Http(format!("Server error: {err}")))?;

    info!("doc-compare server stopped");
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
