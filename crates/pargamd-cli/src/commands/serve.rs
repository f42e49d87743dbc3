use crate::assets::AssetManager;
use crate::cli::ServeArgs;
use crate::error::{CliError, Result};
use crate::server::{self, AppState, GENERATED_DIR, UPLOADS_DIR};
use std::fs;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub async fn run(args: ServeArgs) -> Result<()> {
    for dir in [UPLOADS_DIR, GENERATED_DIR] {
        fs::create_dir_all(args.workdir.join(dir))?;
    }
    let workdir = args.workdir.canonicalize()?;

    let assets = AssetManager::new()?;
    let fallback = assets.search_paths(&[], Some(workdir.clone()));
    info!("Auxiliary files are looked up in {:?}", fallback.roots());

    let addr = SocketAddr::new(args.host, args.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind {}: {}", addr, e)))?;

    let app = server::router(AppState::new(workdir, fallback));
    println!("Serving on http://{} (Ctrl+C to stop)", addr);
    info!("HTTP interface listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::Server(e.to_string()))?;

    info!("HTTP interface stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
