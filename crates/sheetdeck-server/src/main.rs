use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::info;

use sheetdeck_core::config::Config;
use sheetdeck_duckdb::DuckDbBackend;
use sheetdeck_server::state::AppState;

/// `sheetdeck health`: liveness probe for container health checks.
///
/// Calls `GET http://localhost:$SHEETDECK_PORT/healthz` and exits 0 on
/// HTTP 200, 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("SHEETDECK_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/healthz", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sheetdeck=info".parse()?),
        )
        .json()
        .init();

    // A missing IP hash salt fails here, before anything is bound.
    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/sheetdeck.db", cfg.data_dir);
    let db = DuckDbBackend::open(&db_path, &cfg.duckdb_memory_limit)?;

    let state = Arc::new(AppState::new(db, cfg.clone())?);

    tokio::spawn(Arc::clone(&state.rate_limiter).run_sweep_loop());

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = sheetdeck_server::app::build_app(Arc::clone(&state));

    info!(
        port = cfg.port,
        environment = ?cfg.environment,
        "SheetDeck analytics listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
