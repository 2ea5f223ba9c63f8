use clap::Parser;
use tokio::net::TcpListener;

use catalog::config::{Args, Config};
use catalog::{telemetry, AppState};

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args)?;

    telemetry::init(&config.log);

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = AppState::bootstrap(config).await?;
    let router = catalog::api::router(state.clone());

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!(address = %bind_addr, "catalog service listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.reaper_shutdown.cancel();
    Ok(())
}
