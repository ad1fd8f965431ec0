use anyhow::Result;
use bess_dispatch::{api, config, telemetry, workflow};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let state = workflow::AppState::new(cfg.clone()).await?;

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("listening on all interfaces; put a reverse proxy in front or bind to 127.0.0.1");
    }

    info!(
        %addr,
        solver = state.optimizer.backend_name(),
        "starting battery dispatch scheduler"
    );

    let app = api::router(state, &cfg);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
