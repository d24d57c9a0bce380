use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use trucktetris_server::{
    AppState, DEFAULT_LOG_DIRECTIVES, build_router, config::ServerConfig,
};
use utils::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(DEFAULT_LOG_DIRECTIVES);

    let config = ServerConfig::from_env()?;
    let state = AppState::from_config(&config).await?;
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!(addr = %addr, "TruckTetris server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
