use anyhow::Result;
use chat_relay_lib::{config::Settings, spawn_relay_actor, ws_router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration first so the log level can come from it
    let settings = Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone())),
        )
        .init();

    let handle = spawn_relay_actor(settings.clone());
    let app = ws_router::create_router(handle);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    info!(addr = %settings.bind_addr, "chat relay listening");

    axum::serve(listener, app).await?;

    Ok(())
}
