use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Observability
    wxdecode_obs::init("wxdecode-server");

    // Config
    let cfg = wxdecode_config::AppConfig::load().context("failed to load configuration")?;
    let http_bind = cfg.http_bind();

    // Build app and state
    let (app, state) = wxdecode_server::build_app(&cfg)?;

    // Start HTTP server
    let addr: SocketAddr = http_bind
        .parse()
        .with_context(|| format!("invalid HTTP bind address {http_bind}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // Mark ready just before serving
    wxdecode_server::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
