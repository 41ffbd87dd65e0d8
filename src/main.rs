use std::net::SocketAddr;

use anyhow::Context;
use client_environment::{
    api::{self, AppState},
    config::AppConfig,
    environment,
    fingerprint::fingerprint,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = AppConfig::from_env();

    let env = config
        .load_environment()
        .context("load client environment")?;
    let env = environment::install(env).context("install client environment")?;

    let app = api::router(AppState::new(config.clone(), env).context("build app state")?);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid listen address")?;
    let listener = TcpListener::bind(addr).await.context("bind listener")?;
    let etag = fingerprint(env)?;

    info!(
        %addr,
        profile = %env.profile(),
        api_server_url = %env.api_server_url,
        fingerprint = %etag,
        "serving client environment"
    );
    axum::serve(listener, app)
        .await
        .context("http server failed")?;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();
}
