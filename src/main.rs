use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scanlink::analytics::geoip;
use scanlink::config::Config;
use scanlink::{api, redirect, storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scanlink=info,tower_http=info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    info!("Loaded configuration");

    info!("Initializing storage...");
    let storage = storage::connect(&config.database, &config.cache).await?;
    info!("Storage initialized successfully");

    let geo = geoip::from_path(config.analytics.geoip_db_path.as_deref());
    info!(
        "Client IP mode: {:?} ({} trusted proxy ranges)",
        config.analytics.trusted_proxy_mode,
        config.analytics.trusted_proxies.len()
    );

    let api_router = api::create_api_router(Arc::clone(&storage), &config, geo);
    let redirect_router = redirect::create_redirect_router(
        Arc::clone(&storage),
        config.domains.frontend_domain.clone(),
    );

    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("API server listening on http://{}", api_addr);
    info!("   - short URLs point at {}", config.domains.short_url("{id}"));

    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("Redirect server listening on http://{}", redirect_addr);

    // Run both servers concurrently
    tokio::try_join!(
        axum::serve(
            api_listener,
            api_router.into_make_service_with_connect_info::<SocketAddr>()
        ),
        axum::serve(
            redirect_listener,
            redirect_router.into_make_service_with_connect_info::<SocketAddr>()
        ),
    )?;

    Ok(())
}
