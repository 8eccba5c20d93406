use anyhow::Context;

use storefront_api::app::{AppServices, build_app};
use storefront_infra::StorefrontConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storefront_observability::init();

    let config = StorefrontConfig::from_env().context("invalid storefront configuration")?;

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });
    let bind_addr =
        std::env::var("STOREFRONT_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let services = AppServices::in_memory(config);
    services
        .seed_demo_catalog()
        .context("failed to seed demo catalog")?;

    let app = build_app(&jwt_secret, services);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
