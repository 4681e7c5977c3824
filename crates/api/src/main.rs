use anyhow::Context;

use bazaar_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bazaar_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = bazaar_api::app::services::build_services(&config)
        .await
        .context("failed to initialise catalog store")?;
    let app = bazaar_api::app::build_app(config.jwt_secret.clone(), services);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(environment = %config.environment, "listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
