use classcast::{config::AppConfig, logger, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(None)?;
    logger::init_tracing(&config.logging)?;

    tracing::info!(
        "[SERVER] classcast v{} 启动中",
        env!("CARGO_PKG_VERSION")
    );

    server::run(config).await
}
