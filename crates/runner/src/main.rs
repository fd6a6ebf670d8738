use meridian_runner::{Runtime, load_config, load_default_config};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => load_default_config()?,
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    tracing::info!(gateways = config.enabled_gateways().len(), "Starting meridian...");

    let mut runtime = Runtime::start(&config)?;
    runtime.connect_all(&config).await;
    runtime.run_until_shutdown().await?;
    runtime.shutdown().await;

    tracing::info!("Meridian stopped");
    Ok(())
}
