//! Alert Gateway - Main Entry Point

use api::{init_logging, install_metrics_recorder, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::load()?;
    init_logging(&settings.logging()?)?;

    info!("=== Alert Gateway v{} ===", env!("CARGO_PKG_VERSION"));

    let prometheus = install_metrics_recorder();
    run_server(settings, prometheus).await?;

    Ok(())
}
