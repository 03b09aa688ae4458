mod ai;
mod app;
mod config;
mod domain;
mod infrastructure;
mod marketplace;
mod store;
mod tasks;

use anyhow::Result;
use infrastructure::{directories, instance_guard::InstanceGuard, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config.logging, &paths.logs_dir)?;

    let guard = InstanceGuard::acquire(&paths)?;

    let shutdown = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::BidPilotApp::initialize(config, paths, guard, shutdown).await?;
    app.run().await
}
