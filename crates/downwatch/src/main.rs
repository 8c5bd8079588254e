//! Downwatch binary

use common::logging::{self, LogFormat};
use downwatch::{Config, MonitorServer, shutdown};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Can't use tracing yet - not initialized
    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    logging::init_with(
        config.logging.level.as_deref().unwrap_or("info"),
        LogFormat::from_name(config.logging.format.as_deref()),
    );

    info!("Downwatch starting");

    let (trigger, stop) = shutdown::channel();
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        info!("Shutdown signal received");
        trigger.trigger();
    });

    MonitorServer::new(config).run(stop).await?;

    Ok(())
}
