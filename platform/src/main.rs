//! Binary entrypoint: initialises logging, builds the platform with a
//! mock broker (a real venue integration is the deployer's concern —
//! see `confluence-broker`'s crate docs), and runs until Ctrl-C.

use confluence::config::ConfluenceConfig;
use confluence::system::ConfluenceSystem;
use confluence_broker::MockBrokerAdapter;
use confluence_core::logging::init_logging;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = ConfluenceConfig::default();
    let broker = Arc::new(MockBrokerAdapter::default());

    let system = ConfluenceSystem::build(config, broker.clone(), broker)?;
    system.run().await?;

    tracing::info!("confluence running, waiting for shutdown signal");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    system.shutdown(false).await?;
    Ok(())
}
