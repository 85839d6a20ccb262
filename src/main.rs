use std::sync::Arc;

use msgqueue::broker::Broker;
use msgqueue::config::load_config;
use msgqueue::transport::start_websocket_server;
use msgqueue::utils::{BrokerError, logging};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    if let Err(e) = run_server().await {
        // no-op if the configured subscriber is already installed
        logging::init("info");
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server() -> Result<(), BrokerError> {
    let settings = load_config()?;
    logging::init(&settings.log.level);

    let addr = settings.server.address();
    let broker = Arc::new(Broker::new());

    tokio::select! {
        res = start_websocket_server(addr, broker, settings) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    }
}
