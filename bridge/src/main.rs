mod collector;
mod config;
mod errors;
mod model;
mod mqtt;
mod poller;

use clap::Parser;
use collector::SensorApi;
use config::Config;
use mqtt::ForwardingHandler;
use poller::{Poller, Schedule};
use tokio::sync::mpsc;
use tracing::{error, info};

const INBOX_CAPACITY: usize = 100;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = Config::parse();

    info!("Starting Wio bridge");
    info!("Device: {}, API: {}", config.device_name, config.api_url);
    info!("MQTT broker: {}:{}", config.mqtt_broker, config.mqtt_port);

    let sensor = match SensorApi::from_config(&config) {
        Ok(sensor) => sensor,
        Err(e) => {
            error!("Failed to set up sensor client: {}", e);
            std::process::exit(1);
        }
    };

    // Inbound messages land here; nothing subscribes, so it stays unread
    let (inbox_tx, _inbox) = mpsc::channel(INBOX_CAPACITY);

    let publisher = match mqtt::connect(&config, ForwardingHandler::new(inbox_tx)).await {
        Ok(publisher) => publisher,
        Err(e) => {
            error!("Failed to connect to MQTT broker: {}", e);
            std::process::exit(1);
        }
    };

    let poller = Poller::new(
        sensor,
        publisher,
        config.device_name.clone(),
        Schedule::from(&config),
    );

    tokio::select! {
        _ = poller.run() => {
            error!("Poller terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}
