use clap::Parser;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://us.wio.seeed.io/v1/node/GroveTempHumD2";

/// Runtime settings, read once at startup from flags or environment
#[derive(Debug, Clone, Parser)]
#[command(
    name = "wio-bridge",
    about = "Polls a Wio temperature/humidity node and republishes readings over MQTT"
)]
pub struct Config {
    /// Access token appended to sensor API requests
    #[arg(long, env = "WIO_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Device name used in the MQTT topics
    #[arg(long, env = "WIO_NAME")]
    pub device_name: String,

    /// MQTT client identifier
    #[arg(long, env = "POD_NAME", default_value = "wio")]
    pub client_id: String,

    #[arg(long, env = "WIO_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, env = "MQTT_BROKER", default_value = "mqtt.leetserve.com")]
    pub mqtt_broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    /// Seconds between successful polls
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 30)]
    pub poll_interval_secs: u64,

    /// Seconds to wait after a failed collection
    #[arg(long, env = "BACKOFF_SECS", default_value_t = 300)]
    pub backoff_secs: u64,

    #[arg(long, env = "PUBLISH_TIMEOUT_SECS", default_value_t = 30)]
    pub publish_timeout_secs: u64,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 60)]
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
