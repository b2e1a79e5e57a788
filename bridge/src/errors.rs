use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("device offline")]
    DeviceOffline,

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("sensor reported error: {0}")]
    SensorReported(String),

    #[error("sensor response has no {0} value")]
    MissingValue(&'static str),

    #[error("no acknowledgment within {0:?}")]
    PublishTimeout(Duration),

    #[error("MQTT publish error: {0}")]
    Publish(#[from] rumqttc::ClientError),

    #[error("MQTT event loop stopped")]
    EventLoopStopped,

    #[error("MQTT connection error: {0}")]
    Connect(#[from] rumqttc::ConnectionError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
