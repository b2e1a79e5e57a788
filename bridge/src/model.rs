use crate::errors::{Error, Result};
use serde::Deserialize;
use std::fmt;

/// The two metrics read from the sensor and republished to the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Humidity,
    Temperature,
}

impl Metric {
    /// Path segment on the sensor API and last segment of the MQTT topic
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Humidity => "humidity",
            Metric::Temperature => "temperature",
        }
    }

    pub fn topic(self, device: &str) -> String {
        format!("telegraf/{}/{}", device, self.as_str())
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded sensor response that either carries a value or an error
pub trait Reading: serde::de::DeserializeOwned {
    const METRIC: Metric;

    fn into_value(self) -> Result<f64>;
}

/// Relative humidity in percent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HumidityReading {
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Reading for HumidityReading {
    const METRIC: Metric = Metric::Humidity;

    fn into_value(self) -> Result<f64> {
        settle(self.humidity, self.error, "humidity")
    }
}

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemperatureReading {
    #[serde(default)]
    pub celsius_degree: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Reading for TemperatureReading {
    const METRIC: Metric = Metric::Temperature;

    fn into_value(self) -> Result<f64> {
        settle(self.celsius_degree, self.error, "celsius_degree")
    }
}

// An error field always wins, even when a value came along with it.
fn settle(value: Option<f64>, error: Option<String>, field: &'static str) -> Result<f64> {
    match (value, error) {
        (_, Some(error)) if !error.is_empty() => Err(Error::SensorReported(error)),
        (Some(value), _) => Ok(value),
        (None, _) => Err(Error::MissingValue(field)),
    }
}

/// Renders a reading the way the Telegraf MQTT consumer expects it: a bare
/// fixed-point number with six decimals.
pub fn format_payload(value: f64) -> String {
    format!("{:.6}", value)
}
