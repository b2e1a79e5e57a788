use crate::collector::SensorApi;
use crate::config::Config;
use crate::model::{format_payload, HumidityReading, Metric, TemperatureReading};
use crate::mqtt::Publisher;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// How long to sleep between cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// After a cycle that collected both readings
    pub interval: Duration,
    /// After a cycle where collection failed
    pub backoff: Duration,
}

impl From<&Config> for Schedule {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            backoff: config.backoff(),
        }
    }
}

pub struct Poller<P> {
    sensor: SensorApi,
    publisher: P,
    device_name: String,
    schedule: Schedule,
}

impl<P: Publisher> Poller<P> {
    pub fn new(sensor: SensorApi, publisher: P, device_name: String, schedule: Schedule) -> Self {
        Self {
            sensor,
            publisher,
            device_name,
            schedule,
        }
    }

    /// Polls forever
    pub async fn run(&self) {
        info!(
            "Polling every {:?} ({:?} after a failed collection)",
            self.schedule.interval, self.schedule.backoff
        );

        loop {
            let delay = self.run_cycle().await;
            debug!("Sleeping {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Collects both readings, publishes them, and returns how long to wait
    /// before the next cycle. Nothing is published unless both readings
    /// were collected.
    pub async fn run_cycle(&self) -> Duration {
        let start = Instant::now();

        let humidity = match self.sensor.collect::<HumidityReading>().await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to collect humidity: {}", e);
                return self.schedule.backoff;
            }
        };

        let temperature = match self.sensor.collect::<TemperatureReading>().await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to collect temperature: {}", e);
                return self.schedule.backoff;
            }
        };

        self.publish(Metric::Humidity, humidity).await;
        self.publish(Metric::Temperature, temperature).await;

        debug!("Cycle finished in {:.3}s", start.elapsed().as_secs_f64());
        self.schedule.interval
    }

    async fn publish(&self, metric: Metric, value: f64) {
        let topic = metric.topic(&self.device_name);
        let payload = format_payload(value);

        match self.publisher.publish(&topic, payload).await {
            Ok(()) => debug!("Published {} to {}", value, topic),
            Err(e) => error!("Unable to publish {} reading: {}", metric, e),
        }
    }
}
