use crate::config::Config;
use crate::errors::{Error, Result};
use crate::model::{Metric, Reading};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

/// Client for the sensor's REST API, one URL per metric
#[derive(Debug, Clone)]
pub struct SensorApi {
    client: Client,
    humidity_url: Url,
    temperature_url: Url,
}

impl SensorApi {
    pub fn new(client: Client, base_url: &str, token: &str) -> Result<Self> {
        Ok(Self {
            client,
            humidity_url: sensor_url(base_url, Metric::Humidity, token)?,
            temperature_url: sensor_url(base_url, Metric::Temperature, token)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout()).build()?;
        Self::new(client, &config.api_url, &config.token)
    }

    /// Fetches one reading and returns its value, or why there is none
    pub async fn collect<R: Reading>(&self) -> Result<f64> {
        let url = match R::METRIC {
            Metric::Humidity => &self.humidity_url,
            Metric::Temperature => &self.temperature_url,
        };
        debug!("Collecting {} reading", R::METRIC);
        fetch::<R>(&self.client, url).await?.into_value()
    }
}

/// Builds `<base>/<metric>?access_token=<token>`
pub fn sensor_url(base_url: &str, metric: Metric, token: &str) -> Result<Url> {
    let mut url = Url::parse(&format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        metric.as_str()
    ))
    .map_err(|e| Error::Config(format!("invalid sensor API URL {:?}: {}", base_url, e)))?;
    url.query_pairs_mut().append_pair("access_token", token);
    Ok(url)
}

/// GETs `url` and decodes the body as JSON.
///
/// A 404 means the node is offline. Any other status is decoded as-is, the
/// API reports its own failures inside the body.
pub async fn fetch<T: DeserializeOwned>(client: &Client, url: &Url) -> Result<T> {
    // The URL carries the access token, keep it out of error messages
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::Network(e.without_url()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::DeviceOffline);
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Network(e.without_url()))?;
    info!(
        "Sensor response ({}): {}",
        status,
        String::from_utf8_lossy(&body)
    );

    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HumidityReading, TemperatureReading};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NODE_PATH: &str = "/v1/node/GroveTempHumD2";

    fn api_for(server: &MockServer) -> SensorApi {
        let base = format!("{}{}", server.uri(), NODE_PATH);
        SensorApi::new(Client::new(), &base, "secret-token").unwrap()
    }

    async fn mount(server: &MockServer, metric: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("{}/{}", NODE_PATH, metric)))
            .and(query_param("access_token", "secret-token"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_sensor_url_encodes_token() {
        let url = sensor_url("https://example.com/v1/node/X/", Metric::Humidity, "a b&c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/v1/node/X/humidity?access_token=a+b%26c"
        );
    }

    #[test]
    fn test_sensor_url_rejects_garbage() {
        assert!(matches!(
            sensor_url("not a url", Metric::Temperature, "t"),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_collect_humidity() {
        let server = MockServer::start().await;
        mount(
            &server,
            "humidity",
            ResponseTemplate::new(200).set_body_string(r#"{"humidity": 55.2}"#),
        )
        .await;

        let api = api_for(&server);
        assert_eq!(api.collect::<HumidityReading>().await.unwrap(), 55.2);
    }

    #[tokio::test]
    async fn test_collect_temperature() {
        let server = MockServer::start().await;
        mount(
            &server,
            "temperature",
            ResponseTemplate::new(200).set_body_string(r#"{"celsius_degree": 21.7}"#),
        )
        .await;

        let api = api_for(&server);
        assert_eq!(api.collect::<TemperatureReading>().await.unwrap(), 21.7);
    }

    #[tokio::test]
    async fn test_not_found_is_device_offline() {
        let server = MockServer::start().await;
        mount(
            &server,
            "humidity",
            ResponseTemplate::new(404).set_body_string(r#"{"humidity": 55.2}"#),
        )
        .await;

        let api = api_for(&server);
        assert!(matches!(
            api.collect::<HumidityReading>().await,
            Err(Error::DeviceOffline)
        ));
    }

    #[tokio::test]
    async fn test_other_status_is_still_decoded() {
        let server = MockServer::start().await;
        mount(
            &server,
            "temperature",
            ResponseTemplate::new(500).set_body_string(r#"{"celsius_degree": 19.5}"#),
        )
        .await;

        let api = api_for(&server);
        assert_eq!(api.collect::<TemperatureReading>().await.unwrap(), 19.5);
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        mount(
            &server,
            "humidity",
            ResponseTemplate::new(200).set_body_string("<html>bad gateway</html>"),
        )
        .await;

        let api = api_for(&server);
        assert!(matches!(
            api.collect::<HumidityReading>().await,
            Err(Error::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_leaves_value_empty_on_error_body() {
        let server = MockServer::start().await;
        mount(
            &server,
            "humidity",
            ResponseTemplate::new(200).set_body_string(r#"{"error": "Node is offline"}"#),
        )
        .await;

        let url = sensor_url(
            &format!("{}{}", server.uri(), NODE_PATH),
            Metric::Humidity,
            "secret-token",
        )
        .unwrap();
        let reading: HumidityReading = fetch(&Client::new(), &url).await.unwrap();
        assert!(reading.humidity.is_none());
        assert_eq!(reading.error.as_deref(), Some("Node is offline"));

        let api = api_for(&server);
        assert!(matches!(
            api.collect::<HumidityReading>().await,
            Err(Error::SensorReported(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Nothing listens on port 1
        let api = SensorApi::new(Client::new(), "http://127.0.0.1:1/v1/node/X", "t").unwrap();
        assert!(matches!(
            api.collect::<TemperatureReading>().await,
            Err(Error::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_network_error_hides_token() {
        let api =
            SensorApi::new(Client::new(), "http://127.0.0.1:1/v1/node/X", "SUPERSECRET").unwrap();

        let err = api.collect::<TemperatureReading>().await.unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, Error::Network(_)));
        assert!(!message.contains("SUPERSECRET"), "token leaked: {}", message);
        assert!(!message.contains("access_token"), "query leaked: {}", message);
    }
}
