//! Weather connector backed by the OpenWeatherMap current-weather API.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;
use stepflow_core::secret::SecretStore;

use super::{api_error, optional_str, require_secret, require_str};

const API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Connector for `weather.fetch_forecast`.
pub struct WeatherConnector {
    client: reqwest::Client,
    secrets: Arc<dyn SecretStore>,
    api_url: String,
}

impl WeatherConnector {
    pub fn new(client: reqwest::Client, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            client,
            secrets,
            api_url: API_URL.to_string(),
        }
    }

    /// Override the API URL (useful for testing).
    #[allow(dead_code)]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }
}

/// One-line report from the API response.
fn format_report(location: &str, unit: &str, data: &Value) -> Option<String> {
    let description = data["weather"][0]["description"].as_str()?;
    let mut description = description.to_string();
    if let Some(first) = description.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    let temp = data["main"]["temp"].as_f64()?;
    let symbol = if unit == "imperial" { "F" } else { "C" };
    Some(format!(
        "Current weather in {location}: {description}, {temp}°{symbol}"
    ))
}

impl Connector for WeatherConnector {
    fn name(&self) -> &str {
        "weather"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let location = require_str(params, "location")?;
            let unit = optional_str(params, "unit", "imperial");
            let api_key = SecretString::from(
                require_secret(&*self.secrets, "OPENWEATHERMAP_API_KEY").await?,
            );

            tracing::debug!(location, unit, "fetching weather");

            let response = self
                .client
                .get(&self.api_url)
                .query(&[
                    ("q", location),
                    ("units", unit),
                    ("appid", api_key.expose_secret()),
                ])
                .send()
                .await
                .map_err(|e| ConnectorError::Http(e.to_string()))?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            let data: Value = response
                .json()
                .await
                .map_err(|e| ConnectorError::Http(e.to_string()))?;
            let report = format_report(location, unit, &data).ok_or_else(|| {
                ConnectorError::Http("malformed weather response".to_string())
            })?;
            Ok(Value::String(report))
        })
    }
}
