use crate::core::currency::{ExchangeProvider, ExchangeRates};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, instrument};

#[derive(Debug, Deserialize)]
struct LatestQuery {
    base_currency: String,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    query: LatestQuery,
    data: HashMap<String, f64>,
}

/// Client for the freecurrencyapi `latest` endpoint.
pub struct FreeCurrencyApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl FreeCurrencyApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ratekeeper/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(FreeCurrencyApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn latest_url(&self, api_key: &str, base_currency: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/latest", self.base_url),
            &[("apikey", api_key), ("base_currency", base_currency)],
        )
        .map_err(|e| Error::Provider(format!("invalid provider URL {}: {e}", self.base_url)))
    }
}

#[async_trait]
impl ExchangeProvider for FreeCurrencyApiProvider {
    #[instrument(
        name = "ProviderLatestFetch",
        skip(self, api_key),
        fields(base_currency = %base_currency)
    )]
    async fn latest(&self, api_key: &str, base_currency: &str) -> Result<ExchangeRates> {
        let url = self.latest_url(api_key, base_currency)?;
        debug!("Requesting latest rates from {}/latest", self.base_url);

        let response = self.client.get(url).send().await.map_err(|e| {
            Error::Provider(format!("request for {base_currency} rates failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "request for {base_currency} rates failed with status {status}: {body}"
            )));
        }

        let response_text = response.text().await.map_err(|e| {
            Error::Provider(format!("failed to read {base_currency} rates response: {e}"))
        })?;

        let data: LatestResponse = match serde_json::from_str(&response_text) {
            Ok(data) => data,
            Err(e) => {
                error!(
                    error = ?e,
                    response = %response_text,
                    "Failed to parse provider response"
                );
                return Err(Error::Decode(e.to_string()));
            }
        };
        debug!(quotes = data.data.len(), "Received provider rates");

        Ok(ExchangeRates {
            base_currency: data.query.base_currency,
            rates: data.data,
        })
    }
}
