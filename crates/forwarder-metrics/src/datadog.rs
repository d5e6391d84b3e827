// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Types and client for the Datadog v2 series intake.

use crate::errors::{ShippingError, UrlError};
use reqwest::{header, Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};
use zstd::zstd_safe::CompressionLevel;

const SERIES_PATH: &str = "/api/v2/series";
/// Metric type code for gauges in the v2 series API.
pub const GAUGE_TYPE: u8 = 3;

/// A Datadog site, such as `datadoghq.com` or `datadoghq.eu`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site(String);

impl Site {
    pub fn new(site: String) -> Result<Self, UrlError> {
        let trimmed = site.trim();
        let valid = !trimmed.is_empty()
            && !trimmed.starts_with('.')
            && !trimmed.ends_with('.')
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        if !valid {
            return Err(UrlError::InvalidSite(site));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Full intake URL that replaces the site-derived one (`DD_DD_URL`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdDdUrl(String);

impl DdDdUrl {
    pub fn new(url: String) -> Result<Self, UrlError> {
        let trimmed = url.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(UrlError::InvalidUrl(url));
        }
        Ok(Self(trimmed.trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Scheme and host that the series path is appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsIntakeUrlPrefix(String);

impl MetricsIntakeUrlPrefix {
    /// The override wins when both are given.
    pub fn new(site: Option<Site>, dd_url: Option<DdDdUrl>) -> Result<Self, UrlError> {
        match (dd_url, site) {
            (Some(dd_url), _) => Ok(Self(dd_url.0)),
            (None, Some(site)) => Ok(Self(format!("https://api.{}", site.0))),
            (None, None) => Err(UrlError::Missing),
        }
    }

    pub fn series_url(&self) -> String {
        format!("{}{SERIES_PATH}", self.0)
    }
}

impl std::fmt::Display for MetricsIntakeUrlPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How many times to send a payload, and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Attempts, back to back.
    Immediate(u64),
    /// Attempts, and the delay in milliseconds multiplied by the attempt number.
    LinearBackoff(u64, u64),
}

impl RetryStrategy {
    fn attempts(&self) -> u64 {
        match self {
            RetryStrategy::Immediate(attempts) | RetryStrategy::LinearBackoff(attempts, _) => {
                (*attempts).max(1)
            }
        }
    }

    fn delay_after(&self, attempt: u64) -> Option<Duration> {
        match self {
            RetryStrategy::Immediate(_) => None,
            RetryStrategy::LinearBackoff(_, delay_ms) => {
                Some(Duration::from_millis(delay_ms.saturating_mul(attempt)))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Point {
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metric {
    pub metric: String,
    #[serde(rename = "type")]
    pub metric_type: u8,
    pub points: Vec<Point>,
    pub tags: Vec<String>,
}

/// Body of a `POST /api/v2/series` request.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct Series {
    pub series: Vec<Metric>,
}

/// Serialises and zstd-compresses a series payload.
pub fn encode_series(
    series: &Series,
    compression_level: CompressionLevel,
) -> Result<Vec<u8>, ShippingError> {
    let body = serde_json::to_vec(series).map_err(|e| ShippingError::Payload(e.to_string()))?;
    zstd::encode_all(body.as_slice(), compression_level)
        .map_err(|e| ShippingError::Payload(format!("failed to compress payload: {e}")))
}

#[derive(Debug, Clone)]
pub struct DdApi {
    client: Client,
    metrics_intake_url_prefix: MetricsIntakeUrlPrefix,
    retry_strategy: RetryStrategy,
    compression_level: CompressionLevel,
}

impl DdApi {
    pub fn new(
        metrics_intake_url_prefix: MetricsIntakeUrlPrefix,
        https_proxy: Option<String>,
        timeout: Duration,
        retry_strategy: RetryStrategy,
        compression_level: CompressionLevel,
    ) -> Self {
        DdApi {
            client: get_client(https_proxy, timeout),
            metrics_intake_url_prefix,
            retry_strategy,
            compression_level,
        }
    }

    /// Sends a series payload, retrying server errors per the retry strategy.
    ///
    /// A 4xx response is returned as an error straight away: resending the
    /// same payload with the same key cannot succeed.
    pub async fn ship_series(
        &self,
        api_key: &str,
        series: &Series,
    ) -> Result<Response, ShippingError> {
        let body = encode_series(series, self.compression_level)?;
        let url = self.metrics_intake_url_prefix.series_url();
        let attempts = self.retry_strategy.attempts();

        let mut last_error = ShippingError::Destination(None, "no attempt was made".to_string());
        for attempt in 1..=attempts {
            let resp = self
                .client
                .post(&url)
                .header("DD-API-KEY", api_key)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::CONTENT_ENCODING, "zstd")
                .body(body.clone())
                .send()
                .await;

            match resp {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Shipped {} series on attempt {attempt}", series.series.len());
                    return Ok(resp);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    error!("{status}: Failed to push series to {url}: {text:?}");
                    if status.is_client_error() {
                        return Err(ShippingError::Destination(Some(status), text));
                    }
                    last_error = ShippingError::Destination(Some(status), text);
                }
                Err(e) => {
                    error!("Error shipping series to {url} (attempt {attempt}/{attempts}): {e}");
                    last_error = ShippingError::Destination(e.status(), e.to_string());
                }
            }

            if attempt < attempts {
                if let Some(delay) = self.retry_strategy.delay_after(attempt) {
                    tokio::time::sleep(delay).await;
                }
            }
        }
        Err(last_error)
    }
}

fn build_client(https_proxy: Option<String>, timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().timeout(timeout);
    if let Some(proxy) = https_proxy {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    builder.build()
}

/// Builds the intake client, falling back to a default client when the proxy
/// configuration is unusable.
fn get_client(https_proxy: Option<String>, timeout: Duration) -> Client {
    match build_client(https_proxy, timeout) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to build HTTP client with configured proxy, using defaults: {e}");
            Client::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_validation() {
        assert_eq!(
            Site::new("datadoghq.eu".to_string()).unwrap().as_str(),
            "datadoghq.eu"
        );
        assert_eq!(
            Site::new("  us3.datadoghq.com ".to_string()).unwrap().as_str(),
            "us3.datadoghq.com"
        );
        for bad in ["", "   ", "https://datadoghq.com", ".datadoghq.com", "bad site"] {
            assert_eq!(
                Site::new(bad.to_string()),
                Err(UrlError::InvalidSite(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_dd_url_validation() {
        assert_eq!(
            DdDdUrl::new("http://127.0.0.1:8080/".to_string())
                .unwrap()
                .as_str(),
            "http://127.0.0.1:8080"
        );
        assert!(DdDdUrl::new("127.0.0.1:8080".to_string()).is_err());
    }

    #[test]
    fn test_intake_url_prefix() {
        let site = Site::new("datadoghq.com".to_string()).unwrap();
        let prefix = MetricsIntakeUrlPrefix::new(Some(site.clone()), None).unwrap();
        assert_eq!(
            prefix.series_url(),
            "https://api.datadoghq.com/api/v2/series"
        );

        let dd_url = DdDdUrl::new("http://localhost:9999".to_string()).unwrap();
        let prefix = MetricsIntakeUrlPrefix::new(Some(site), Some(dd_url)).unwrap();
        assert_eq!(prefix.series_url(), "http://localhost:9999/api/v2/series");

        assert_eq!(
            MetricsIntakeUrlPrefix::new(None, None),
            Err(UrlError::Missing)
        );
    }

    #[test]
    fn test_retry_schedule() {
        assert_eq!(RetryStrategy::Immediate(0).attempts(), 1);
        assert_eq!(RetryStrategy::Immediate(3).delay_after(1), None);

        let linear = RetryStrategy::LinearBackoff(3, 100);
        assert_eq!(linear.attempts(), 3);
        assert_eq!(linear.delay_after(1), Some(Duration::from_millis(100)));
        assert_eq!(linear.delay_after(2), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_encode_series_round_trips_through_zstd() {
        let series = Series {
            series: vec![Metric {
                metric: "fluentd-kinesis-forwarder-monitor.delay".to_string(),
                metric_type: GAUGE_TYPE,
                points: vec![Point {
                    timestamp: 1_717_243_200,
                    value: 42.0,
                }],
                tags: vec!["hostname:ip-10-0-0-1".to_string(), "scope:prod".to_string()],
            }],
        };

        let compressed = encode_series(&series, 6).unwrap();
        let decompressed = zstd::decode_all(compressed.as_slice()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&decompressed).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "series": [{
                    "metric": "fluentd-kinesis-forwarder-monitor.delay",
                    "type": 3,
                    "points": [{"timestamp": 1_717_243_200, "value": 42.0}],
                    "tags": ["hostname:ip-10-0-0-1", "scope:prod"],
                }]
            })
        );
    }
}
