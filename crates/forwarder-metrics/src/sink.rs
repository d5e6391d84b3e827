// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Destination for the gauges a monitor emits.

use crate::api_key::ApiKeyFactory;
use crate::datadog::{
    DdApi, Metric, MetricsIntakeUrlPrefix, Point, RetryStrategy, Series, GAUGE_TYPE,
};
use crate::errors::ShippingError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use zstd::zstd_safe::CompressionLevel;

/// A single gauge sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub name: String,
    pub value: f64,
    /// Unix seconds.
    pub timestamp: i64,
    pub tags: Vec<(String, String)>,
}

impl Gauge {
    pub fn new(name: impl Into<String>, value: f64, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl From<&Gauge> for Series {
    fn from(gauge: &Gauge) -> Self {
        Series {
            series: vec![Metric {
                metric: gauge.name.clone(),
                metric_type: GAUGE_TYPE,
                points: vec![Point {
                    timestamp: gauge.timestamp,
                    value: gauge.value,
                }],
                tags: gauge
                    .tags
                    .iter()
                    .map(|(k, v)| format!("{k}:{v}"))
                    .collect(),
            }],
        }
    }
}

/// Accepts gauges for delivery.
///
/// Submission may fail transiently; callers decide whether that matters.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn submit_gauge(&self, gauge: &Gauge) -> Result<(), ShippingError>;
}

pub struct DatadogSinkConfig {
    pub api_key_factory: Arc<ApiKeyFactory>,
    pub metrics_intake_url_prefix: MetricsIntakeUrlPrefix,
    pub https_proxy: Option<String>,
    pub timeout: Duration,
    pub retry_strategy: RetryStrategy,
    pub compression_level: CompressionLevel,
}

/// Ships each gauge straight to the Datadog series intake.
#[derive(Debug, Clone)]
pub struct DatadogSink {
    api_key_factory: Arc<ApiKeyFactory>,
    dd_api: DdApi,
}

impl DatadogSink {
    pub fn new(config: DatadogSinkConfig) -> Self {
        DatadogSink {
            api_key_factory: config.api_key_factory,
            dd_api: DdApi::new(
                config.metrics_intake_url_prefix,
                config.https_proxy,
                config.timeout,
                config.retry_strategy,
                config.compression_level,
            ),
        }
    }
}

#[async_trait]
impl MetricsSink for DatadogSink {
    async fn submit_gauge(&self, gauge: &Gauge) -> Result<(), ShippingError> {
        let Some(api_key) = self.api_key_factory.get_api_key().await else {
            return Err(ShippingError::Payload("failed to resolve API key".to_string()));
        };

        self.dd_api
            .ship_series(api_key, &Series::from(gauge))
            .await
            .map(|resp| debug!("Gauge {} accepted with {}", gauge.name, resp.status()))
    }
}
