// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process, sync::Arc, time::Duration};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use forwarder_lag::LagEstimator;
use forwarder_metrics::{
    api_key::ApiKeyFactory,
    datadog::RetryStrategy,
    sink::{DatadogSink, DatadogSinkConfig},
};
use forwarder_monitor::{
    config::{MonitorConfig, DEFAULT_LOG_LEVEL},
    hostname::resolve_hostname,
    logger::Formatter,
    monitor::{heartbeat, LagMonitor},
};

const INTAKE_TIMEOUT: Duration = Duration::from_secs(5);
const COMPRESSION_LEVEL: i32 = 6;

#[tokio::main]
pub async fn main() {
    let log_level = env::var("DD_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    init_logging(&log_level);

    let config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error creating config on forwarder monitor startup: {e}");
            process::exit(1);
        }
    };
    debug!("Starting forwarder monitor with {config:?}");

    let metrics_intake_url_prefix = match config.intake_url_prefix() {
        Ok(prefix) => prefix,
        Err(e) => {
            error!("Error resolving metrics intake: {e}");
            process::exit(1);
        }
    };

    let hostname = resolve_hostname(&config).await;
    info!(
        "Watching {} as {hostname} in {}",
        config.checkpoint_path.display(),
        config.scope
    );

    tokio::spawn(heartbeat(config.heartbeat_interval));

    let sink = DatadogSink::new(DatadogSinkConfig {
        api_key_factory: Arc::new(ApiKeyFactory::new(&config.api_key)),
        metrics_intake_url_prefix,
        https_proxy: config.https_proxy.clone(),
        timeout: INTAKE_TIMEOUT,
        retry_strategy: RetryStrategy::LinearBackoff(3, 1),
        compression_level: COMPRESSION_LEVEL,
    });

    let monitor = LagMonitor::new(
        LagEstimator::new(&config.checkpoint_path),
        Arc::new(sink),
        config.metric_name.as_str(),
        hostname,
        config.scope.as_str(),
    );
    monitor.run(config.poll_interval).await;
}

fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_new(format!("h2=off,hyper=off,rustls=off,{log_level}"))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .event_format(Formatter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }
}
