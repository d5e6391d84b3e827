// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use forwarder_metrics::errors::UrlError;

/// Startup failures. These are the only fatal errors of the process.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Must specify env variable {0}")]
    MissingEnv(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid intake configuration: {0}")]
    Intake(#[from] UrlError),
}

/// Failure to derive an identity from the instance metadata service.
#[derive(Debug, thiserror::Error)]
pub enum HostnameError {
    #[error("meta-data request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("meta-data returned an invalid IPv4 address: {0:?}")]
    InvalidAddress(String),
}
