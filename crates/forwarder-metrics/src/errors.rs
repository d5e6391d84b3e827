// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Failure to deliver a payload to the intake.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    /// The payload could not be built; retrying will not help.
    #[error("failed to prepare payload: {0}")]
    Payload(String),

    /// The intake rejected the payload or could not be reached.
    #[error("failed to ship to destination (status {0:?}): {1}")]
    Destination(Option<StatusCode>, String),
}

/// Invalid site or intake URL configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid site {0:?}")]
    InvalidSite(String),

    #[error("invalid intake URL {0:?}: must start with http:// or https://")]
    InvalidUrl(String),

    #[error("neither a site nor an intake URL override was configured")]
    Missing,
}
