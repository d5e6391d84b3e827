// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname detection for the `hostname` tag.

use crate::config::MonitorConfig;
use crate::error::HostnameError;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, warn};

pub const METADATA_TIMEOUT: Duration = Duration::from_secs(3);
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// Get the identity reported with every gauge.
///
/// Resolved once at startup, trying in order:
/// 1. The configured `DD_HOSTNAME`
/// 2. The instance's private IPv4 address from the metadata service,
///    rendered as `ip-10-1-2-3`
/// 3. The system hostname
/// 4. `unknown`
pub async fn resolve_hostname(config: &MonitorConfig) -> String {
    if let Some(hostname) = config.hostname.as_deref() {
        if !hostname.is_empty() {
            return hostname.to_string();
        }
    }

    match fetch_instance_hostname(&config.metadata_url, METADATA_TIMEOUT).await {
        Ok(hostname) => return hostname,
        Err(e) => warn!("Could not resolve hostname from instance metadata: {e}"),
    }

    if let Some(hostname) = system_hostname() {
        return hostname;
    }

    warn!("Could not determine hostname, using '{UNKNOWN_HOSTNAME}'");
    UNKNOWN_HOSTNAME.to_string()
}

/// Asks the metadata service for the private IPv4 address.
pub async fn fetch_instance_hostname(
    metadata_url: &str,
    timeout: Duration,
) -> Result<String, HostnameError> {
    let client = reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?;
    let body = client
        .get(metadata_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    debug!("Instance metadata returned local IPv4 {body:?}");

    hostname_from_ipv4(&body).ok_or(HostnameError::InvalidAddress(body))
}

/// `10.1.2.3` becomes `ip-10-1-2-3`.
pub fn hostname_from_ipv4(addr: &str) -> Option<String> {
    let addr: Ipv4Addr = addr.trim().parse().ok()?;
    Some(format!("ip-{}", addr.to_string().replace('.', "-")))
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(hostname) => hostname
            .to_str()
            .filter(|h| !h.is_empty())
            .map(str::to_string),
        Err(e) => {
            warn!("Failed to get system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok().filter(|h| !h.is_empty())
}
