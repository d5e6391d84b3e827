// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The poll loop: one [`LagEstimator`] poll per tick, reported as a gauge.

use forwarder_lag::{Clock, FileInspector, LagEstimator, StatInspector, SystemClock};
use forwarder_metrics::sink::{Gauge, MetricsSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Polls between two delay summaries in the log.
const SUMMARY_EVERY: u64 = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The gauge was accepted by the sink.
    Submitted(Gauge),
    /// A delay was computed but the sink rejected it.
    SubmitFailed(Gauge),
    /// The checkpoint could not be resolved; nothing was sent.
    Skipped,
}

pub struct LagMonitor<I = StatInspector, C = SystemClock> {
    estimator: LagEstimator<I, C>,
    sink: Arc<dyn MetricsSink>,
    metric_name: String,
    hostname: String,
    scope: String,
    polls: u64,
}

impl<I: FileInspector, C: Clock> LagMonitor<I, C> {
    pub fn new(
        estimator: LagEstimator<I, C>,
        sink: Arc<dyn MetricsSink>,
        metric_name: impl Into<String>,
        hostname: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            estimator,
            sink,
            metric_name: metric_name.into(),
            hostname: hostname.into(),
            scope: scope.into(),
            polls: 0,
        }
    }

    /// Resolves the checkpoint once and submits the resulting delay.
    ///
    /// Never fails: engine and sink errors are logged and reflected in the
    /// returned outcome, so the caller can keep polling.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let summarize = self.polls == 0;
        self.polls = (self.polls + 1) % SUMMARY_EVERY;

        let resolved = match self.estimator.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(
                    "Failed to track timestamp from {}: {e}",
                    self.estimator.checkpoint_path().display()
                );
                return PollOutcome::Skipped;
            }
        };

        let now = self.estimator.clock().now();
        let delay = resolved.delay_secs(now);
        if summarize {
            info!(
                delay,
                latest_log_ts = %resolved.timestamp.to_rfc3339(),
                context = resolved.provenance.description(),
                val_units = "sec",
                "forwarder delay"
            );
        }

        #[allow(clippy::cast_precision_loss)]
        let gauge = Gauge::new(self.metric_name.as_str(), delay as f64, now.timestamp())
            .with_tag("hostname", self.hostname.as_str())
            .with_tag("scope", self.scope.as_str())
            .with_tag("provenance", resolved.provenance.as_tag());

        match self.sink.submit_gauge(&gauge).await {
            Ok(()) => {
                debug!("Submitted {} = {delay}s", self.metric_name);
                PollOutcome::Submitted(gauge)
            }
            Err(e) => {
                error!("send-to-datadog: failed to submit {}: {e}", self.metric_name);
                PollOutcome::SubmitFailed(gauge)
            }
        }
    }

    /// Polls on a fixed period until the process is terminated.
    ///
    /// A slow poll pushes the next tick back rather than bunching polls up.
    pub async fn run(mut self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }
}

/// Liveness signal, independent of the poll loop.
pub async fn heartbeat(period: Duration) {
    let mut ticker = interval(period);
    loop {
        ticker.tick().await;
        info!("heartbeat");
    }
}
