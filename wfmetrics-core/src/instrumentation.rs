//! The handle every wrapped handler shares.
//!
//! [`Instrumentation`] owns the metric naming and the dispatch target. It is
//! created once by [`Instrumentation::configure`] and cloned into every
//! middleware; clones share the same sink.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::assembly::{CompletedRequest, MetricNames, MetricPoint};
use crate::error::{InitError, InitErrorKind};
use crate::settings::MetricsConfig;
use crate::sink::{send_point, DirectSender, MetricSink};

#[derive(Clone)]
pub enum Dispatch {
    /// Points go to a sink.
    Network(Arc<dyn MetricSink>),
    /// Request summaries go to the log, nothing leaves the process.
    Diagnostic,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(_) => write!(f, "Network"),
            Self::Diagnostic => write!(f, "Diagnostic"),
        }
    }
}

#[derive(Debug)]
struct Inner {
    names: MetricNames,
    dispatch: Dispatch,
}

#[derive(Debug, Clone)]
pub struct Instrumentation {
    inner: Arc<Inner>,
}

impl Instrumentation {
    /// Creates the Wavefront sender, or selects diagnostic mode when the
    /// server is the debug sentinel.
    pub fn configure(config: &MetricsConfig) -> Result<Self, InitError> {
        if config.is_debug() {
            info!("Metrics server is set to debug, request metrics will be logged only");
            return Ok(Self::new(config, Dispatch::Diagnostic));
        }

        if config.source.trim().is_empty() {
            return Err(InitErrorKind::MissingSource.into());
        }
        let sender = DirectSender::new(config)?;
        Ok(Self::new(config, Dispatch::Network(Arc::new(sender))))
    }

    /// Sends points to `sink` regardless of the configured server.
    pub fn with_sink(config: &MetricsConfig, sink: Arc<dyn MetricSink>) -> Self {
        Self::new(config, Dispatch::Network(sink))
    }

    pub fn diagnostic(config: &MetricsConfig) -> Self {
        Self::new(config, Dispatch::Diagnostic)
    }

    fn new(config: &MetricsConfig, dispatch: Dispatch) -> Self {
        Self {
            inner: Arc::new(Inner {
                names: MetricNames::new(
                    config.metric_prefix.clone(),
                    config.source.clone(),
                    config.point_tags.clone(),
                ),
                dispatch,
            }),
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(self.inner.dispatch, Dispatch::Diagnostic)
    }

    /// Assembles and dispatches the points for one request. Never fails;
    /// sink errors are logged at debug level and dropped.
    pub fn record(&self, request: &CompletedRequest) {
        let points = self.inner.names.assemble(request);
        match &self.inner.dispatch {
            Dispatch::Network(sink) => dispatch_points(sink.as_ref(), &points),
            Dispatch::Diagnostic => log_summary(request, &points),
        }
    }

    /// Flushes and stops the sink. Call once during shutdown.
    pub async fn shutdown(&self) {
        if let Dispatch::Network(sink) = &self.inner.dispatch {
            sink.close().await;
        }
    }
}

fn dispatch_points(sink: &dyn MetricSink, points: &[MetricPoint]) {
    for point in points {
        if let Err(e) = send_point(sink, point) {
            debug!("Dropping metric {}: {}", point.name, e);
        }
    }
}

fn log_summary(request: &CompletedRequest, points: &[MetricPoint]) {
    let tags = points
        .first()
        .map(|point| {
            point
                .tags
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    info!(
        latency_us = request.timing.latency.as_micros() as u64,
        status = request.status,
        bytes_in = request.meta.bytes_in,
        bytes_out = request.bytes_out,
        tags = %tags,
        "{} {}",
        request.meta.method,
        request.meta.path
    );
    for point in points {
        debug!(name = %point.name, value = point.value, "metric point");
    }
}
