//! Metric sinks
//!
//! A sink accepts gauge points and delta counter increments. Calls must not
//! block: buffering, batching and delivery happen behind the trait.

mod direct;
mod format;
mod memory;

pub use direct::DirectSender;
pub use format::{format_delta_counter, format_metric, sanitize_name, DELTA_PREFIX};
pub use memory::{MemorySink, RecordedPoint};

use async_trait::async_trait;

use crate::assembly::{MetricPoint, PointKind};
use crate::error::EmitError;
use crate::settings::Tags;

#[async_trait]
pub trait MetricSink: Send + Sync {
    fn send_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: i64,
        source: &str,
        tags: &Tags,
    ) -> Result<(), EmitError>;

    fn send_delta_counter(
        &self,
        name: &str,
        delta: f64,
        source: &str,
        tags: &Tags,
    ) -> Result<(), EmitError>;

    /// Flushes buffered points and stops background work.
    async fn close(&self) {}
}

/// Routes a point to the matching sink call.
pub fn send_point(sink: &dyn MetricSink, point: &MetricPoint) -> Result<(), EmitError> {
    match point.kind {
        PointKind::Gauge { timestamp } => sink.send_metric(
            &point.name,
            point.value,
            timestamp,
            &point.source,
            &point.tags,
        ),
        PointKind::DeltaCounter => {
            sink.send_delta_counter(&point.name, point.value, &point.source, &point.tags)
        }
    }
}
