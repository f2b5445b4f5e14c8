use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use super::MetricSink;
use crate::assembly::PointKind;
use crate::error::EmitError;
use crate::settings::Tags;

/// A point as it was handed to [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPoint {
    pub name: String,
    pub value: f64,
    pub kind: PointKind,
    pub source: String,
    pub tags: Tags,
}

/// Keeps every point in memory. Handy for tests and local inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    points: Mutex<Vec<RecordedPoint>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<RecordedPoint> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.points().into_iter().map(|p| p.name).collect()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<RecordedPoint> {
        std::mem::take(&mut *self.points.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn push(&self, point: RecordedPoint) {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(point);
    }
}

#[async_trait]
impl MetricSink for MemorySink {
    fn send_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: i64,
        source: &str,
        tags: &Tags,
    ) -> Result<(), EmitError> {
        self.push(RecordedPoint {
            name: name.to_string(),
            value,
            kind: PointKind::Gauge { timestamp },
            source: source.to_string(),
            tags: tags.clone(),
        });
        Ok(())
    }

    fn send_delta_counter(
        &self,
        name: &str,
        delta: f64,
        source: &str,
        tags: &Tags,
    ) -> Result<(), EmitError> {
        self.push(RecordedPoint {
            name: name.to_string(),
            value: delta,
            kind: PointKind::DeltaCounter,
            source: source.to_string(),
            tags: tags.clone(),
        });
        Ok(())
    }
}
