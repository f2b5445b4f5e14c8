use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Measures the wall time spent on one request.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

/// Result of a stopped [`Stopwatch`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub latency: Duration,
    pub end_time: DateTime<Utc>,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn stop(&self) -> Timing {
        let latency = self.started.elapsed();
        Timing {
            latency,
            end_time: Utc::now(),
        }
    }
}

impl Timing {
    /// Latency in microseconds, the unit of the `.latency` gauge.
    pub fn latency_micros(&self) -> f64 {
        self.latency.as_micros() as f64
    }

    /// End time in whole seconds since the epoch.
    pub fn timestamp(&self) -> i64 {
        self.end_time.timestamp()
    }
}
