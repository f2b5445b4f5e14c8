//! Turns one completed request into the points sent for it.

use crate::request::RequestMeta;
use crate::settings::Tags;
use crate::timing::Timing;

pub const TAG_PATH: &str = "path";
pub const TAG_METHOD: &str = "method";
pub const TAG_USER_AGENT: &str = "userAgent";
pub const TAG_CLIENT_IP: &str = "clientIP";

/// Everything known about a request once the handler is done with it.
#[derive(Debug, Clone)]
pub struct CompletedRequest {
    pub meta: RequestMeta,
    pub timing: Timing,
    pub status: u16,
    pub bytes_out: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    /// 1xx and anything outside 100..=599 has no class.
    pub fn classify(status: u16) -> Option<Self> {
        match status {
            200..=299 => Some(Self::Success),
            300..=399 => Some(Self::Redirection),
            400..=499 => Some(Self::ClientError),
            500..=599 => Some(Self::ServerError),
            _ => None,
        }
    }

    pub fn metric_suffix(&self) -> &'static str {
        match self {
            Self::Success => "status.success",
            Self::Redirection => "status.redirection",
            Self::ClientError => "status.error.client",
            Self::ServerError => "status.error.server",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// Gauge value reported at `timestamp` (seconds since the epoch).
    Gauge { timestamp: i64 },
    DeltaCounter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub kind: PointKind,
    pub source: String,
    pub tags: Tags,
}

/// Naming and tagging shared by every request.
#[derive(Debug, Clone, Default)]
pub struct MetricNames {
    prefix: String,
    source: String,
    base_tags: Tags,
}

impl MetricNames {
    pub fn new(prefix: impl Into<String>, source: impl Into<String>, base_tags: Tags) -> Self {
        Self {
            prefix: prefix.into(),
            source: source.into(),
            base_tags,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self, suffix: &str) -> String {
        let prefix = self.prefix.trim_end_matches('.');
        if prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{prefix}.{suffix}")
        }
    }

    /// Base tags overlaid with the request tags. Empty request values are left out.
    pub fn request_tags(&self, meta: &RequestMeta) -> Tags {
        let mut tags = self.base_tags.clone();
        let request_tags = [
            (TAG_PATH, meta.path.as_str()),
            (TAG_METHOD, meta.method.as_str()),
            (TAG_USER_AGENT, meta.user_agent.as_str()),
            (TAG_CLIENT_IP, meta.client_ip.as_deref().unwrap_or_default()),
        ];
        for (key, value) in request_tags {
            if !value.is_empty() {
                tags.insert(key.to_string(), value.to_string());
            }
        }
        tags
    }

    pub fn assemble(&self, request: &CompletedRequest) -> Vec<MetricPoint> {
        let tags = self.request_tags(&request.meta);
        let timestamp = request.timing.timestamp();

        let gauge = |suffix: &str, value: f64| MetricPoint {
            name: self.name(suffix),
            value,
            kind: PointKind::Gauge { timestamp },
            source: self.source.clone(),
            tags: tags.clone(),
        };

        let mut points = vec![
            gauge("latency", request.timing.latency_micros()),
            gauge("bytes.in", request.meta.bytes_in as f64),
            gauge("bytes.out", request.bytes_out as f64),
        ];

        if let Some(class) = StatusClass::classify(request.status) {
            points.push(MetricPoint {
                name: self.name(class.metric_suffix()),
                value: 1.0,
                kind: PointKind::DeltaCounter,
                source: self.source.clone(),
                tags,
            });
        }

        points
    }
}
