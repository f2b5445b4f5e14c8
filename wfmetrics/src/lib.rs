pub mod app;
pub mod http;
pub mod init_telemetry;
pub mod metrics;
pub mod settings;

pub use metrics::MetricsLayer;
