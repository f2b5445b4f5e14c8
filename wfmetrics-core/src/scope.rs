use crate::assembly::CompletedRequest;
use crate::instrumentation::Instrumentation;
use crate::observer::DEFAULT_STATUS;
use crate::request::RequestMeta;
use crate::timing::Stopwatch;

/// Observation state of one in-flight request.
///
/// Points are recorded exactly once, when the scope is dropped: after normal
/// completion, on early return, while unwinding from a panic, or when the
/// owning future is cancelled.
pub struct RequestScope {
    instrumentation: Instrumentation,
    meta: RequestMeta,
    stopwatch: Stopwatch,
    status: u16,
    bytes_out: u64,
}

impl RequestScope {
    pub fn begin(instrumentation: Instrumentation, meta: RequestMeta) -> Self {
        Self {
            instrumentation,
            meta,
            stopwatch: Stopwatch::start(),
            status: DEFAULT_STATUS,
            bytes_out: 0,
        }
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn add_bytes_out(&mut self, bytes: u64) {
        self.bytes_out += bytes;
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let completed = CompletedRequest {
            meta: std::mem::take(&mut self.meta),
            timing: self.stopwatch.stop(),
            status: self.status,
            bytes_out: self.bytes_out,
        };
        self.instrumentation.record(&completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MetricsConfig;
    use crate::sink::MemorySink;
    use std::sync::Arc;

    fn setup() -> (Instrumentation, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let config = MetricsConfig::new("debug", "").with_source("test");
        (Instrumentation::with_sink(&config, sink.clone()), sink)
    }

    fn meta() -> RequestMeta {
        RequestMeta {
            path: "/".to_string(),
            method: "GET".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_records_once_on_drop() {
        let (instrumentation, sink) = setup();
        let mut scope = RequestScope::begin(instrumentation, meta());
        scope.set_status(302);
        scope.add_bytes_out(5);
        scope.add_bytes_out(6);
        assert_eq!(scope.bytes_out(), 11);
        drop(scope);

        assert_eq!(
            sink.names(),
            vec!["latency", "bytes.in", "bytes.out", "status.redirection"]
        );
        assert_eq!(sink.points()[2].value, 11.0);
    }

    #[test]
    fn test_records_when_unwinding() {
        let (instrumentation, sink) = setup();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = RequestScope::begin(instrumentation, meta());
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert_eq!(sink.points().len(), 4);
        assert_eq!(sink.names()[3], "status.success");
    }
}
