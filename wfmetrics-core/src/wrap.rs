//! Wrapper for writer-style handlers
//!
//! A writer-style handler receives the response writer and the request and
//! writes status, headers and body itself. [`Instrumentation::wrap_handler`]
//! returns a handler of the same shape which records metrics around it.

use axum::http::Request;

use crate::instrumentation::Instrumentation;
use crate::observer::{ResponseWriter, StatusRecorder};
use crate::request::RequestMeta;
use crate::scope::RequestScope;

/// Recorder and scope of one call. Dropping it hands the recorded status and
/// size to the scope, which then records the points.
struct WriterExchange<'w> {
    recorder: StatusRecorder<&'w mut dyn ResponseWriter>,
    scope: RequestScope,
}

impl Drop for WriterExchange<'_> {
    fn drop(&mut self) {
        self.scope.set_status(self.recorder.status());
        self.scope.add_bytes_out(self.recorder.bytes_written());
    }
}

impl Instrumentation {
    pub fn wrap_handler<B, F>(
        &self,
        handler: F,
    ) -> impl Fn(&mut dyn ResponseWriter, &Request<B>) + Clone + Send + Sync + 'static
    where
        B: 'static,
        F: Fn(&mut dyn ResponseWriter, &Request<B>) + Clone + Send + Sync + 'static,
    {
        let instrumentation = self.clone();
        move |writer: &mut dyn ResponseWriter, request: &Request<B>| {
            let scope =
                RequestScope::begin(instrumentation.clone(), RequestMeta::from_request(request));
            let mut exchange = WriterExchange {
                recorder: StatusRecorder::new(writer),
                scope,
            };
            handler(&mut exchange.recorder, request);
        }
    }
}
