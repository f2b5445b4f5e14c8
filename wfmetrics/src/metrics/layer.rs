//! Tower middleware recording request metrics

use axum::body::{Body, Bytes};
use axum::http::{Request, Response, StatusCode};
use axum::BoxError;
use http_body::Body as HttpBody;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use wfmetrics_core::request::RequestMeta;
use wfmetrics_core::scope::RequestScope;
use wfmetrics_core::Instrumentation;

use super::body::ObservedBody;

/// Layer that records latency, payload sizes and status class of every
/// request passing through it.
#[derive(Clone)]
pub struct MetricsLayer {
    instrumentation: Instrumentation,
}

impl MetricsLayer {
    pub fn new(instrumentation: Instrumentation) -> Self {
        Self { instrumentation }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            instrumentation: self.instrumentation.clone(),
        }
    }
}

/// Service that records request metrics
///
/// The points of a request are recorded once the response body has been
/// streamed, or when the body or the response future is dropped.
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    instrumentation: Instrumentation,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let mut scope =
            RequestScope::begin(self.instrumentation.clone(), RequestMeta::from_request(&req));

        Box::pin(async move {
            let response = match inner.call(req).await {
                Ok(response) => response,
                Err(e) => {
                    // The server will not send a response for this request.
                    scope.set_status(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
                    return Err(e);
                }
            };

            scope.set_status(response.status().as_u16());
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(
                parts,
                Body::new(ObservedBody::new(body, scope)),
            ))
        })
    }
}
