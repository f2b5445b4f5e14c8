//! Demo application served by the `wfmetrics` binary.
//!
//! `/` and `/hello/{name}` are plain axum handlers behind [`MetricsLayer`].
//! `/legacy` is a writer-style handler instrumented with
//! [`Instrumentation::wrap_handler`] and bridged into axum.

use axum::extract::{Path, Request};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::env;
use tower_http::trace::TraceLayer;
use wfmetrics_core::observer::{BufferedResponse, ResponseWriter};
use wfmetrics_core::Instrumentation;

use crate::metrics::MetricsLayer;

pub fn create_router(instrumentation: Instrumentation) -> Router {
    let legacy = instrumentation.wrap_handler(legacy_hello);

    Router::new()
        .route("/", get(index))
        .route("/hello/{name}", get(hello))
        .fallback(not_found)
        .layer(MetricsLayer::new(instrumentation))
        // Added after the metrics layer, measured by the wrapper only.
        .route(
            "/legacy",
            get(move |req: Request| {
                let legacy = legacy.clone();
                async move {
                    let mut response = BufferedResponse::new();
                    legacy(&mut response, &req);
                    into_response(response)
                }
            }),
        )
        .layer(TraceLayer::new_for_http())
}

async fn index() -> &'static str {
    "Welcome!\n"
}

async fn hello(Path(name): Path<String>) -> String {
    format!("hello, {name}!\n")
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "404 not found\n")
}

fn legacy_hello(w: &mut dyn ResponseWriter, _req: &Request) {
    let target = env::var("TARGET").unwrap_or_else(|_| "World".to_string());
    w.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    w.write_header(StatusCode::OK.as_u16());
    if let Err(e) = w.write(format!("Hello {target}!\n").as_bytes()) {
        tracing::warn!("Failed to write legacy response: {}", e);
    }
}

fn into_response(response: BufferedResponse) -> Response {
    let (status, headers, body) = response.into_parts();
    (status, headers, body).into_response()
}
