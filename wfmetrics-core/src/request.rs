use axum::http::{header, HeaderMap, Request};

use crate::client_ip::{client_ip, peer_addr};

/// Request facts that end up as point tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub path: String,
    pub method: String,
    pub user_agent: String,
    pub client_ip: Option<String>,
    /// Declared `Content-Length`, 0 when absent.
    pub bytes_in: u64,
}

impl RequestMeta {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        Self::from_components(
            req.method().as_str(),
            req.uri().path(),
            req.headers(),
            client_ip(req.headers(), peer_addr(req.extensions())),
        )
    }

    fn from_components(
        method: &str,
        path: &str,
        headers: &HeaderMap,
        client_ip: Option<String>,
    ) -> Self {
        Self {
            path: path.to_string(),
            method: method.to_string(),
            user_agent: headers
                .get(header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            client_ip,
            bytes_in: content_length(headers),
        }
    }
}

pub fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0)
}
