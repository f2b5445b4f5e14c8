//! Error types for sender initialization and point emission.
//!
//! Initialization errors are fatal: the middleware must not be installed when
//! [`InitError`] is returned. Emission errors never reach the request path;
//! the instrumentation logs and drops them.

/// Creating the metrics sender failed.
#[derive(Debug, thiserror::Error)]
#[error("error creating wavefront sender: {kind}")]
pub struct InitError {
    #[source]
    pub kind: InitErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum InitErrorKind {
    #[error("invalid server URL {server:?}: {reason}")]
    InvalidServer { server: String, reason: String },

    #[error("missing API token")]
    MissingToken,

    #[error("missing source, every point needs one")]
    MissingSource,

    #[error("{0} must be greater than zero")]
    InvalidTuning(&'static str),

    #[error("no tokio runtime available to run the flush task")]
    NoRuntime,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl From<InitErrorKind> for InitError {
    fn from(kind: InitErrorKind) -> Self {
        Self { kind }
    }
}

impl InitError {
    pub fn invalid_server(server: impl Into<String>, reason: impl Into<String>) -> Self {
        InitErrorKind::InvalidServer {
            server: server.into(),
            reason: reason.into(),
        }
        .into()
    }

    pub fn is_invalid_server(&self) -> bool {
        matches!(self.kind, InitErrorKind::InvalidServer { .. })
    }
}

/// A point could not be handed to the sink.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("metric buffer is full, point dropped")]
    BufferFull,

    #[error("sender is closed")]
    Closed,

    #[error("invalid point: {0}")]
    InvalidPoint(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("ingestion rejected with HTTP {status}")]
    Rejected { status: u16 },
}
