//! Direct ingestion sender
//!
//! Points are formatted into Wavefront lines and pushed into a bounded
//! buffer. A background task drains the buffer every flush interval and
//! POSTs the lines in batches to `<server>/report?f=wavefront`.

use async_trait::async_trait;
use axum::http::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use super::format::{format_delta_counter, format_metric};
use super::MetricSink;
use crate::error::{EmitError, InitError, InitErrorKind};
use crate::settings::{MetricsConfig, Tags};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct SenderStats {
    sent: AtomicU64,
    dropped: AtomicU64,
    failed_batches: AtomicU64,
}

pub struct DirectSender {
    buffer: mpsc::Sender<String>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<SenderStats>,
}

impl DirectSender {
    /// Validates the configuration and starts the flush task on the current
    /// tokio runtime.
    pub fn new(config: &MetricsConfig) -> Result<Self, InitError> {
        let report_url = report_url(&config.server)?;

        if config.expose_token().trim().is_empty() {
            return Err(InitErrorKind::MissingToken.into());
        }
        if config.batch_size == 0 {
            return Err(InitErrorKind::InvalidTuning("batch_size").into());
        }
        if config.max_buffer_size == 0 {
            return Err(InitErrorKind::InvalidTuning("max_buffer_size").into());
        }
        if config.flush_interval == 0 {
            return Err(InitErrorKind::InvalidTuning("flush_interval").into());
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| InitErrorKind::NoRuntime)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(InitErrorKind::Client)?;

        let (buffer, receiver) = mpsc::channel(config.max_buffer_size);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(SenderStats::default());

        let flusher = Flusher {
            client,
            report_url,
            token: config.token.clone(),
            batch_size: config.batch_size,
            receiver,
            stats: stats.clone(),
        };

        info!(
            server = %config.server,
            batch_size = config.batch_size,
            max_buffer_size = config.max_buffer_size,
            flush_interval = config.flush_interval,
            "Starting wavefront direct sender"
        );
        let worker = runtime.spawn(flusher.run(config.flush_interval(), shutdown_rx));

        Ok(Self {
            buffer,
            shutdown,
            worker: Mutex::new(Some(worker)),
            stats,
        })
    }

    /// Number of points accepted by the backend.
    pub fn points_sent(&self) -> u64 {
        self.stats.sent.load(Ordering::Relaxed)
    }

    /// Number of points dropped because the buffer was full.
    pub fn points_dropped(&self) -> u64 {
        self.stats.dropped.load(Ordering::Relaxed)
    }

    /// Number of batches the backend did not accept.
    pub fn batches_failed(&self) -> u64 {
        self.stats.failed_batches.load(Ordering::Relaxed)
    }

    fn enqueue(&self, line: String) -> Result<(), EmitError> {
        match self.buffer.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Err(EmitError::BufferFull)
            }
            Err(TrySendError::Closed(_)) => Err(EmitError::Closed),
        }
    }
}

#[async_trait]
impl MetricSink for DirectSender {
    fn send_metric(
        &self,
        name: &str,
        value: f64,
        timestamp: i64,
        source: &str,
        tags: &Tags,
    ) -> Result<(), EmitError> {
        self.enqueue(format_metric(name, value, timestamp, source, tags)?)
    }

    fn send_delta_counter(
        &self,
        name: &str,
        delta: f64,
        source: &str,
        tags: &Tags,
    ) -> Result<(), EmitError> {
        self.enqueue(format_delta_counter(name, delta, source, tags)?)
    }

    async fn close(&self) {
        let _ = self.shutdown.send(true);
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Wavefront flush task ended abnormally: {}", e);
            }
        }
    }
}

fn report_url(server: &str) -> Result<Url, InitError> {
    let mut url =
        Url::parse(server.trim()).map_err(|e| InitError::invalid_server(server, e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(InitError::invalid_server(
            server,
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(InitError::invalid_server(server, "missing host"));
    }

    let path = format!("{}/report", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some("f=wavefront"));
    Ok(url)
}

struct Flusher {
    client: reqwest::Client,
    report_url: Url,
    token: SecretString,
    batch_size: usize,
    receiver: mpsc::Receiver<String>,
    stats: Arc<SenderStats>,
}

impl Flusher {
    async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.flush().await,
                _ = shutdown.changed() => {
                    // Closed or dropped; either way drain what is left.
                    self.receiver.close();
                    self.flush().await;
                    break;
                }
            }
        }
        debug!("Wavefront flush task stopped");
    }

    async fn flush(&mut self) {
        let mut batch = Vec::new();
        loop {
            batch.clear();
            while batch.len() < self.batch_size {
                match self.receiver.try_recv() {
                    Ok(line) => batch.push(line),
                    Err(_) => break,
                }
            }
            if batch.is_empty() {
                break;
            }
            let full = batch.len() == self.batch_size;
            self.report(&batch).await;
            if !full {
                break;
            }
        }
    }

    async fn report(&self, lines: &[String]) {
        match self.post(lines.join("\n")).await {
            Ok(()) => {
                self.stats
                    .sent
                    .fetch_add(lines.len() as u64, Ordering::Relaxed);
                debug!("Reported {} points to wavefront", lines.len());
            }
            Err(e) => {
                self.stats.failed_batches.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to report {} points to wavefront: {}", lines.len(), e);
            }
        }
    }

    async fn post(&self, body: String) -> Result<(), EmitError> {
        let response = self
            .client
            .post(self.report_url.as_str())
            .bearer_auth(self.token.expose_secret())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(EmitError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &str) -> MetricsConfig {
        MetricsConfig::new(server, "test-token").with_batching(10, 100)
    }

    async fn mock_backend(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/report"))
            .and(query_param("f", "wavefront"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    async fn bodies(server: &MockServer) -> Vec<String> {
        server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .map(|r| String::from_utf8(r.body).unwrap())
            .collect()
    }

    #[test]
    fn test_report_url() {
        let url = report_url("https://try.wavefront.com").unwrap();
        assert_eq!(url.as_str(), "https://try.wavefront.com/report?f=wavefront");

        let url = report_url("http://proxy.local:8080/wf/").unwrap();
        assert_eq!(url.as_str(), "http://proxy.local:8080/wf/report?f=wavefront");
    }

    #[tokio::test]
    async fn test_invalid_server_is_an_init_error() {
        for server in ["not a url", "ftp://try.wavefront.com", "/relative/path", ""] {
            let err = DirectSender::new(&config(server)).err().unwrap();
            assert!(err.is_invalid_server(), "{server}: {err}");
        }
    }

    #[tokio::test]
    async fn test_missing_token_and_zero_tuning() {
        let err = DirectSender::new(&MetricsConfig::new("https://try.wavefront.com", " "))
            .err()
            .unwrap();
        assert!(matches!(err.kind, InitErrorKind::MissingToken));

        let err = DirectSender::new(&config("https://try.wavefront.com").with_batching(0, 10))
            .err()
            .unwrap();
        assert!(matches!(err.kind, InitErrorKind::InvalidTuning("batch_size")));

        let err = DirectSender::new(&config("https://try.wavefront.com").with_flush_interval(0))
            .err()
            .unwrap();
        assert!(matches!(err.kind, InitErrorKind::InvalidTuning("flush_interval")));
    }

    #[test]
    fn test_needs_a_runtime() {
        let err = DirectSender::new(&config("https://try.wavefront.com"))
            .err()
            .unwrap();
        assert!(matches!(err.kind, InitErrorKind::NoRuntime));
    }

    #[tokio::test]
    async fn test_close_flushes_buffered_points() {
        let server = mock_backend(202).await;
        let sender = DirectSender::new(&config(&server.uri())).unwrap();

        sender
            .send_metric("app.latency", 1500.0, 1_700_000_000, "my-app", &Tags::new())
            .unwrap();
        sender
            .send_delta_counter("app.status.success", 1.0, "my-app", &Tags::new())
            .unwrap();
        sender.close().await;

        let bodies = bodies(&server).await;
        assert_eq!(
            bodies,
            vec![
                "\"app.latency\" 1500 1700000000 source=\"my-app\"\n\"\u{2206}app.status.success\" 1 source=\"my-app\""
                    .to_string()
            ]
        );
        assert_eq!(sender.points_sent(), 2);
        assert_eq!(sender.batches_failed(), 0);
    }

    #[tokio::test]
    async fn test_batches_are_split_by_batch_size() {
        let server = mock_backend(200).await;
        let sender = DirectSender::new(&config(&server.uri()).with_batching(2, 100)).unwrap();

        for i in 0..5 {
            sender
                .send_metric("app.bytes.out", i as f64, 1, "my-app", &Tags::new())
                .unwrap();
        }
        sender.close().await;

        let line_counts: Vec<usize> = bodies(&server)
            .await
            .iter()
            .map(|b| b.lines().count())
            .collect();
        assert_eq!(line_counts, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_full_buffer_drops_points() {
        let server = mock_backend(200).await;
        let sender = DirectSender::new(&config(&server.uri()).with_batching(10, 2)).unwrap();

        let tags = Tags::new();
        assert!(sender.send_metric("a", 1.0, 1, "src", &tags).is_ok());
        assert!(sender.send_metric("b", 1.0, 1, "src", &tags).is_ok());
        assert!(matches!(
            sender.send_metric("c", 1.0, 1, "src", &tags),
            Err(EmitError::BufferFull)
        ));
        assert_eq!(sender.points_dropped(), 1);
        sender.close().await;
    }

    #[tokio::test]
    async fn test_rejected_batches_are_counted_not_retried() {
        let server = mock_backend(401).await;
        let sender = DirectSender::new(&config(&server.uri())).unwrap();

        sender
            .send_metric("app.latency", 1.0, 1, "src", &Tags::new())
            .unwrap();
        sender.close().await;

        assert_eq!(sender.batches_failed(), 1);
        assert_eq!(sender.points_sent(), 0);
        assert_eq!(bodies(&server).await.len(), 1);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let server = mock_backend(200).await;
        let sender = DirectSender::new(&config(&server.uri())).unwrap();
        sender.close().await;

        assert!(matches!(
            sender.send_metric("a", 1.0, 1, "src", &Tags::new()),
            Err(EmitError::Closed)
        ));
    }
}
