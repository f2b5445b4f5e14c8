//! Response observation for writer-style handlers
//!
//! [`StatusRecorder`] wraps any [`ResponseWriter`] and records the status code
//! and the number of body bytes accepted by the underlying writer. Every call
//! is forwarded unchanged.
//!
//! The status is fixed by the first `write_header` call, or by the first
//! body write, which implies 200. Later `write_header` calls do not change
//! what is recorded.

use axum::http::{HeaderMap, StatusCode};
use std::io;

/// Status the recorder reports when the handler never sets one.
pub const DEFAULT_STATUS: u16 = 200;

/// The outbound side of a writer-style handler.
pub trait ResponseWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    fn write_header(&mut self, status: u16);

    /// Writes body bytes and returns how many the writer accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn write_header(&mut self, status: u16) {
        (**self).write_header(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }
}

pub struct StatusRecorder<W> {
    inner: W,
    status: Option<u16>,
    bytes_written: u64,
}

impl<W: ResponseWriter> StatusRecorder<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            status: None,
            bytes_written: 0,
        }
    }

    pub fn status(&self) -> u16 {
        self.status.unwrap_or(DEFAULT_STATUS)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl<W: ResponseWriter> ResponseWriter for StatusRecorder<W> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: u16) {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(DEFAULT_STATUS);
        }
        let written = self.inner.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }
}

impl<W: ResponseWriter> io::Write for StatusRecorder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// In-memory response, useful to run writer-style handlers inside a server
/// that expects a complete response value.
#[derive(Debug, Default, Clone)]
pub struct BufferedResponse {
    status: Option<u16>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// The explicitly written status, or 200.
    pub fn status(&self) -> StatusCode {
        self.status
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        let status = self.status();
        (status, self.headers, self.body)
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: u16) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(DEFAULT_STATUS);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use std::io::Write as _;

    /// Accepts at most `limit` bytes per call, like a short write on a socket.
    struct ShortWriter {
        inner: BufferedResponse,
        limit: usize,
    }

    impl ResponseWriter for ShortWriter {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            self.inner.headers_mut()
        }

        fn write_header(&mut self, status: u16) {
            self.inner.write_header(status)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.inner.write(&buf[..n])
        }
    }

    struct FailingWriter {
        headers: HeaderMap,
    }

    impl ResponseWriter for FailingWriter {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_header(&mut self, _status: u16) {}

        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
        }
    }

    #[test]
    fn test_status_defaults_to_ok() {
        let mut response = BufferedResponse::new();
        let recorder = StatusRecorder::new(&mut response);
        assert_eq!(recorder.status(), 200);
        assert_eq!(recorder.bytes_written(), 0);
    }

    #[test]
    fn test_records_and_forwards_status() {
        let mut response = BufferedResponse::new();
        {
            let mut recorder = StatusRecorder::new(&mut response);
            recorder.write_header(404);
            assert_eq!(recorder.status(), 404);
        }
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_first_status_wins() {
        let mut response = BufferedResponse::new();
        let mut recorder = StatusRecorder::new(&mut response);
        recorder.write_header(200);
        recorder.write_header(500);
        assert_eq!(recorder.status(), 200);
        drop(recorder);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_body_write_implies_ok() {
        let mut response = BufferedResponse::new();
        let mut recorder = StatusRecorder::new(&mut response);
        ResponseWriter::write(&mut recorder, b"early").unwrap();
        recorder.write_header(404);
        assert_eq!(recorder.status(), 200);
        drop(recorder);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_counts_bytes_across_writes() {
        let mut response = BufferedResponse::new();
        let mut recorder = StatusRecorder::new(&mut response);
        ResponseWriter::write(&mut recorder, b"Hello ").unwrap();
        writeln!(recorder, "{}!", "World").unwrap();
        assert_eq!(recorder.bytes_written(), 13);
        drop(recorder);
        assert_eq!(response.body(), b"Hello World!\n");
    }

    #[test]
    fn test_counts_only_accepted_bytes() {
        let mut writer = ShortWriter {
            inner: BufferedResponse::new(),
            limit: 4,
        };
        let mut recorder = StatusRecorder::new(&mut writer);
        assert_eq!(ResponseWriter::write(&mut recorder, b"abcdefgh").unwrap(), 4);
        assert_eq!(recorder.bytes_written(), 4);
        drop(recorder);
        assert_eq!(writer.inner.body(), b"abcd");
    }

    #[test]
    fn test_write_errors_are_passed_through() {
        let mut writer = FailingWriter {
            headers: HeaderMap::new(),
        };
        let mut recorder = StatusRecorder::new(&mut writer);
        let err = ResponseWriter::write(&mut recorder, b"data").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(recorder.bytes_written(), 0);
    }

    #[test]
    fn test_headers_are_forwarded() {
        let mut response = BufferedResponse::new();
        {
            let mut recorder = StatusRecorder::new(&mut response);
            recorder
                .headers_mut()
                .insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        }
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
    }
}
