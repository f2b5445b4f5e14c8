use axum::body::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use wfmetrics_core::scope::RequestScope;

/// Response body which counts the data bytes handed to the server.
///
/// The request scope is released at end of stream, or when the body is
/// dropped early (client disconnect, server shutdown).
pub struct ObservedBody<B> {
    inner: Pin<Box<B>>,
    scope: Option<RequestScope>,
}

impl<B> ObservedBody<B> {
    pub fn new(inner: B, scope: RequestScope) -> Self {
        Self {
            inner: Box::pin(inner),
            scope: Some(scope),
        }
    }
}

impl<B> HttpBody for ObservedBody<B>
where
    B: HttpBody<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = this.inner.as_mut().poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let (Some(data), Some(scope)) = (frame.data_ref(), this.scope.as_mut()) {
                    scope.add_bytes_out(data.len() as u64);
                }
            }
            Poll::Ready(None) => drop(this.scope.take()),
            _ => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
