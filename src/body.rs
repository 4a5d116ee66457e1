//! Request body stream.
//!
//! A [`Body`] is a type-erased stream of [`Bytes`] frames. The server hands
//! handlers the live hyper stream; middleware that needs to look at the bytes
//! reads it fully with [`Body::to_bytes`] and puts a fresh `Body` built from
//! the same bytes back in its place.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::{Body as HttpBody, Frame, SizeHint};

use crate::error::{BoxError, Error};

/// A streaming HTTP body.
pub struct Body(UnsyncBoxBody<Bytes, BoxError>);

impl Body {
    /// Wraps any `http_body::Body` yielding [`Bytes`].
    pub fn new<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self(body.map_err(Into::into).boxed_unsync())
    }

    /// A body that ends immediately.
    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new())
    }

    /// Consumes the stream and returns every data frame concatenated.
    pub async fn to_bytes(self) -> Result<Bytes, Error> {
        let collected = self.0.collect().await?;
        Ok(collected.to_bytes())
    }
}

impl Default for Body {
    fn default() -> Self { Self::empty() }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::new(Full::new(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self { Self::from(Bytes::from(bytes)) }
}

impl From<String> for Body {
    fn from(text: String) -> Self { Self::from(Bytes::from(text)) }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self { Self::from(Bytes::from_static(text.as_bytes())) }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        Pin::new(&mut self.0).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    #[tokio::test]
    async fn full_body_reads_back() {
        let body = Body::from("hello");
        assert_eq!(body.to_bytes().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn empty_body_reads_nothing() {
        assert!(Body::empty().to_bytes().await.unwrap().is_empty());
    }

    struct Failing;

    impl HttpBody for Failing {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, std::io::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::other("reset by peer"))))
        }
    }

    #[tokio::test]
    async fn read_failure_surfaces_as_body_error() {
        let err = Body::new(Failing).to_bytes().await.unwrap_err();
        assert!(matches!(err, Error::Body(_)));
        assert_eq!(err.to_string(), "body: reset by peer");
    }

    struct Chunked(std::collections::VecDeque<&'static str>);

    impl HttpBody for Chunked {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
            Poll::Ready(self.0.pop_front().map(|c| Ok(Frame::data(Bytes::from_static(c.as_bytes())))))
        }
    }

    #[tokio::test]
    async fn chunked_stream_is_concatenated() {
        let body = Body::new(Chunked(["ab", "cd", "e"].into()));
        assert_eq!(body.to_bytes().await.unwrap(), Bytes::from_static(b"abcde"));
    }
}
