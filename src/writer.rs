//! The response sink.
//!
//! Handlers return [`Response`](crate::Response) values; the router writes them
//! into the active [`ResponseWriter`] of the request's
//! [`Exchange`](crate::Exchange). Middleware can swap that writer for a
//! decorator (see [`Recorder`](crate::Recorder)) to observe what is written
//! without changing it.
//!
//! ```text
//! handler → Response → router: set_status / headers_mut / write
//!                                   ↓
//!                     Box<dyn ResponseWriter>  (maybe decorated)
//!                                   ↓
//!                StreamWriter → hyper (head oneshot + body frames)
//! ```

use std::any::Any;
use std::convert::Infallible;
use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use hyper::body::{Body as HttpBody, Frame};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Capability interface of a response sink.
///
/// The head (status and headers) may be changed until the first body write;
/// after that the sink is *committed* and only body bytes go out.
pub trait ResponseWriter: Send + 'static {
    /// The status that is (or will be) sent.
    fn status(&self) -> StatusCode;

    /// Sets the response status.
    fn set_status(&mut self, status: StatusCode);

    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Writes one chunk of body bytes, committing the head if needed.
    ///
    /// Returns the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Ends the response. Commits the head if nothing was written.
    fn finish(self: Box<Self>);

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

// ── StreamWriter ──────────────────────────────────────────────────────────────

/// Status line and headers, handed to hyper when the writer commits.
pub(crate) struct Head {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
}

/// The server's sink: the head is sent once over a oneshot, every body write
/// becomes exactly one data frame on an unbounded channel.
pub(crate) struct StreamWriter {
    status: StatusCode,
    headers: HeaderMap,
    head: Option<oneshot::Sender<Head>>,
    frames: mpsc::UnboundedSender<Bytes>,
}

/// Creates a connected writer / head receiver / body triple.
pub(crate) fn stream() -> (StreamWriter, oneshot::Receiver<Head>, ChannelBody) {
    let (head_tx, head_rx) = oneshot::channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let writer = StreamWriter {
        status: StatusCode::OK,
        headers: HeaderMap::new(),
        head: Some(head_tx),
        frames: frames_tx,
    };
    (writer, head_rx, ChannelBody(frames_rx))
}

impl StreamWriter {
    fn commit(&mut self) {
        if let Some(tx) = self.head.take() {
            // The receiver is gone only if the connection was dropped; the
            // body channel reports that on the next write.
            let _ = tx.send(Head { status: self.status, headers: mem::take(&mut self.headers) });
        }
    }
}

impl ResponseWriter for StreamWriter {
    fn status(&self) -> StatusCode { self.status }

    fn set_status(&mut self, status: StatusCode) {
        if self.head.is_none() {
            warn!(
                current = self.status.as_u16(),
                ignored = status.as_u16(),
                "status set after the response was committed"
            );
            return;
        }
        self.status = status;
    }

    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.commit();
        if data.is_empty() {
            return Ok(0);
        }
        self.frames
            .send(Bytes::copy_from_slice(data))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))?;
        Ok(data.len())
    }

    fn finish(mut self: Box<Self>) {
        self.commit();
    }

    fn as_any(&self) -> &dyn Any { self }
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> { self }
}

/// Body half of [`stream`]: yields frames in the order they were written and
/// ends when the writer is dropped.
pub(crate) struct ChannelBody(mpsc::UnboundedReceiver<Bytes>);

impl HttpBody for ChannelBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        self.0.poll_recv(cx).map(|chunk| chunk.map(|b| Ok(Frame::data(b))))
    }
}

// ── BufferedWriter ────────────────────────────────────────────────────────────

/// An in-memory sink that keeps every write as a separate chunk.
///
/// Useful for driving a [`Pipeline`](crate::Pipeline) without a socket.
#[derive(Debug, Default)]
pub struct BufferedWriter {
    status: StatusCode,
    headers: HeaderMap,
    chunks: Vec<Bytes>,
    committed: bool,
}

impl BufferedWriter {
    pub fn new() -> Self { Self::default() }

    /// Every write, in order, with its original boundaries.
    pub fn chunks(&self) -> &[Bytes] { &self.chunks }

    /// All written bytes concatenated.
    pub fn body(&self) -> Vec<u8> { self.chunks.concat() }
}

impl ResponseWriter for BufferedWriter {
    fn status(&self) -> StatusCode { self.status }

    fn set_status(&mut self, status: StatusCode) {
        if !self.committed {
            self.status = status;
        }
    }

    fn headers(&self) -> &HeaderMap { &self.headers }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.committed = true;
        self.chunks.push(Bytes::copy_from_slice(data));
        Ok(data.len())
    }

    fn finish(self: Box<Self>) {}

    fn as_any(&self) -> &dyn Any { self }
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> { self }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http::header::CONTENT_TYPE;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn head_commits_on_first_write() {
        let (mut writer, head, body) = stream();
        writer.set_status(StatusCode::CREATED);
        writer.headers_mut().insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        writer.write(b"one").unwrap();
        writer.set_status(StatusCode::IM_A_TEAPOT);
        writer.write(b"two").unwrap();
        Box::new(writer).finish();

        let head = head.await.unwrap();
        assert_eq!(head.status, StatusCode::CREATED);
        assert_eq!(head.headers[CONTENT_TYPE], "text/plain");

        let mut body = body;
        let mut frames = Vec::new();
        while let Some(frame) = body.frame().await {
            frames.push(frame.unwrap().into_data().unwrap());
        }
        assert_eq!(frames, [Bytes::from_static(b"one"), Bytes::from_static(b"two")]);
    }

    #[tokio::test]
    async fn finish_without_writes_sends_head() {
        let (mut writer, head, _body) = stream();
        writer.set_status(StatusCode::NO_CONTENT);
        Box::new(writer).finish();
        assert_eq!(head.await.unwrap().status, StatusCode::NO_CONTENT);
    }

    #[test]
    fn write_after_disconnect_is_broken_pipe() {
        let (mut writer, _head, body) = stream();
        drop(body);
        let err = writer.write(b"late").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn buffered_writer_keeps_chunks() {
        let mut writer = BufferedWriter::new();
        writer.write(b"ab").unwrap();
        writer.write(b"c").unwrap();
        assert_eq!(writer.chunks().len(), 2);
        assert_eq!(writer.body(), b"abc");
        assert_eq!(writer.status(), StatusCode::OK);
    }
}
