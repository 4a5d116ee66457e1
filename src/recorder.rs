//! Transparent response-capturing decorator.

use std::any::Any;
use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};

use crate::writer::ResponseWriter;

/// Wraps a [`ResponseWriter`] and mirrors what passes through it.
///
/// Every write is appended to an in-memory copy and then forwarded to the
/// wrapped sink unchanged, one call for one call. The wrapped sink's result,
/// including failures, is returned as-is. `set_status` is remembered and
/// forwarded; every other method is plain delegation.
pub struct Recorder {
    inner: Box<dyn ResponseWriter>,
    body: BytesMut,
    status: StatusCode,
}

impl Recorder {
    /// Wraps `inner`. The captured status starts at `200 OK`.
    pub fn new(inner: Box<dyn ResponseWriter>) -> Self {
        Self { inner, body: BytesMut::new(), status: StatusCode::OK }
    }

    /// Everything written so far, concatenated.
    pub fn captured_body(&self) -> &[u8] {
        &self.body
    }

    /// The last status set through the recorder, or `200 OK`.
    pub fn captured_status(&self) -> StatusCode {
        self.status
    }

    /// Splits into the wrapped sink, the captured body and the captured status.
    pub fn into_parts(self) -> (Box<dyn ResponseWriter>, Bytes, StatusCode) {
        (self.inner, self.body.freeze(), self.status)
    }
}

impl ResponseWriter for Recorder {
    fn status(&self) -> StatusCode {
        self.inner.status()
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        self.inner.set_status(status);
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(data);
        self.inner.write(data)
    }

    fn finish(self: Box<Self>) {
        self.inner.finish();
    }

    fn as_any(&self) -> &dyn Any { self }
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> { self }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http::header::CONTENT_TYPE;

    use crate::writer::BufferedWriter;

    fn unwrap_buffered(writer: Box<dyn ResponseWriter>) -> BufferedWriter {
        *writer.into_any().downcast::<BufferedWriter>().unwrap()
    }

    #[test]
    fn writes_are_mirrored_and_forwarded_chunk_for_chunk() {
        let mut rec = Recorder::new(Box::new(BufferedWriter::new()));
        let chunks: [&[u8]; 4] = [b"{\"id\"", b":", b"", b"7}"];
        for chunk in chunks {
            assert_eq!(rec.write(chunk).unwrap(), chunk.len());
        }
        assert_eq!(rec.captured_body(), b"{\"id\":7}");

        let (inner, body, _) = rec.into_parts();
        assert_eq!(body, Bytes::from_static(b"{\"id\":7}"));
        let inner = unwrap_buffered(inner);
        let seen: Vec<&[u8]> = inner.chunks().iter().map(|c| c.as_ref()).collect();
        assert_eq!(seen, chunks);
    }

    #[test]
    fn status_is_recorded_and_forwarded() {
        let mut rec = Recorder::new(Box::new(BufferedWriter::new()));
        rec.set_status(StatusCode::CREATED);
        assert_eq!(rec.captured_status(), StatusCode::CREATED);
        assert_eq!(rec.status(), StatusCode::CREATED);

        let (inner, _, status) = rec.into_parts();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(unwrap_buffered(inner).status(), StatusCode::CREATED);
    }

    #[test]
    fn status_defaults_to_ok() {
        let mut rec = Recorder::new(Box::new(BufferedWriter::new()));
        rec.write(b"hi").unwrap();
        assert_eq!(rec.captured_status(), StatusCode::OK);
    }

    #[test]
    fn headers_pass_through() {
        let mut rec = Recorder::new(Box::new(BufferedWriter::new()));
        rec.headers_mut().insert(CONTENT_TYPE, "application/json".parse().unwrap());
        assert_eq!(rec.headers()[CONTENT_TYPE], "application/json");

        let (inner, _, _) = rec.into_parts();
        assert_eq!(unwrap_buffered(inner).headers()[CONTENT_TYPE], "application/json");
    }

    struct Broken;

    impl ResponseWriter for Broken {
        fn status(&self) -> StatusCode { StatusCode::OK }
        fn set_status(&mut self, _: StatusCode) {}
        fn headers(&self) -> &HeaderMap { unreachable!() }
        fn headers_mut(&mut self) -> &mut HeaderMap { unreachable!() }
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"))
        }
        fn finish(self: Box<Self>) {}
        fn as_any(&self) -> &dyn Any { self }
        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> { self }
    }

    #[test]
    fn sink_failure_is_returned_unchanged() {
        let mut rec = Recorder::new(Box::new(Broken));
        let err = rec.write(b"lost").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(err.to_string(), "peer reset");
        // mirroring is best-effort and still saw the bytes
        assert_eq!(rec.captured_body(), b"lost");
    }
}
