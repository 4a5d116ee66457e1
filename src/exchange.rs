//! The per-request object passed through the middleware chain.

use std::io;

use http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::context::RequestContext;
use crate::errors::{ChainError, Errors};
use crate::request::Request;
use crate::writer::ResponseWriter;

/// Everything one request owns while it moves through the chain.
///
/// Each middleware receives the `Exchange` by value, may inspect or modify
/// it, hands it to [`Next::run`](crate::middleware::Next::run) and gets it
/// back once the rest of the chain has finished. Nothing in here is shared
/// with other requests.
///
/// The request itself is handed to the route handler by value, so after the
/// chain returns [`request`](Self::request) is `None`. Stages that need request
/// data after yielding snapshot it first.
pub struct Exchange {
    request: Option<Request>,
    context: RequestContext,
    writer: Box<dyn ResponseWriter>,
    errors: Errors,
}

impl Exchange {
    pub fn new(request: Request, writer: impl ResponseWriter) -> Self {
        Self {
            request: Some(request),
            context: RequestContext::default(),
            writer: Box::new(writer),
            errors: Errors::new(),
        }
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn request_mut(&mut self) -> Option<&mut Request> {
        self.request.as_mut()
    }

    /// Takes the request out for the handler, giving it a copy of the context.
    pub(crate) fn take_request(&mut self) -> Option<Request> {
        let mut request = self.request.take()?;
        request.context = self.context.clone();
        Some(request)
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// The active sink and the error accumulator, borrowed together.
    pub(crate) fn sink(&mut self) -> (&mut dyn ResponseWriter, &mut Errors) {
        (self.writer.as_mut(), &mut self.errors)
    }

    /// Records an error on the chain's accumulator.
    pub fn record_error(&mut self, error: ChainError) {
        self.errors.push(error);
    }

    /// The active response sink.
    pub fn writer(&mut self) -> &mut dyn ResponseWriter {
        self.writer.as_mut()
    }

    /// Replaces the active sink with `wrap(current)`.
    pub fn wrap_writer<W, F>(&mut self, wrap: F)
    where
        W: ResponseWriter,
        F: FnOnce(Box<dyn ResponseWriter>) -> W,
    {
        let current = std::mem::replace(&mut self.writer, Box::new(Detached::default()));
        self.writer = Box::new(wrap(current));
    }

    /// If the active sink is a `W`, splits it with `split`: the returned
    /// sink becomes active again and the rest is handed back. Returns `None`
    /// and leaves the sink untouched otherwise.
    pub fn unwrap_writer<W, R, F>(&mut self, split: F) -> Option<R>
    where
        W: ResponseWriter,
        F: FnOnce(W) -> (Box<dyn ResponseWriter>, R),
    {
        if !self.writer.as_any().is::<W>() {
            debug!(wanted = std::any::type_name::<W>(), "active writer was replaced downstream");
            return None;
        }
        let current = std::mem::replace(&mut self.writer, Box::new(Detached::default()));
        let writer = *current.into_any().downcast::<W>().ok()?;
        let (restored, rest) = split(writer);
        self.writer = restored;
        Some(rest)
    }

    /// Consumes the exchange, returning its sink.
    pub fn into_writer(self) -> Box<dyn ResponseWriter> {
        self.writer
    }

    /// Consumes the exchange, returning its sink and the recorded errors.
    pub fn into_parts(self) -> (Box<dyn ResponseWriter>, Errors) {
        (self.writer, self.errors)
    }
}

/// Placeholder sink that only exists while the real one is being swapped.
#[derive(Default)]
struct Detached(HeaderMap);

impl ResponseWriter for Detached {
    fn status(&self) -> StatusCode { StatusCode::OK }
    fn set_status(&mut self, _: StatusCode) {}
    fn headers(&self) -> &HeaderMap { &self.0 }
    fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.0 }
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::NotConnected, "writer detached"))
    }
    fn finish(self: Box<Self>) {}
    fn as_any(&self) -> &dyn std::any::Any { self }
    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any + Send> { self }
}
