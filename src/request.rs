//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};

use crate::body::Body;
use crate::context::RequestContext;
use crate::error::{BoxError, Error};

/// An incoming HTTP request.
///
/// The head is fixed once the request is built. The body is a stream that
/// can be taken exactly once and replaced, which is how middleware reads it
/// without leaving handlers an empty body.
pub struct Request {
    pub(crate) head: Parts,
    pub(crate) body: Option<Body>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) context: RequestContext,
}

impl Request {
    /// Builds a request from an `http::Request` with any bytes body.
    pub fn from_http<B>(req: http::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (head, body) = req.into_parts();
        Self::from_parts(head, Some(Body::new(body)))
    }

    /// Builds a request from its head and an optional body.
    pub fn from_parts(head: Parts, body: Option<Body>) -> Self {
        Self {
            head,
            body,
            params: HashMap::new(),
            remote_addr: None,
            context: RequestContext::default(),
        }
    }

    /// Sets the peer address the request arrived from.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// The raw query string without the leading `?`, or `""`.
    pub fn query(&self) -> &str {
        self.head.uri.query().unwrap_or("")
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as missing.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// State published by earlier stages (correlation id, client label).
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// The address of the calling client.
    ///
    /// The framework runs behind a reverse proxy, so the proxy's headers win:
    /// the first `X-Forwarded-For` hop, then `X-Real-IP`, then the socket
    /// peer. Empty when none is known.
    pub fn client_ip(&self) -> String {
        let forwarded = self
            .header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_owned();
        }
        if let Some(ip) = self.header("x-real-ip").map(str::trim).filter(|v| !v.is_empty()) {
            return ip.to_owned();
        }
        self.remote_addr.map(|a| a.ip().to_string()).unwrap_or_default()
    }

    /// Whether a body stream is attached.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Detaches the body stream, leaving the request without one.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Attaches `body` as the request's body stream.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = Some(body.into());
    }

    /// Reads the whole body. A request without a body yields empty bytes.
    ///
    /// The stream is consumed; a second call returns empty bytes.
    pub async fn bytes(&mut self) -> Result<Bytes, Error> {
        match self.body.take() {
            Some(body) => body.to_bytes().await,
            None => Ok(Bytes::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> http::request::Builder {
        http::Request::get(uri)
    }

    #[test]
    fn head_accessors() {
        let req = Request::from_http(get("/items?x=1&y=2").body(Body::empty()).unwrap());
        assert_eq!(*req.method(), Method::GET);
        assert_eq!(req.path(), "/items");
        assert_eq!(req.query(), "x=1&y=2");
    }

    #[test]
    fn missing_query_is_empty() {
        let req = Request::from_http(get("/items").body(Body::empty()).unwrap());
        assert_eq!(req.query(), "");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::from_http(
            get("/").header("Client-Id", "abc").body(Body::empty()).unwrap(),
        );
        assert_eq!(req.header("client-id"), Some("abc"));
        assert_eq!(req.header("CLIENT-ID"), Some("abc"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let req = Request::from_http(
            get("/")
                .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
                .header("x-real-ip", "198.51.100.2")
                .body(Body::empty())
                .unwrap(),
        )
        .with_remote_addr("127.0.0.1:9000".parse().unwrap());
        assert_eq!(req.client_ip(), "203.0.113.7");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_peer() {
        let req = Request::from_http(
            get("/").header("x-real-ip", "198.51.100.2").body(Body::empty()).unwrap(),
        );
        assert_eq!(req.client_ip(), "198.51.100.2");

        let req = Request::from_http(get("/").body(Body::empty()).unwrap())
            .with_remote_addr("192.0.2.10:443".parse().unwrap());
        assert_eq!(req.client_ip(), "192.0.2.10");

        let req = Request::from_http(get("/").body(Body::empty()).unwrap());
        assert_eq!(req.client_ip(), "");
    }

    #[tokio::test]
    async fn body_reads_once() {
        let mut req = Request::from_http(get("/").body(Body::from("payload")).unwrap());
        assert_eq!(req.bytes().await.unwrap(), Bytes::from_static(b"payload"));
        assert!(!req.has_body());
        assert!(req.bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replaced_body_is_readable() {
        let mut req = Request::from_http(get("/").body(Body::from("first")).unwrap());
        let taken = req.take_body().unwrap().to_bytes().await.unwrap();
        req.set_body(taken.clone());
        assert_eq!(req.bytes().await.unwrap(), taken);
    }
}
