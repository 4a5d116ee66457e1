//! Correlation stage: who is this request, and who sent it.

use http::HeaderMap;
use uuid::Uuid;

use super::Next;
use crate::exchange::Exchange;
use crate::logger;

/// Inbound header carrying a client-chosen correlation id.
pub const CLIENT_ID_HEADER: &str = "client-id";

/// Inbound header naming the calling client.
pub const CLIENT_USER_AGENT_HEADER: &str = "client-user-agent";

/// Client label published when [`CLIENT_USER_AGENT_HEADER`] is missing.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// A fresh, globally unique id (UUID v4, hyphenated).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Publishes the correlation id and client label into the request context.
///
/// A non-empty `client-id` header is trusted as-is; otherwise a new id is
/// minted. A missing or empty `client-user-agent` header becomes
/// `"unknown"`. Header bytes that are not valid UTF-8 are replaced, never
/// rejected. Never fails.
pub async fn correlation(mut ex: Exchange, next: Next) -> Exchange {
    let (id, client) = match ex.request() {
        Some(req) => (
            raw_header(req.headers(), CLIENT_ID_HEADER),
            raw_header(req.headers(), CLIENT_USER_AGENT_HEADER),
        ),
        None => (None, None),
    };

    let id = id.unwrap_or_else(new_id);
    let client = client.unwrap_or_else(|| UNKNOWN_CLIENT.to_owned());

    ex.context_mut().set_request_id(id);
    ex.context_mut().set_client_label(client);
    logger::ctx(ex.context()).debug("correlation published");

    next.run(ex).await
}

fn raw_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    use http::{HeaderValue, Method};

    use crate::body::Body;
    use crate::middleware::Pipeline;
    use crate::request::Request;
    use crate::response::Response;
    use crate::router::Router;
    use crate::writer::BufferedWriter;

    async fn echo(req: Request) -> Response {
        let cx = req.context();
        Response::text(format!(
            "{}|{}",
            cx.request_id().unwrap_or("-"),
            cx.client_label().unwrap_or("-"),
        ))
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Router::new().on(Method::GET, "/", echo).with(correlation))
    }

    async fn run(headers: &[(&str, &str)]) -> Exchange {
        let mut builder = http::Request::get("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        send(builder).await
    }

    async fn send(builder: http::request::Builder) -> Exchange {
        let req = Request::from_http(builder.body(Body::empty()).unwrap());
        pipeline().run(Exchange::new(req, BufferedWriter::new())).await
    }

    #[tokio::test]
    async fn client_supplied_id_is_kept() {
        let ex = run(&[(CLIENT_ID_HEADER, "abc"), (CLIENT_USER_AGENT_HEADER, "cli/1.4")]).await;
        assert_eq!(ex.context().request_id(), Some("abc"));
        assert_eq!(ex.context().client_label(), Some("cli/1.4"));

        let out = ex.into_writer().into_any().downcast::<BufferedWriter>().unwrap();
        assert_eq!(out.body(), b"abc|cli/1.4");
    }

    #[tokio::test]
    async fn missing_id_is_minted_per_request() {
        let a = run(&[]).await;
        let b = run(&[]).await;
        let a = a.context().request_id().unwrap().to_owned();
        let b = b.context().request_id().unwrap().to_owned();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[tokio::test]
    async fn empty_id_header_is_treated_as_missing() {
        let ex = run(&[(CLIENT_ID_HEADER, "")]).await;
        let id = ex.context().request_id().unwrap();
        assert!(!id.is_empty());
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn missing_client_label_defaults_to_unknown() {
        let ex = run(&[(CLIENT_ID_HEADER, "abc")]).await;
        assert_eq!(ex.context().client_label(), Some(UNKNOWN_CLIENT));

        let ex = run(&[(CLIENT_USER_AGENT_HEADER, "")]).await;
        assert_eq!(ex.context().client_label(), Some("unknown"));
    }

    #[tokio::test]
    async fn non_ascii_headers_are_kept() {
        let id = HeaderValue::from_bytes("réq-42".as_bytes()).unwrap();
        let client = HeaderValue::from_bytes("façade/1.0".as_bytes()).unwrap();
        let ex = send(
            http::Request::get("/")
                .header(CLIENT_ID_HEADER, id)
                .header(CLIENT_USER_AGENT_HEADER, client),
        )
        .await;
        assert_eq!(ex.context().request_id(), Some("réq-42"));
        assert_eq!(ex.context().client_label(), Some("façade/1.0"));
    }

    #[tokio::test]
    async fn invalid_utf8_id_is_kept_lossily() {
        let id = HeaderValue::from_bytes(b"id-\xff").unwrap();
        let ex = send(http::Request::get("/").header(CLIENT_ID_HEADER, id)).await;
        assert_eq!(ex.context().request_id(), Some("id-\u{FFFD}"));
    }

    #[test]
    fn minted_ids_differ() {
        assert_ne!(new_id(), new_id());
    }
}
