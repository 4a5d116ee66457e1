//! Capture stage: request/response bodies, status, latency, one access log
//! record per request.

use std::time::Instant;

use bytes::Bytes;
use tracing::debug;

use super::Next;
use crate::body::Body;
use crate::errors::ErrorKind;
use crate::exchange::Exchange;
use crate::logger::{self, AccessRecord};
use crate::recorder::Recorder;
use crate::request::Request;

/// Captures the request and response of the rest of the chain and logs them.
///
/// Before yielding it snapshots method, path, query and client address,
/// reads the request body fully and puts an identical, unread body back for
/// downstream handlers, and wraps the response sink in a [`Recorder`]. After
/// the chain returns it emits exactly one [`AccessRecord`] through
/// [`logger::ctx`], carrying the private errors the chain recorded.
///
/// Register it after [`correlation`](super::correlation) so the record
/// carries the request's id. Never fails: an unreadable request body is
/// logged as empty.
pub async fn capture(mut ex: Exchange, next: Next) -> Exchange {
    let start = Instant::now();

    let mut snapshot = Snapshot::default();
    let body = match ex.request_mut() {
        Some(req) => {
            snapshot = Snapshot::of(req);
            req.take_body()
        }
        None => {
            debug!("request already consumed, logging an empty request");
            None
        }
    };

    if let Some(body) = body {
        let restored = match body.to_bytes().await {
            Ok(bytes) => {
                snapshot.request_body = String::from_utf8_lossy(&bytes).into_owned();
                Body::from(bytes)
            }
            Err(e) => {
                logger::ctx(ex.context()).error("request body unreadable, logging it as empty", &e);
                Body::empty()
            }
        };
        if let Some(req) = ex.request_mut() {
            req.set_body(restored);
        }
    }

    ex.wrap_writer(Recorder::new);

    let mut ex = next.run(ex).await;
    let latency = start.elapsed();

    let captured = ex.unwrap_writer(|recorder: Recorder| {
        let (inner, body, status) = recorder.into_parts();
        (inner, (body, status))
    });
    let (response_body, status) = match captured {
        Some(captured) => captured,
        None => (Bytes::new(), ex.writer().status()),
    };

    let record = AccessRecord {
        method: snapshot.method,
        path: snapshot.path,
        query: snapshot.query,
        client_ip: snapshot.client_ip,
        request_body: snapshot.request_body,
        response_body: String::from_utf8_lossy(&response_body).into_owned(),
        status: status.as_u16(),
        latency,
        error: ex.errors().by_kind(ErrorKind::Private).to_string(),
    };
    logger::ctx(ex.context()).access(&record);

    ex
}

/// Request fields taken before the request is handed downstream.
#[derive(Default)]
struct Snapshot {
    method: String,
    path: String,
    query: String,
    client_ip: String,
    request_body: String,
}

impl Snapshot {
    fn of(req: &Request) -> Self {
        Self {
            method: req.method().to_string(),
            path: req.path().to_owned(),
            query: req.query().to_owned(),
            client_ip: req.client_ip(),
            request_body: String::new(),
        }
    }
}
