//! Request-scoped logging.
//!
//! [`ctx`] turns the published [`RequestContext`] into a [`RequestLogger`]:
//! a small handle that stamps every event it emits with the request's
//! correlation id (`id`) and client label (`user-agent`). It holds no state
//! of its own and changes nothing global; build one wherever a log line needs
//! to be attributed to a request.
//!
//! ```rust
//! # use tracewire::{logger, Request};
//! async fn handler(req: Request) -> &'static str {
//!     logger::ctx(req.context()).info("loading items");
//!     "ok"
//! }
//! ```

use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::context::RequestContext;

/// The access log record: one per request, written once by
/// [`middleware::capture`](crate::middleware::capture).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessRecord {
    pub method: String,
    pub path: String,
    pub query: String,
    pub client_ip: String,
    pub request_body: String,
    pub response_body: String,
    pub status: u16,
    pub latency: Duration,
    pub error: String,
}

/// Emitter bound to one request's correlation id and client label.
#[derive(Clone, Copy, Debug)]
pub struct RequestLogger<'a> {
    id: &'a str,
    user_agent: &'a str,
}

/// Returns the logger for the request that owns `context`.
///
/// Values not yet published (the correlation stage did not run) log as `""`.
pub fn ctx(context: &RequestContext) -> RequestLogger<'_> {
    RequestLogger {
        id: context.request_id().unwrap_or_default(),
        user_agent: context.client_label().unwrap_or_default(),
    }
}

impl RequestLogger<'_> {
    pub fn debug(&self, message: &str) {
        debug!(id = self.id, "user-agent" = self.user_agent, "{message}");
    }

    pub fn info(&self, message: &str) {
        info!(id = self.id, "user-agent" = self.user_agent, "{message}");
    }

    pub fn warn(&self, message: &str) {
        warn!(id = self.id, "user-agent" = self.user_agent, "{message}");
    }

    pub fn error(&self, message: &str, err: &dyn fmt::Display) {
        error!(id = self.id, "user-agent" = self.user_agent, error = %err, "{message}");
    }

    /// Emits the access log event (`"api"`, INFO).
    pub fn access(&self, record: &AccessRecord) {
        info!(
            id = self.id,
            "user-agent" = self.user_agent,
            method = record.method.as_str(),
            path = record.path.as_str(),
            query = record.query.as_str(),
            client_ip = record.client_ip.as_str(),
            request_body = record.request_body.as_str(),
            response_body = record.response_body.as_str(),
            status = record.status,
            latency = ?record.latency,
            error = record.error.as_str(),
            "api"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpublished_context_logs_empty_fields() {
        let cx = RequestContext::default();
        let logger = ctx(&cx);
        assert_eq!(logger.id, "");
        assert_eq!(logger.user_agent, "");
    }

    #[test]
    fn binds_published_values() {
        let mut cx = RequestContext::default();
        cx.set_request_id("req-42".to_owned());
        cx.set_client_label("unknown".to_owned());
        let logger = ctx(&cx);
        assert_eq!(logger.id, "req-42");
        assert_eq!(logger.user_agent, "unknown");
    }
}
