//! Per-request state published by the correlation stage.

/// Typed, request-scoped state shared between stages and handlers.
///
/// Created empty when a request enters the [`Pipeline`](crate::Pipeline) and
/// dropped with it. Only [`middleware::correlation`](crate::middleware::correlation)
/// writes to it; everything downstream reads it, either through
/// [`Exchange::context`](crate::Exchange::context) or
/// [`Request::context`](crate::Request::context).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Option<String>,
    client_label: Option<String>,
}

impl RequestContext {
    /// The correlation identifier, once the correlation stage has run.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// The calling client's label, once the correlation stage has run.
    pub fn client_label(&self) -> Option<&str> {
        self.client_label.as_deref()
    }

    pub(crate) fn set_request_id(&mut self, id: String) {
        self.request_id = Some(id);
    }

    pub(crate) fn set_client_label(&mut self, label: String) {
        self.client_label = Some(label);
    }
}
