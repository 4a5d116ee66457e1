//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. The router is also where
//! the middleware stack is declared: [`Router::with`] adds a stage that wraps
//! every route. At serve time the router becomes the innermost step of the
//! [`Pipeline`](crate::Pipeline).

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::{debug, warn};

use crate::errors::ChainError;
use crate::exchange::Exchange;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxFuture, BoxedMiddleware, Middleware};
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve)
/// or [`Pipeline::new`](crate::Pipeline::new). Each call returns `self` so
/// registrations chain naturally.
pub struct Router {
    routes: Routes,
    middleware: Vec<BoxedMiddleware>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Routes::default(), middleware: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use tracewire::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with an existing one.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .trees
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Add a middleware stage. Stages run in registration order, the first
    /// one outermost.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(middleware.into_boxed_middleware());
        self
    }

    pub(crate) fn into_parts(self) -> (Vec<BoxedMiddleware>, Arc<Routes>) {
        (self.middleware, Arc::new(self.routes))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// The frozen route table: the last step of every chain.
#[derive(Default)]
pub(crate) struct Routes {
    trees: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Routes {
    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.trees.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Runs the matching handler and writes its response into the active sink.
    /// Unmatched requests get `404 Not Found`.
    pub(crate) fn dispatch(&self, mut ex: Exchange) -> BoxFuture<Exchange> {
        let Some(mut request) = ex.take_request() else {
            warn!("request was consumed before reaching the router");
            return Box::pin(async move { ex });
        };
        let found = self.lookup(request.method(), request.path());

        Box::pin(async move {
            let response = match found {
                Some((handler, params)) => {
                    request.params = params;
                    handler.call(request).await
                }
                None => {
                    debug!(method = %request.method(), path = request.path(), "no route");
                    Response::status(StatusCode::NOT_FOUND)
                }
            };

            let (writer, errors) = ex.sink();
            if let Err(e) = response.write_to(writer, errors) {
                debug!(error = %e, "writing response failed");
                errors.push(ChainError::private(format!("write response: {e}")));
            }
            ex
        })
    }
}
