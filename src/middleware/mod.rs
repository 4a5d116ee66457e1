//! Middleware layer.
//!
//! Middleware wraps the router and is the place for cross-cutting concerns.
//! A stage is any async function of the form
//!
//! ```text
//! async fn stage(ex: Exchange, next: Next) -> Exchange
//! ```
//!
//! It may inspect or modify the [`Exchange`] before calling
//! [`next.run(ex)`](Next::run), and again after it returns. Not calling `next`
//! short-circuits the chain.
//!
//! Built-in stages, meant to be registered in this order:
//! - [`correlation`]: publishes the correlation id and client label
//! - [`capture`]: captures bodies, status and latency; emits one access log
//!   record per request
//!
//! ```rust,no_run
//! use tracewire::{middleware, Router};
//!
//! let app = Router::new()
//!     .with(middleware::correlation)
//!     .with(middleware::capture);
//! ```

mod capture;
mod correlation;

pub use capture::capture;
pub use correlation::{
    CLIENT_ID_HEADER, CLIENT_USER_AGENT_HEADER, UNKNOWN_CLIENT, correlation, new_id,
};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::exchange::Exchange;
use crate::router::{Router, Routes};

/// A heap-allocated, type-erased `Send` future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedMiddleware {
    fn call(&self, ex: Exchange, next: Next) -> BoxFuture<Exchange>;
}

#[doc(hidden)]
pub type BoxedMiddleware = Arc<dyn ErasedMiddleware + Send + Sync + 'static>;

/// Implemented for every valid middleware stage.
///
/// Satisfied by any `Fn(Exchange, Next) -> impl Future<Output = Exchange>`.
/// Sealed like [`Handler`](crate::Handler).
pub trait Middleware: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut> private::Sealed for F
where
    F: Fn(Exchange, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Exchange> + Send + 'static,
{
}

impl<F, Fut> Middleware for F
where
    F: Fn(Exchange, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Exchange> + Send + 'static,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(FnMiddleware(self))
    }
}

struct FnMiddleware<F>(F);

impl<F, Fut> ErasedMiddleware for FnMiddleware<F>
where
    F: Fn(Exchange, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Exchange> + Send + 'static,
{
    fn call(&self, ex: Exchange, next: Next) -> BoxFuture<Exchange> {
        Box::pin((self.0)(ex, next))
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The remainder of the chain after the current stage.
pub struct Next {
    stack: Arc<[BoxedMiddleware]>,
    routes: Arc<Routes>,
    index: usize,
}

impl Next {
    /// Yields to the rest of the chain and resolves once it has finished.
    pub fn run(mut self, ex: Exchange) -> BoxFuture<Exchange> {
        match self.stack.get(self.index).cloned() {
            Some(stage) => {
                self.index += 1;
                stage.call(ex, self)
            }
            None => self.routes.dispatch(ex),
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// A router frozen together with its middleware stack.
///
/// Shared read-only across requests; every request gets its own [`Exchange`].
#[derive(Clone)]
pub struct Pipeline {
    stack: Arc<[BoxedMiddleware]>,
    routes: Arc<Routes>,
}

impl Pipeline {
    pub fn new(router: Router) -> Self {
        let (stack, routes) = router.into_parts();
        Self { stack: stack.into(), routes }
    }

    /// Runs one request through every stage and the router.
    pub fn run(&self, ex: Exchange) -> BoxFuture<Exchange> {
        let next = Next { stack: Arc::clone(&self.stack), routes: Arc::clone(&self.routes), index: 0 };
        next.run(ex)
    }
}

impl From<Router> for Pipeline {
    fn from(router: Router) -> Self { Self::new(router) }
}
