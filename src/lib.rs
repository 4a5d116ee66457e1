//! # tracewire
//!
//! Request correlation and body-capturing access logs for a minimal HTTP
//! framework that lives behind a reverse proxy.
//!
//! ## What it does per request
//!
//! - **Correlation**: trusts the client's `client-id` header or mints a
//!   UUID, labels the caller from `client-user-agent` (or `"unknown"`), and
//!   publishes both where every later stage and handler can read them.
//! - **Capture**: reads the request body and hands downstream an identical,
//!   unread copy; wraps the response sink in a [`Recorder`] that mirrors every
//!   write while passing it through untouched; times the chain.
//! - **One log line**: after the chain returns, a single `"api"` event with
//!   method, path, query, client address, both bodies, status, latency and the
//!   private errors the handlers recorded.
//!
//! What it does not do: parse bodies, sample or rate-limit logs, persist
//! anything, or propagate tracing spans. `tracing` subscribers own the output.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use tracewire::{middleware, telemetry, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     telemetry::init(&telemetry::TelemetryConfig::from_env()).unwrap();
//!
//!     let app = Router::new()
//!         .with(middleware::correlation)
//!         .with(middleware::capture)
//!         .on(Method::GET,  "/items/{id}", get_item)
//!         .on(Method::POST, "/items",      create_item);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_item(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_item(mut req: Request) -> Response {
//!     match req.bytes().await {
//!         Ok(body) if !body.is_empty() => Response::builder()
//!             .status(StatusCode::CREATED)
//!             .json(body),
//!         Ok(_) => Response::status(StatusCode::BAD_REQUEST),
//!         Err(e) => Response::status(StatusCode::BAD_REQUEST).with_error(e),
//!     }
//! }
//! ```

mod body;
mod context;
mod error;
mod errors;
mod exchange;
mod handler;
mod recorder;
mod request;
mod response;
mod router;
mod server;
mod writer;

pub mod logger;
pub mod middleware;
pub mod telemetry;

pub use body::Body;
pub use context::RequestContext;
pub use error::{BoxError, Error};
pub use errors::{ChainError, ErrorKind, Errors};
pub use exchange::Exchange;
pub use handler::Handler;
pub use middleware::{Middleware, Next, Pipeline};
pub use recorder::Recorder;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use writer::{BufferedWriter, ResponseWriter};
