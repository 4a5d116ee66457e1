//! HTTP server and graceful shutdown.
//!
//! Each connection runs on its own task. Each request gets a fresh
//! [`Exchange`] whose sink streams straight into hyper: the status line and
//! headers go out as soon as the chain writes its first body chunk (or
//! finishes), and every later write is forwarded as one body frame.
//!
//! On **SIGTERM** or **Ctrl-C** the server stops accepting, lets in-flight
//! connections finish, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Error;
use crate::exchange::Exchange;
use crate::middleware::Pipeline;
use crate::request::Request;
use crate::writer::{self, ChannelBody};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and running each request through
    /// `app` (a [`Router`](crate::Router) or a prebuilt [`Pipeline`]).
    ///
    /// Returns only after a full graceful shutdown.
    pub async fn serve(self, app: impl Into<Pipeline>) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let pipeline = app.into();

        info!(addr = %self.addr, "tracewire listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first so a SIGTERM stops accepting even with a
                // backlog of pending connections.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let pipeline = pipeline.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            dispatch(pipeline.clone(), req, remote_addr)
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set does not grow
                // without bound.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("tracewire stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through the pipeline on its own task and answers with
/// the head as soon as the chain commits it. The body keeps streaming until
/// the chain finishes.
///
/// A chain that dies before committing (a panic) is answered with `500`.
async fn dispatch(
    pipeline: Pipeline,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<ChannelBody>, Infallible> {
    let (sink, head, body) = writer::stream();
    let exchange = Exchange::new(Request::from_http(req).with_remote_addr(remote_addr), sink);

    tokio::spawn(async move {
        pipeline.run(exchange).await.into_writer().finish();
    });

    let mut response = http::Response::new(body);
    match head.await {
        Ok(head) => {
            *response.status_mut() = head.status;
            *response.headers_mut() = head.headers;
        }
        Err(_) => {
            error!(peer = %remote_addr, "request chain ended without a response");
            *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
        }
    }
    Ok(response)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM (Kubernetes) or SIGINT (Ctrl-C).
/// On non-Unix platforms only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
