//! Minimal tracewire demo: correlation ids and access logs around a couple
//! of JSON endpoints.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!   LOG_FORMAT=json cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/items/42 -H 'client-id: req-42'
//!   curl -X POST http://localhost:3000/items \
//!        -H 'client-user-agent: demo-cli/1.0' \
//!        -d '{"name":"lamp"}'
//!   curl http://localhost:3000/items/0

use http::{Method, StatusCode};
use tracewire::{logger, middleware, telemetry, Request, Response, Router, Server};

#[tokio::main]
async fn main() -> Result<(), tracewire::Error> {
    telemetry::init(&telemetry::TelemetryConfig::from_env())?;

    let app = Router::new()
        .with(middleware::correlation)
        .with(middleware::capture)
        .on(Method::GET,  "/items/{id}", get_item)
        .on(Method::POST, "/items",      create_item);

    Server::bind("0.0.0.0:3000").serve(app).await
}

// GET /items/{id}: id 0 simulates a storage failure that only the log sees.
async fn get_item(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    if id == "0" {
        logger::ctx(req.context()).warn("item 0 requested");
        return Response::status(StatusCode::SERVICE_UNAVAILABLE)
            .with_error("storage: connection pool exhausted");
    }
    Response::json(format!(r#"{{"id":"{id}","name":"lamp"}}"#))
}

// POST /items: the capture stage has already logged the body, and the
// handler still reads it in full.
async fn create_item(mut req: Request) -> Response {
    match req.bytes().await {
        Ok(body) if !body.is_empty() => Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/items/99")
            .json(body),
        Ok(_) => Response::status(StatusCode::BAD_REQUEST),
        Err(e) => Response::status(StatusCode::BAD_REQUEST).with_error(e),
    }
}
