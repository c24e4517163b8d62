//! Local-bridge demo — JSON endpoints behind pre/post middleware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example local
//!
//! Try:
//!   curl http://localhost:8080/health
//!   curl http://localhost:8080/orders/latest -H 'x-api-key: demo'
//!   curl -X POST http://localhost:8080/echo \
//!        -H 'x-api-key: demo' \
//!        -H 'content-type: application/json' \
//!        -d '{"a":1}'

use junction::{Method, MiddlewareConfig, Next, Request, Response, Router, Server, Status};
use serde_json::{json, Value};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let mut router = Router::new();
    router.add_route(Method::Get, "/orders/latest", latest_order);
    router.add_route(Method::Post, "/echo", echo);
    router.add_route(Method::Get, "/health", health);

    // Cross-cutting concerns go in front; the health probe is exempt.
    router.use_pre(
        require_api_key,
        MiddlewareConfig::new().exclude_route("/health"),
    );
    // Response post-processing goes behind.
    router.use_post(tag_responses, MiddlewareConfig::new());

    // A serverless deployment would register router.handle_request with the
    // platform's invocation loop instead; the core is agnostic to the choice.
    Server::from_env()
        .serve(router)
        .await
        .expect("server error");
}

async fn latest_order(_req: Request) -> Response {
    Response::json(json!({"id": 42, "status": "shipped"}))
}

async fn echo(req: Request) -> Response {
    match serde_json::from_str::<Value>(req.body()) {
        Ok(value) => Response::json(value),
        Err(_) => Response::status(Status::BadRequest),
    }
}

async fn health(_req: Request) -> Response {
    Response::text("ok")
}

async fn require_api_key(req: Request, next: Next) -> Result<Response, junction::Error> {
    if req.header("x-api-key").is_none() {
        return Ok(Response::builder()
            .status(Status::Unauthorized)
            .json(json!({"error": "missing x-api-key"})));
    }
    next.run(req).await
}

async fn tag_responses(req: Request, next: Next) -> Result<Response, junction::Error> {
    let mut resp = next.run(req).await?;
    resp.set_header("x-served-by", "junction-demo");
    Ok(resp)
}
