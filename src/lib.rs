//! # junction
//!
//! A small in-process request router for function-invocation events.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! The surrounding runtime — a serverless platform or the bundled local
//! bridge — delivers one [`Request`] per invocation and consumes one
//! [`Response`]. junction owns everything in between:
//!
//! - **Exact-match routing** — routes are `(path, method)` pairs compared by
//!   string equality. No parameters, no wildcards, no regexes.
//! - **Ordered middleware** — pre and post lists, strict LIFO nesting, with
//!   per-middleware exclusion rules (paths, methods, header values).
//! - **Failure containment** — a panic anywhere in the chain becomes a 500
//!   response and a log entry; one request can never take down the process
//!   or the requests next to it.
//! - **Completion logging** — every dispatch emits one [`tracing`] event
//!   with method, path, status, duration, and the fault when there was one.
//!
//! What junction intentionally leaves to the caller: the event-loop entry
//! point, environment-based mode selection, auth, persistence, retries,
//! timeouts, and connection management.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use junction::{Method, MiddlewareConfig, Next, Request, Response, Router, Server};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut router = Router::new();
//!     router.add_route(Method::Get, "/hello", hello);
//!     router.use_pre(
//!         require_auth,
//!         MiddlewareConfig::new().exclude_route("/health"),
//!     );
//!
//!     Server::from_env().serve(router).await.unwrap();
//! }
//!
//! async fn hello(_req: Request) -> Response {
//!     Response::json(json!({"greeting": "hello"}))
//! }
//!
//! async fn require_auth(req: Request, next: Next) -> Response {
//!     if req.header("authorization").is_none() {
//!         return Response::status(junction::Status::Unauthorized);
//!     }
//!     match next.run(req).await {
//!         Ok(resp) => resp,
//!         Err(_) => Response::status(junction::Status::InternalServerError),
//!     }
//! }
//! ```
//!
//! ## Lifecycle
//!
//! Build and register during setup, then share. [`Router`]'s registration
//! methods take `&mut self`; once the router moves into the serving `Arc`
//! it is read-only, so concurrent dispatches need no locks and late
//! registration is a compile error rather than a data race.

mod bridge;
mod error;
mod handler;
mod method;
mod middleware;
mod request;
mod response;
mod router;
mod status;

pub use bridge::Server;
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use middleware::{Middleware, MiddlewareConfig, Next};
pub use request::{Request, RequestBuilder, RequestContext};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use status::Status;
