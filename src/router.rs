//! Route table and dispatch.
//!
//! Routes are keyed by `(path, method)` and matched by exact string equality
//! — no parameters, no wildcards, no regexes. The only normalization is the
//! optional trailing-slash strip, applied to the lookup path before matching.
//!
//! Configure-then-share lifecycle: build the router and register everything
//! during setup, then move it into an `Arc` and dispatch concurrently. All
//! registration methods take `&mut self`, so the type system itself rules
//! out registration after serving begins.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use serde_json::json;
use tracing::info;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Entry, Layer, Middleware, MiddlewareConfig};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The request router.
///
/// Owns the route table, the pre and post middleware lists, and the three
/// terminal handlers (not-found, method-not-allowed, panic), each of which
/// has a built-in default and can be replaced during setup.
///
/// ```rust
/// use junction::{Method, MiddlewareConfig, Request, Response, Router};
///
/// async fn hello(_req: Request) -> Response {
///     Response::text("hello")
/// }
///
/// let mut router = Router::new();
/// router.add_route(Method::Get, "/hello", hello);
/// ```
pub struct Router {
    routes: HashMap<String, HashMap<String, BoxedHandler>>,
    pre_middleware: Vec<Entry>,
    post_middleware: Vec<Entry>,
    not_found: BoxedHandler,
    method_not_allowed: BoxedHandler,
    panic_handler: BoxedHandler,
    strip_trailing_slash: bool,
}

impl Router {
    /// A router with the default terminal handlers and trailing-slash
    /// stripping enabled.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            pre_middleware: Vec::new(),
            post_middleware: Vec::new(),
            not_found: default_not_found.into_boxed_handler(),
            method_not_allowed: default_method_not_allowed.into_boxed_handler(),
            panic_handler: default_panic.into_boxed_handler(),
            strip_trailing_slash: true,
        }
    }

    /// Registers `handler` for the `(method, path)` pair.
    ///
    /// `method` may be a [`Method`](crate::Method) or any string; it is
    /// normalized to uppercase. Registering the same pair twice silently
    /// replaces the earlier handler — the last registration wins.
    pub fn add_route(&mut self, method: impl ToString, path: impl Into<String>, handler: impl Handler) {
        self.routes
            .entry(path.into())
            .or_default()
            .insert(
                method.to_string().to_ascii_uppercase(),
                handler.into_boxed_handler(),
            );
    }

    /// Appends a pre-dispatch middleware. Pre middleware wrap the chain
    /// outermost-first in registration order: the first one registered sees
    /// the request first and the response last.
    pub fn use_pre(&mut self, middleware: impl Middleware, config: MiddlewareConfig) {
        self.pre_middleware.push(Entry { func: Arc::new(middleware), config });
    }

    /// Appends a post-dispatch middleware, nested inside every pre
    /// middleware and outside the route handler.
    pub fn use_post(&mut self, middleware: impl Middleware, config: MiddlewareConfig) {
        self.post_middleware.push(Entry { func: Arc::new(middleware), config });
    }

    /// Replaces the handler invoked when no route matches the path.
    pub fn set_not_found_handler(&mut self, handler: impl Handler) {
        self.not_found = handler.into_boxed_handler();
    }

    /// Replaces the handler invoked when the path is known but the method
    /// is not registered for it.
    pub fn set_method_not_allowed_handler(&mut self, handler: impl Handler) {
        self.method_not_allowed = handler.into_boxed_handler();
    }

    /// Replaces the handler that produces the response after a caught panic.
    /// Takes effect for subsequent dispatches only.
    pub fn set_panic_handler(&mut self, handler: impl Handler) {
        self.panic_handler = handler.into_boxed_handler();
    }

    /// Controls trailing-slash stripping (enabled by default). When enabled,
    /// a single trailing `/` is removed from the lookup path; the root path
    /// `/` is never touched.
    pub fn set_strip_trailing_slash(&mut self, strip: bool) {
        self.strip_trailing_slash = strip;
    }

    /// Dispatches one request and always produces a well-formed outcome.
    ///
    /// Routing and method misses become the corresponding terminal handler's
    /// response. A panic anywhere in the chain is caught here, converted to
    /// the panic handler's response, and kept out of the body; the fault
    /// description survives only in the completion log. A handler-reported
    /// `Err` is passed through unchanged. Every one of those paths emits the
    /// same completion log entry: method, path, status, duration, and the
    /// error or fault when there is one.
    pub async fn handle_request(&self, req: Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = req.method().to_owned();
        let path = req.path().to_owned();

        let routed = AssertUnwindSafe(self.route(req.clone())).catch_unwind().await;
        let (result, fault) = match routed {
            Ok(result) => (result, None),
            Err(payload) => {
                let desc = format!("panic: {}", panic_description(payload));
                let resp = match self.panic_handler.call(req).await {
                    Ok(resp) => resp,
                    // A failing panic handler still must not leak the fault.
                    Err(_) => default_panic_response(),
                };
                (Ok(resp), Some(desc))
            }
        };

        let status = result.as_ref().map(Response::status_code).unwrap_or(500);
        let error = fault.or_else(|| result.as_ref().err().map(Error::to_string));
        info!(
            %method,
            %path,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            error = error.as_deref(),
            "request completed"
        );

        result
    }

    async fn route(&self, req: Request) -> Result<Response, Error> {
        let lookup = normalize(req.path(), self.strip_trailing_slash).to_owned();

        match self.routes.get(&lookup) {
            None => self.not_found.call(req).await,
            Some(methods) => match methods.get(req.method()) {
                None => self.method_not_allowed.call(req).await,
                Some(handler) => {
                    let chain = self.compose(&lookup, &req, Arc::clone(handler));
                    chain.call(req).await
                }
            },
        }
    }

    /// Builds this request's chain, innermost-first: post middleware wrap
    /// the route handler, pre middleware wrap the result, and within each
    /// list the first-registered entry ends up outermost. Excluded entries
    /// are skipped entirely.
    fn compose(&self, lookup_path: &str, req: &Request, route: BoxedHandler) -> BoxedHandler {
        let mut handler = route;

        for entry in self.post_middleware.iter().rev() {
            if entry.config.excludes(lookup_path, req) {
                continue;
            }
            handler = Arc::new(Layer {
                middleware: Arc::clone(&entry.func),
                next: handler,
            });
        }

        for entry in self.pre_middleware.iter().rev() {
            if entry.config.excludes(lookup_path, req) {
                continue;
            }
            handler = Arc::new(Layer {
                middleware: Arc::clone(&entry.func),
                next: handler,
            });
        }

        handler
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips at most one trailing `/`; the root path survives unchanged.
fn normalize(path: &str, strip: bool) -> &str {
    if strip && path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

fn panic_description(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}

// ── Default terminal handlers ────────────────────────────────────────────────

async fn default_not_found(_req: Request) -> Response {
    Response::builder()
        .status(Status::NotFound)
        .json(json!({"error": "Not Found"}))
}

async fn default_method_not_allowed(_req: Request) -> Response {
    Response::builder()
        .status(Status::MethodNotAllowed)
        .json(json!({"error": "Method Not Allowed"}))
}

async fn default_panic(_req: Request) -> Response {
    default_panic_response()
}

fn default_panic_response() -> Response {
    Response::builder()
        .status(Status::InternalServerError)
        .json(json!({"error": "Internal Server Error"}))
}
