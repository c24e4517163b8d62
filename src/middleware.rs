//! Middleware layer: decorators over the dispatch chain.
//!
//! Middleware come in two ordered lists. **Pre** middleware wrap the route
//! handler from the outside (auth, logging, request shaping); **post**
//! middleware sit between the pre list and the handler and typically act on
//! the response after delegating (header injection, response rewriting).
//! Each layer receives the request and a [`Next`] handle; it decides whether
//! downstream runs at all, and may mutate the response [`Next::run`] hands
//! back before returning it upward.
//!
//! Every middleware carries a [`MiddlewareConfig`] of exclusion rules,
//! re-evaluated per request while the chain is composed: an excluded layer
//! is skipped outright — its `process` never runs and it sees neither the
//! request nor the response.
//!
//! ```rust
//! use junction::{Next, Request, Response, Error};
//!
//! async fn inject_version(req: Request, next: Next) -> Result<Response, Error> {
//!     let mut resp = next.run(req).await?;
//!     resp.set_header("x-api-version", "2024-11");
//!     Ok(resp)
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A middleware: one operation, wrapping the remainder of the chain.
///
/// Automatically implemented for any
/// `async fn(Request, Next) -> impl IntoResponse`, which is the common case;
/// implement it directly on a struct when the middleware carries state.
pub trait Middleware: Send + Sync + 'static {
    fn process(&self, req: Request, next: Next) -> BoxFuture;
}

impl<F, Fut, R> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn process(&self, req: Request, next: Next) -> BoxFuture {
        let fut = (self)(req, next);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Handle over the composed remainder of the chain.
///
/// Calling [`run`](Next::run) delegates downstream; not calling it
/// short-circuits the dispatch with whatever the middleware returns.
pub struct Next {
    pub(crate) inner: BoxedHandler,
}

impl Next {
    pub async fn run(self, req: Request) -> Result<Response, Error> {
        self.inner.call(req).await
    }
}

/// Per-middleware exclusion rules, matched against each request before the
/// middleware is spliced into that request's chain.
///
/// Precedence: excluded route, then excluded method, then excluded header
/// (name present with the declared value). Route comparison uses the same
/// normalized path the route lookup uses.
///
/// ```rust
/// use junction::{Method, MiddlewareConfig};
///
/// let config = MiddlewareConfig::new()
///     .exclude_route("/health")
///     .exclude_method(Method::Options)
///     .exclude_header("x-internal", "1");
/// ```
#[derive(Clone, Debug, Default)]
pub struct MiddlewareConfig {
    routes: HashSet<String>,
    methods: HashSet<String>,
    headers: HashMap<String, String>,
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_route(mut self, path: impl Into<String>) -> Self {
        self.routes.insert(path.into());
        self
    }

    /// Accepts a [`Method`](crate::Method) or any string; stored uppercase.
    pub fn exclude_method(mut self, method: impl ToString) -> Self {
        self.methods.insert(method.to_string().to_ascii_uppercase());
        self
    }

    /// Skip the middleware when `name` is present on the request with
    /// exactly `value`. Names are matched case-insensitively.
    pub fn exclude_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub(crate) fn excludes(&self, lookup_path: &str, req: &Request) -> bool {
        if self.routes.contains(lookup_path) {
            return true;
        }
        if self.methods.contains(req.method()) {
            return true;
        }
        self.headers
            .iter()
            .any(|(name, value)| req.header(name) == Some(value))
    }
}

/// A registered middleware entry: the transform plus its exclusion rules.
pub(crate) struct Entry {
    pub(crate) func: Arc<dyn Middleware>,
    pub(crate) config: MiddlewareConfig,
}

/// One spliced chain layer: a middleware wrapping the composed remainder.
pub(crate) struct Layer {
    pub(crate) middleware: Arc<dyn Middleware>,
    pub(crate) next: BoxedHandler,
}

impl ErasedHandler for Layer {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Next { inner: Arc::clone(&self.next) };
        self.middleware.process(req, next)
    }
}
