//! Incoming invocation event type.
//!
//! A [`Request`] is source-agnostic: the local bridge builds one from a raw
//! HTTP connection, serverless glue builds one from the platform's native
//! event, tests build one with [`Request::builder`]. Whatever the source,
//! the value is constructed once and never mutated afterwards — dispatch,
//! middleware and handlers all see the same immutable event.

use std::collections::HashMap;
use std::time::SystemTime;

/// Invocation metadata carried alongside the HTTP fields.
///
/// The serverless event source populates all of these; the local bridge
/// synthesizes placeholders for the ones a plain TCP connection cannot know
/// (request id, account, api id, domain) and fills the rest from the socket.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub account_id: String,
    pub api_id: String,
    pub domain_name: String,
    pub domain_prefix: String,
    pub source_ip: String,
    pub user_agent: String,
    pub received_at: SystemTime,
    /// Deadline propagated from the surrounding runtime, if it has one.
    /// Observed voluntarily by handlers; the router never enforces it.
    pub deadline: Option<SystemTime>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            account_id: String::new(),
            api_id: String::new(),
            domain_name: String::new(),
            domain_prefix: String::new(),
            source_ip: String::new(),
            user_agent: String::new(),
            received_at: SystemTime::now(),
            deadline: None,
        }
    }
}

/// An incoming function-invocation event.
#[derive(Clone, Debug)]
pub struct Request {
    method: String,
    path: String,
    raw_query: String,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    cookies: Vec<String>,
    body: String,
    context: RequestContext,
}

impl Request {
    /// Starts building a request. Defaults: `GET /`, no headers, no body.
    pub fn builder() -> RequestBuilder {
        RequestBuilder {
            method: "GET".to_owned(),
            path: "/".to_owned(),
            raw_query: String::new(),
            headers: HashMap::new(),
            query: HashMap::new(),
            cookies: Vec::new(),
            body: String::new(),
            context: RequestContext::default(),
        }
    }

    /// Uppercase method string (e.g. `"GET"`).
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, without the leading `?`.
    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// Case-insensitive header lookup. Repeated inbound headers arrive
    /// joined with `,`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, keys lowercased.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Raw cookie strings, in the order they appeared on the wire.
    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

/// Builder for [`Request`]. Header names are lowercased on insertion so
/// lookups stay case-insensitive no matter who constructed the event.
pub struct RequestBuilder {
    method: String,
    path: String,
    raw_query: String,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    cookies: Vec<String>,
    body: String,
    context: RequestContext,
}

impl RequestBuilder {
    /// Accepts a [`Method`](crate::Method) or any string; normalized to
    /// uppercase either way.
    pub fn method(mut self, method: impl ToString) -> Self {
        self.method = method.to_string().to_ascii_uppercase();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn raw_query(mut self, raw_query: impl Into<String>) -> Self {
        self.raw_query = raw_query.into();
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn cookie(mut self, raw: impl Into<String>) -> Self {
        self.cookies.push(raw.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            raw_query: self.raw_query,
            headers: self.headers,
            query: self.query,
            cookies: self.cookies,
            body: self.body,
            context: self.context,
        }
    }
}
