//! Outgoing response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] stays mutable until it leaves the dispatch: an inner
//! handler builds it, outer middleware may adjust it (inject a header, swap
//! the status) on the way back up. On the wire it serializes to exactly
//! `{"statusCode": …, "headers": {…}, "body": …}` — the literal shape the
//! invoking runtime expects, no more and no fewer top-level fields.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// An outgoing response.
///
/// # Shortcuts (200 OK)
///
/// ```rust
/// use junction::{Response, Status};
/// use serde_json::json;
///
/// Response::json(json!({"id": 1}));
/// Response::text("hello");
/// Response::status(Status::Created);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use junction::{Response, Status};
/// use serde_json::json;
///
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/users/42")
///     .json(json!({"id": 42}));
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct Response {
    #[serde(rename = "statusCode")]
    status: u16,
    headers: HashMap<String, String>,
    body: Value,
}

impl Response {
    /// `200 OK` with a structured JSON body and `Content-Type: application/json`.
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            headers: HashMap::from([json_content_type()]),
            body,
        }
    }

    /// `200 OK` with a plain string body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Value::String(body.into()),
        }
    }

    /// Response with the given status and no body.
    pub fn status(code: impl Into<u16>) -> Self {
        Self {
            status: code.into(),
            headers: HashMap::new(),
            body: Value::Null,
        }
    }

    /// Builder for responses that need a custom status plus headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder {
            status: 200,
            headers: HashMap::new(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Replaces the status code. Intended for outer middleware layers.
    pub fn set_status(&mut self, code: impl Into<u16>) {
        self.status = code.into();
    }

    /// Inserts or replaces a header. Intended for outer middleware layers.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }
}

fn json_content_type() -> (String, String) {
    ("Content-Type".to_owned(), "application/json".to_owned())
}

// ── ResponseBuilder ──────────────────────────────────────────────────────────

/// Fluent builder for [`Response`]. Obtain via [`Response::builder`];
/// defaults to status 200. Terminated by a body method.
pub struct ResponseBuilder {
    status: u16,
    headers: HashMap<String, String>,
}

impl ResponseBuilder {
    pub fn status(mut self, code: impl Into<u16>) -> Self {
        self.status = code.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Terminate with a structured JSON body; sets `Content-Type` unless the
    /// builder already carries one.
    pub fn json(mut self, body: Value) -> Response {
        let (name, value) = json_content_type();
        self.headers.entry(name).or_insert(value);
        Response { status: self.status, headers: self.headers, body }
    }

    /// Terminate with a plain string body.
    pub fn text(self, body: impl Into<String>) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: Value::String(body.into()),
        }
    }

    /// Terminate with no body.
    pub fn empty(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: Value::Null,
        }
    }
}

// ── IntoResponse ─────────────────────────────────────────────────────────────

/// Conversion into a dispatch outcome.
///
/// Lets handlers return whatever is most natural: a [`Response`], a bare
/// [`Status`](crate::Status), a string, or `Result<Response, Error>` when
/// the handler wants to report an error alongside the dispatch.
pub trait IntoResponse {
    fn into_response(self) -> Result<Response, Error>;
}

impl IntoResponse for Response {
    fn into_response(self) -> Result<Response, Error> {
        Ok(self)
    }
}

impl IntoResponse for Result<Response, Error> {
    fn into_response(self) -> Result<Response, Error> {
        self
    }
}

impl IntoResponse for crate::Status {
    fn into_response(self) -> Result<Response, Error> {
        Ok(Response::status(self))
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Result<Response, Error> {
        Ok(Response::text(self))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Result<Response, Error> {
        Ok(Response::text(self))
    }
}
