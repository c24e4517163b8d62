//! Local development bridge: a TCP listener in front of the router.
//!
//! The bridge is a pure translation layer. It maps an inbound HTTP
//! connection's request into the [`Request`] model, hands it to
//! [`Router::handle_request`], and serializes the [`Response`] back out —
//! headers first, then status, then the JSON-encoded body. Routing,
//! middleware and failure containment all stay the router's business; the
//! bridge never looks at paths or methods beyond copying them across.
//!
//! A plain socket cannot supply the invocation metadata the native event
//! source would, so the bridge synthesizes placeholders for those fields
//! (request id, account, api id, domain) and fills source IP and user agent
//! from the connection.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C the accept loop stops immediately and every
//! in-flight connection task is drained before [`Server::serve`] returns.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::request::{Request, RequestContext};
use crate::response::Response;
use crate::router::Router;

const DEFAULT_PORT: u16 = 8080;

/// The local bridge server.
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

    /// Binds `0.0.0.0` on the port named by the `PORT` environment variable,
    /// falling back to 8080 when unset or unparseable.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
        }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown: SIGTERM or Ctrl-C,
    /// followed by every in-flight connection completing.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // Shared read-only across connection tasks; registration is over.
        let router = Arc::new(router);

        info!(addr = %self.addr, "local bridge listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Checked top-to-bottom so a shutdown signal stops the
                // accept loop even when connections are queued.
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

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection, not
                        // once per connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { bridge(router, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("local bridge stopped");
        Ok(())
    }
}

/// One connection-level dispatch: translate in, route, translate out.
///
/// Infallible toward hyper — translation failures and dispatch errors are
/// rendered as error replies here, never surfaced as connection errors.
async fn bridge(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let invocation = match into_invocation(req, remote_addr).await {
        Ok(inv) => inv,
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read inbound request: {e}");
            return Ok(error_reply(StatusCode::BAD_REQUEST, "Bad Request"));
        }
    };

    match router.handle_request(invocation).await {
        Ok(resp) => Ok(into_http(resp)),
        Err(e) => {
            // Handler-reported error: detail goes to the log, not the wire.
            error!(peer = %remote_addr, "dispatch error: {e}");
            Ok(error_reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            ))
        }
    }
}

/// Translates an inbound HTTP request into the router's [`Request`] model.
///
/// Header names are lowercased and repeated values joined with `,`; the
/// query string is percent-decoded with repeated keys joined with `,`;
/// `cookie` headers are split into individual raw cookie strings.
async fn into_invocation<B>(
    req: http::Request<B>,
    remote_addr: SocketAddr,
) -> Result<Request, Error>
where
    B: hyper::body::Body,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| Error::Body(e.to_string()))?
        .to_bytes();

    let mut builder = Request::builder()
        .method(parts.method.as_str())
        .path(parts.uri.path())
        .raw_query(parts.uri.query().unwrap_or(""))
        .body(String::from_utf8_lossy(&body).into_owned());

    for name in parts.headers.keys() {
        let joined = parts
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        builder = builder.header(name.as_str(), joined);
    }

    for (key, value) in parse_query(parts.uri.query().unwrap_or("")) {
        builder = builder.query_param(key, value);
    }

    for header in parts.headers.get_all(http::header::COOKIE) {
        if let Ok(raw) = header.to_str() {
            for cookie in raw.split(';') {
                let cookie = cookie.trim();
                if !cookie.is_empty() {
                    builder = builder.cookie(cookie);
                }
            }
        }
    }

    let user_agent = parts
        .headers
        .get(http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();

    Ok(builder
        .context(RequestContext {
            request_id: "local-request-id".to_owned(),
            account_id: "123456789012".to_owned(),
            api_id: "local-api-id".to_owned(),
            domain_name: "localhost".to_owned(),
            domain_prefix: "localhost".to_owned(),
            source_ip: remote_addr.ip().to_string(),
            user_agent,
            received_at: SystemTime::now(),
            deadline: None,
        })
        .build())
}

/// Serializes a [`Response`] back onto the transport: headers first, then
/// the status code, then the JSON-encoded body. A plain-text body is a JSON
/// string on the wire, exactly like the native event reply.
fn into_http(resp: Response) -> http::Response<Full<Bytes>> {
    let status = StatusCode::from_u16(resp.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = http::Response::builder();
    for (name, value) in resp.headers() {
        builder = builder.header(name, value);
    }
    builder = builder.status(status);

    let body = serde_json::to_vec(resp.body()).unwrap_or_else(|_| b"null".to_vec());
    match builder.body(Full::new(Bytes::from(body))) {
        Ok(reply) => reply,
        // A handler produced an unencodable header name or value.
        Err(e) => {
            error!("failed to serialize response: {e}");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn error_reply(status: StatusCode, reason: &str) -> http::Response<Full<Bytes>> {
    let body = serde_json::to_vec(&serde_json::json!({"error": reason}))
        .unwrap_or_default();
    let mut reply = http::Response::new(Full::new(Bytes::from(body)));
    *reply.status_mut() = status;
    reply.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    reply
}

/// Splits and percent-decodes a raw query string. Repeated keys are joined
/// with `,`, matching the header treatment.
fn parse_query(raw: &str) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = HashMap::new();

    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(key);
        let value = percent_decode(value);
        if key.is_empty() {
            continue;
        }
        params
            .entry(key)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    params
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Resolves on the first shutdown signal: SIGTERM (and Ctrl-C) on Unix,
/// Ctrl-C only elsewhere.
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
