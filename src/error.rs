//! Unified error type.

use std::fmt;

/// The error type returned by junction's fallible operations.
///
/// Routing misses (404) and method misses (405) are expressed as
/// [`Response`](crate::Response) values, never as `Error`s. This type covers
/// infrastructure failures (binding a port, accepting a connection, reading
/// an inbound body) and errors a handler chooses to report explicitly
/// alongside the dispatch instead of encoding into a response.
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure in the local bridge.
    Io(std::io::Error),
    /// The inbound request body could not be read.
    Body(String),
    /// A handler or middleware reported a failure.
    Handler(String),
}

impl Error {
    /// Builds a handler-reported error from any displayable value.
    ///
    /// ```rust
    /// use junction::{Error, Request, Response};
    ///
    /// async fn lookup(_req: Request) -> Result<Response, Error> {
    ///     Err(Error::handler("upstream unavailable"))
    /// }
    /// ```
    pub fn handler(msg: impl fmt::Display) -> Self {
        Self::Handler(msg.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Body(e) => write!(f, "body: {e}"),
            Self::Handler(e) => write!(f, "handler: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
