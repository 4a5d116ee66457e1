//! Unified error type.

use std::fmt;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;

/// Boxed error used for body streams of unknown origin.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by tracewire's fallible operations.
///
/// Application-level failures are not `Error`s: handlers express them as
/// [`Response`](crate::Response) values and record them on the chain's
/// [`Errors`](crate::Errors) accumulator. This type surfaces infrastructure
/// failures: binding a port, reading a body stream, configuring or
/// installing the log subscriber.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Body(BoxError),
    Filter(ParseError),
    Telemetry(TryInitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Body(e) => write!(f, "body: {e}"),
            Self::Filter(e) => write!(f, "log filter: {e}"),
            Self::Telemetry(e) => write!(f, "telemetry: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Body(e) => Some(e.as_ref()),
            Self::Filter(e) => Some(e),
            Self::Telemetry(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<BoxError> for Error {
    fn from(e: BoxError) -> Self {
        Self::Body(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Filter(e)
    }
}

impl From<TryInitError> for Error {
    fn from(e: TryInitError) -> Self {
        Self::Telemetry(e)
    }
}
