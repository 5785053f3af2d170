use std::fmt;
use std::io;

/// Possible errors from this crate.
///
/// Every variant is fatal to the current scenario. The harness catches it at
/// the scenario boundary and carries on with the next one; there is no retry
/// anywhere.
#[derive(Debug)]
pub enum Error {
    /// A wrapped std::io::Error from the underlying transport (socket).
    Io(io::Error),
    /// The peer closed the stream mid-head or mid-body.
    Transport(String),
    /// Head parse errors from the `httparse` crate.
    Http11Parser(httparse::Error),
    /// A response violating the server contract: wrong version, header
    /// outside the accepted set, duplicate header, body length mismatch.
    Protocol(String),
    /// A cross-check invariant failed, such as a 200/404 response closing
    /// the connection when the client never asked for closure.
    Invariant(String),
    /// A scenario assertion failed.
    Check(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(v) => fmt::Display::fmt(v, f),
            Error::Transport(v) => write!(f, "transport: {}", v),
            Error::Http11Parser(v) => write!(f, "http11 parser: {}", v),
            Error::Protocol(v) => write!(f, "protocol violation: {}", v),
            Error::Invariant(v) => write!(f, "invariant violated: {}", v),
            Error::Check(v) => write!(f, "check failed: {}", v),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<httparse::Error> for Error {
    fn from(e: httparse::Error) -> Self {
        Error::Http11Parser(e)
    }
}
