#![warn(missing_docs, missing_debug_implementations)]
#![warn(clippy::all)]

//! A conformance oracle for HTTP/1.1 servers.
//!
//! This library is the strict half of a test harness: a minimal HTTP/1.1
//! client that sends handcrafted (sometimes deliberately malformed) requests
//! to a server under test, reassembles the raw response bytes into a
//! structured [`Response`] and asserts protocol-level invariants along the
//! way. It never papers over a defect: a header outside the accepted set, a
//! repeated header name, a wrong protocol version or a truncated body all
//! abort the exchange with an error describing the violation.
//!
//! ## In scope
//!
//! * `Content-Length` driven body framing, including bodies arriving in
//!   many partial deliveries.
//! * A closed set of accepted response header names.
//! * Connection lifecycle: `connection: close` from either peer, and a
//!   liveness probe proving a connection both peers left open still works.
//!
//! ## Out of scope
//!
//! * `Transfer-Encoding: chunked` (the server contract only uses
//!   `Content-Length`).
//! * Following redirects, cookies, content codings.
//! * Any tolerance for other protocol versions in responses.
//!
//! # Layout
//!
//! [`Session`] owns the single TCP connection. The framing helpers in
//! [`http11`] turn the byte stream into a head and a body remainder.
//! [`response`] validates the head against the server contract. [`Oracle`]
//! ties one exchange together and runs the liveness probe. [`RunCtx`] is
//! the pass/fail/warn bookkeeping for a whole run.
//!
//! [`Session`]: session/struct.Session.html
//! [`Response`]: response/struct.Response.html
//! [`Oracle`]: client/struct.Oracle.html
//! [`RunCtx`]: harness/struct.RunCtx.html
//! [`http11`]: http11/index.html
//! [`response`]: response/index.html

#[macro_use]
extern crate log;

mod error;

pub mod client;
pub mod harness;
pub mod response;
pub mod session;

#[doc(hidden)]
pub mod http11;

pub(crate) use futures_io::AsyncRead;

pub use client::{Oracle, ProbeConfig, RequestSpec};
pub use error::Error;
pub use harness::{RunConfig, RunCtx};
pub use response::Response;
pub use session::Session;

pub(crate) fn err_closed<T>() -> Result<T, Error> {
    use std::io;
    Err(io::Error::new(io::ErrorKind::NotConnected, "Session is not connected").into())
}

/// Asserts a scenario-level expectation, failing the scenario with a
/// captured cause instead of panicking.
#[macro_export]
macro_rules! check {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::Error::Check(format!($($arg)+)));
        }
    };
}
