//! The single TCP connection to the server under test.

use crate::err_closed;
use crate::AsyncRead;
use crate::Error;
use async_std::net::TcpStream;
use futures_util::AsyncWriteExt;
use std::fmt;
use std::io;
use std::net::Shutdown;
use std::pin::Pin;
use std::task::{Context, Poll};

/// One transport session to a fixed target.
///
/// At most one connection is live at a time. Reuse across exchanges is
/// explicit: callers either call [`connect`] to replace the current stream
/// or keep sending on the one already open. There is no automatic reconnect
/// and no retry; a connection failure is fatal to the calling scenario.
///
/// Receiving goes through the `AsyncRead` impl, which hands out whatever
/// bytes are currently available and returns a zero-length read exactly once
/// when the peer closes. Callers must not read past that point.
///
/// [`connect`]: #method.connect
pub struct Session {
    addr: String,
    stream: Option<TcpStream>,
}

impl Session {
    /// Create a session bound to `localhost:<port>`, not yet connected.
    pub fn new(port: u16) -> Self {
        Session {
            addr: format!("localhost:{}", port),
            stream: None,
        }
    }

    /// Open a new stream to the target, replacing any prior one.
    ///
    /// The prior stream, if any, is shut down first so the server sees the
    /// old connection go away before the new exchange starts.
    pub async fn connect(&mut self) -> Result<(), Error> {
        if let Some(old) = self.stream.take() {
            // Best effort. The peer may have closed it already.
            let _ = old.shutdown(Shutdown::Both);
        }

        let tcp = TcpStream::connect(self.addr.as_str()).await?;

        debug!("connected to {}", self.addr);

        self.stream = Some(tcp);

        Ok(())
    }

    /// Whether a stream is currently open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Write all given bytes before returning.
    ///
    /// Partial writes are retried internally until the full slice is on the
    /// wire.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let stream = match self.stream.as_mut() {
            Some(v) => v,
            None => return err_closed(),
        };

        trace!("send {} bytes", bytes.len());

        stream.write_all(bytes).await?;

        Ok(())
    }

    /// Tear the stream down explicitly, in both directions.
    pub fn shutdown(&mut self) -> Result<(), Error> {
        if let Some(tcp) = self.stream.take() {
            tcp.shutdown(Shutdown::Both)?;
        }
        Ok(())
    }
}

impl AsyncRead for Session {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();

        let stream = match this.stream.as_mut() {
            Some(v) => v,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "Session is not connected",
                ))
                .into();
            }
        };

        Pin::new(stream).poll_read(cx, buf)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Session({}, open: {})", self.addr, self.is_open())
    }
}
