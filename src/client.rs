//! One exchange against the server under test, plus the liveness probe.

use crate::http11;
use crate::response::{self, Response};
use crate::Error;
use crate::Session;
use http::StatusCode;

/// A handcrafted request.
///
/// The first line is always the request line; the remaining lines are raw
/// header text, not parsed before sending, so malformed entries go out
/// verbatim. That is the point: probing how the server reacts to them.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    lines: Vec<String>,
    body: Vec<u8>,
    reuse_connection: bool,
    validate_connection: bool,
}

impl RequestSpec {
    /// A request from raw text lines. Defaults: empty body, fresh
    /// connection, liveness validation on.
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        RequestSpec {
            lines: lines.into_iter().map(Into::into).collect(),
            body: Vec::new(),
            reuse_connection: false,
            validate_connection: true,
        }
    }

    /// Raw body bytes appended after the blank line.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Send on the existing session instead of opening a new one.
    pub fn reuse(mut self) -> Self {
        self.reuse_connection = true;
        self
    }

    /// Skip the liveness probe after this exchange.
    pub fn no_validate(mut self) -> Self {
        self.validate_connection = false;
        self
    }

    /// Whether this is a HEAD exchange, for which no body is ever read.
    pub fn is_head(&self) -> bool {
        self.lines
            .first()
            .map(|l| l.starts_with("HEAD "))
            .unwrap_or(false)
    }

    pub(crate) fn to_wire(&self) -> Vec<u8> {
        let mut wire = self.lines.join("\r\n").into_bytes();
        wire.extend_from_slice(b"\r\n\r\n");
        wire.extend_from_slice(&self.body);
        wire
    }
}

/// How the liveness probe is shaped and judged.
///
/// The expected status is a convention of the target server's contract, not
/// something the HTTP spec pins down, which is why both fields are
/// configuration. The default probes `GET /` with an explicit close and
/// expects 400, since `/` is not a servable file under that contract.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Path of the follow-up GET.
    pub path: String,
    /// Status the probe must yield.
    pub expect: StatusCode,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            path: "/".into(),
            expect: StatusCode::BAD_REQUEST,
        }
    }
}

impl ProbeConfig {
    fn to_request(&self) -> RequestSpec {
        RequestSpec::new(vec![
            format!("GET {} HTTP/1.1", self.path),
            "Connection: close".into(),
        ])
        .reuse()
        .no_validate()
    }
}

/// The oracle client: one [`Session`], strict validation, and the probe.
///
/// [`Session`]: ../session/struct.Session.html
#[derive(Debug)]
pub struct Oracle {
    session: Session,
    probe: ProbeConfig,
    warned_close_echo: bool,
    warnings: Vec<String>,
}

impl Oracle {
    /// An oracle for a server on `localhost:<port>`, with the default probe.
    pub fn new(port: u16) -> Self {
        Oracle::with_probe(port, ProbeConfig::default())
    }

    /// An oracle with an explicit probe convention.
    pub fn with_probe(port: u16, probe: ProbeConfig) -> Self {
        Oracle {
            session: Session::new(port),
            probe,
            warned_close_echo: false,
            warnings: Vec::new(),
        }
    }

    /// Run one exchange, then prove connection liveness if warranted.
    ///
    /// The probe runs only when neither peer signalled closure and the spec
    /// opted into validation. It is an explicit second exchange with probing
    /// disabled, never a nested probe, and it must yield the configured
    /// status: a connection that silently died makes it hang or fail right
    /// here instead of poisoning a later scenario.
    pub async fn perform(&mut self, spec: &RequestSpec) -> Result<Response, Error> {
        let res = self.exchange(spec).await?;

        if spec.validate_connection && !res.closed {
            let probe_req = self.probe.to_request();
            let probed = self.exchange(&probe_req).await?;

            if probed.status != self.probe.expect {
                return Err(Error::Invariant(format!(
                    "liveness probe expected {}, got {}",
                    self.probe.expect, probed.status
                )));
            }
        }

        Ok(res)
    }

    /// One request sent, one response fully parsed. No probing.
    async fn exchange(&mut self, spec: &RequestSpec) -> Result<Response, Error> {
        if !spec.reuse_connection {
            self.session.connect().await?;
        }

        let client_close = response::requests_close(&spec.lines);

        let wire = spec.to_wire();

        debug!("send request: {:?}", String::from_utf8_lossy(&wire));

        self.session.send(&wire).await?;

        let (head_raw, mut body) = http11::read_head(&mut self.session).await?;
        let head = response::parse_head(&head_raw)?;

        if spec.is_head() {
            if !body.is_empty() {
                return Err(Error::Protocol(format!(
                    "HEAD response carried {} body bytes",
                    body.len()
                )));
            }
        } else {
            http11::read_body(&mut self.session, &mut body, head.content_length).await?;
        }

        // A success or not-found response must not unilaterally drop the
        // connection; closure there is only legal if the client asked.
        if (head.status == 200 || head.status == 404) && head.server_close && !client_close {
            return Err(Error::Invariant(format!(
                "{} response closed the connection without the client requesting it",
                head.status
            )));
        }

        if client_close && !head.server_close && !self.warned_close_echo {
            self.warn("server probably should reply with connection: close if connection was closed");
            self.warned_close_echo = true;
        }

        Ok(Response {
            status: head.status,
            content_length: head.content_length,
            body,
            closed: head.server_close || client_close,
            headers: head.headers,
        })
    }

    /// Borrow the underlying session, for scenarios that manipulate the raw
    /// connection (abrupt shutdown, half-sent requests).
    pub fn session(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Record an advisory warning when `cond` holds.
    pub fn warn_if(&mut self, cond: bool, msg: &str) {
        if cond {
            self.warn(msg);
        }
    }

    fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!("warning: {}", msg);
        self.warnings.push(msg);
    }

    /// Drain the warnings recorded since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}
