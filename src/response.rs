//! Validation of a framed response head against the server contract.

use crate::Error;
use http::StatusCode;
use std::collections::HashMap;

/// The closed set of response header names the oracle accepts.
///
/// The server contract restricts itself to this minimal set; any other name
/// in a response is treated as a server defect, not leniently skipped.
pub const ACCEPTED_HEADERS: &[&str] = &[
    "connection",
    "content-type",
    "content-length",
    "server",
    "location",
];

/// One fully received and validated response.
#[derive(Debug)]
pub struct Response {
    /// Status code from the status line.
    pub status: StatusCode,
    /// Declared `content-length`, 0 when the header is absent.
    pub content_length: u64,
    /// Body bytes. Always empty for HEAD exchanges.
    pub body: Vec<u8>,
    /// Whether either peer signalled closure for this exchange: the server
    /// via a `connection: close` header, or the client by requesting it.
    pub closed: bool,
    /// Headers by lowercased name, values trimmed. Names are unique; a
    /// repeated name never gets this far.
    pub headers: HashMap<String, String>,
}

/// The validated head, before body completion.
#[derive(Debug)]
pub struct Head {
    /// Status code from the status line.
    pub status: StatusCode,
    /// Declared `content-length`, 0 when absent.
    pub content_length: u64,
    /// The server sent `connection: close`.
    pub server_close: bool,
    /// Headers by lowercased name, values trimmed.
    pub headers: HashMap<String, String>,
}

/// Parse and validate a response head (the bytes up to and including the
/// `\r\n\r\n` terminator).
///
/// Fatal conditions, in the order they are detected:
///
/// 1. Anything `httparse` rejects, or an incomplete head.
/// 2. A protocol version other than HTTP/1.1. The server must answer with
///    HTTP/1.1 no matter what version the request declared.
/// 3. A status code that is not a valid three digit code.
/// 4. A header name outside [`ACCEPTED_HEADERS`].
/// 5. A header name repeated across lines. Duplicates are never merged and
///    never last-wins.
/// 6. A `content-length` value that is not a non-negative integer.
///
/// The reason phrase is deliberately not validated.
///
/// [`ACCEPTED_HEADERS`]: constant.ACCEPTED_HEADERS.html
pub fn parse_head(raw: &[u8]) -> Result<Head, Error> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut parser = httparse::Response::new(&mut headers);

    let status = parser.parse(raw)?;

    if status.is_partial() {
        return Err(Error::Protocol("incomplete response head".into()));
    }

    if parser.version != Some(1) {
        return Err(Error::Protocol(
            "status line does not begin with HTTP/1.1".into(),
        ));
    }

    let code = parser
        .code
        .ok_or_else(|| Error::Protocol("status line without a code".into()))?;

    let status = StatusCode::from_u16(code)
        .map_err(|_| Error::Protocol(format!("invalid status code: {}", code)))?;

    let mut map = HashMap::new();
    let mut server_close = false;
    let mut content_length = 0;

    for header in parser.headers.iter() {
        let name = header.name.to_ascii_lowercase();

        if !ACCEPTED_HEADERS.contains(&name.as_str()) {
            return Err(Error::Protocol(format!(
                "header '{}' is outside the accepted set",
                name
            )));
        }

        if map.contains_key(&name) {
            return Err(Error::Protocol(format!("duplicate header '{}'", name)));
        }

        let value = String::from_utf8_lossy(header.value).trim().to_string();

        if name == "connection" && value.eq_ignore_ascii_case("close") {
            server_close = true;
        }

        if name == "content-length" {
            content_length = value.parse::<u64>().map_err(|_| {
                Error::Protocol(format!("content-length is not a number: '{}'", value))
            })?;
        }

        map.insert(name, value);
    }

    let head = Head {
        status,
        content_length,
        server_close,
        headers: map,
    };

    debug!("parse_head: {:?}", head);

    Ok(head)
}

/// Whether the request's own header lines declare `connection: close`.
///
/// The first line is the request line and is skipped. Name and value are
/// matched case-insensitively with surrounding whitespace trimmed, so
/// `Connection: close`, `connection:close` and `ConNECtioN: close` all
/// count.
pub fn requests_close(lines: &[String]) -> bool {
    lines.iter().skip(1).any(|line| match split_colon(line) {
        Some((name, value)) => {
            name.trim().eq_ignore_ascii_case("connection")
                && value.trim().eq_ignore_ascii_case("close")
        }
        None => false,
    })
}

fn split_colon(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(':')?;
    Some((&line[..idx], &line[idx + 1..]))
}
