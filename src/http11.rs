//! Response framing: locate the end of the head, then account the body.

use crate::AsyncRead;
use crate::Error;
use futures_util::AsyncReadExt;

const END_OF_HEADER: &[u8] = b"\r\n\r\n";

/// Size of buffer reading the head into.
const HEAD_CHUNK_SIZE: usize = 4_096;

/// Size of buffer reading response body into.
const BODY_CHUNK_SIZE: usize = 1_024 * 1_024;

/// Read until the head terminator `\r\n\r\n` has been seen.
///
/// Returns the head bytes including the terminator, plus any body bytes that
/// arrived in the same deliveries past it. The terminator can straddle a
/// chunk boundary, so each scan resumes a few bytes before the previous end
/// of the buffer rather than only looking at the newest chunk.
///
/// A zero-length read before the terminator is found means the peer closed
/// without completing the head, which is fatal.
pub async fn read_head<S>(io: &mut S) -> Result<(Vec<u8>, Vec<u8>), Error>
where
    S: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::with_capacity(HEAD_CHUNK_SIZE);
    let mut chunk = [0_u8; HEAD_CHUNK_SIZE];
    let mut scanned: usize = 0;

    loop {
        if let Some(pos) = find_end_of_header(&buf, scanned.saturating_sub(END_OF_HEADER.len() - 1))
        {
            let body = buf.split_off(pos + END_OF_HEADER.len());

            trace!(
                "read_head: {} head bytes, {} body bytes past terminator",
                buf.len(),
                body.len()
            );

            return Ok((buf, body));
        }

        scanned = buf.len();

        let amount = io.read(&mut chunk[..]).await?;

        if amount == 0 {
            return Err(Error::Transport(
                "EOF before complete http11 header".into(),
            ));
        }

        buf.extend_from_slice(&chunk[..amount]);
    }
}

fn find_end_of_header(buf: &[u8], from: usize) -> Option<usize> {
    buf[from..]
        .windows(END_OF_HEADER.len())
        .position(|w| w == END_OF_HEADER)
        .map(|i| i + from)
}

/// Keep receiving into `body` until it holds exactly `content_length` bytes.
///
/// A zero-length read first is a truncated body; ending up with more bytes
/// than declared is a framing violation on the server's part. Both are
/// fatal.
pub async fn read_body<S>(io: &mut S, body: &mut Vec<u8>, content_length: u64) -> Result<(), Error>
where
    S: AsyncRead + Unpin,
{
    if (body.len() as u64) < content_length {
        body.reserve((content_length as usize).saturating_sub(body.len()));

        let mut chunk = vec![0_u8; BODY_CHUNK_SIZE];

        while (body.len() as u64) < content_length {
            let amount = io.read(&mut chunk[..]).await?;

            if amount == 0 {
                return Err(Error::Transport(format!(
                    "EOF mid body: received {} bytes and expected {}",
                    body.len(),
                    content_length
                )));
            }

            body.extend_from_slice(&chunk[..amount]);
        }
    }

    if body.len() as u64 != content_length {
        return Err(Error::Protocol(format!(
            "body is {} bytes but content-length declared {}",
            body.len(),
            content_length
        )));
    }

    trace!("read_body: {} bytes complete", body.len());

    Ok(())
}
