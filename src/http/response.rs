//! Origin response relay.
//!
//! The status line and headers are forwarded line by line as they arrive,
//! then exactly `Content-Length` body bytes follow (none when absent).

use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

use crate::http::body::relay_exact;
use crate::http::error::{ProxyError, ProxyResult, RelayStage};
use crate::http::framing::{read_line, unterminated_head, HeaderScanner, Line};

/// A response head that has been fully forwarded to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    /// First `Content-Length` value, if any.
    pub content_length: Option<u64>,
    /// Bytes of status line, headers and terminator written to the client.
    pub bytes: u64,
}

/// Forward the status line and headers, up to and including the blank line.
pub async fn relay_response_head<R, W>(
    origin: &mut R,
    client: &mut W,
    max_line_length: usize,
) -> ProxyResult<ResponseHead>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let fail = |e: std::io::Error| ProxyError::relay(RelayStage::ResponseHead, e);
    let mut scanner = HeaderScanner::new();
    let mut line = Vec::new();

    loop {
        let n = read_line(origin, &mut line, max_line_length).await.map_err(fail)?;
        if n == 0 {
            return Err(fail(unterminated_head()));
        }
        client.write_all(&line).await.map_err(fail)?;
        if scanner.feed(&line) == Line::Terminator {
            break;
        }
    }
    client.flush().await.map_err(fail)?;

    Ok(ResponseHead {
        content_length: scanner.content_length(),
        bytes: scanner.bytes(),
    })
}

/// Forward the body announced by `head`.
pub async fn relay_response_body<R, W>(origin: &mut R, client: &mut W, head: &ResponseHead) -> ProxyResult<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    relay_exact(origin, client, head.content_length.unwrap_or(0))
        .await
        .map_err(|e| ProxyError::relay(RelayStage::ResponseBody, e))
}

/// Relay a whole response. Returns head bytes plus body bytes.
///
/// On failure the client may already hold part of the response; the count
/// of what it got is not reported.
pub async fn relay_response<R, W>(origin: &mut R, client: &mut W, max_line_length: usize) -> ProxyResult<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let head = relay_response_head(origin, client, max_line_length).await?;
    let body = relay_response_body(origin, client, &head).await?;
    Ok(head.bytes + body)
}
