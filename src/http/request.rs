//! Client request head: request line, header block and the rewritten head
//! forwarded to the origin.

use std::borrow::Cow;
use std::io;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};

use crate::http::error::{ProxyError, ProxyResult, RelayStage};
use crate::http::framing::{read_line, unterminated_head, FramingLimits, HeaderScanner, Line};
use crate::http::uri::TargetAddress;

/// `METHOD SP absolute-URI SP VERSION`.
///
/// Tokens are kept as raw bytes so the rewritten line carries exactly what
/// the client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Vec<u8>,
    pub uri: Vec<u8>,
    pub version: Vec<u8>,
}

impl RequestLine {
    /// Split a raw line into exactly three whitespace-separated tokens.
    pub fn parse(line: &[u8]) -> ProxyResult<Self> {
        let mut tokens = line
            .split(u8::is_ascii_whitespace)
            .filter(|token| !token.is_empty());
        match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
            (Some(method), Some(uri), Some(version), None) => Ok(Self {
                method: method.to_vec(),
                uri: uri.to_vec(),
                version: version.to_vec(),
            }),
            _ => Err(ProxyError::RequestLine(format!(
                "expected 3 fields in {:?}",
                String::from_utf8_lossy(line).trim_end()
            ))),
        }
    }

    /// The request target for diagnostics and the access log.
    pub fn uri_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.uri)
    }

    /// The origin-relative request line, CRLF included.
    pub fn rewrite(&self, target: &TargetAddress) -> Vec<u8> {
        let origin_form = target.origin_form();
        let mut out = Vec::with_capacity(self.method.len() + origin_form.len() + self.version.len() + 4);
        out.extend_from_slice(&self.method);
        out.push(b' ');
        out.extend_from_slice(&origin_form);
        out.push(b' ');
        out.extend_from_slice(&self.version);
        out.extend_from_slice(b"\r\n");
        out
    }

    /// `GET` requests never have their body read, whatever the headers claim.
    pub fn carries_body(&self) -> bool {
        !self.method.eq_ignore_ascii_case(b"GET")
    }
}

/// Header lines exactly as received, terminator included.
#[derive(Debug, Clone)]
pub struct HeaderBlock {
    raw: Vec<u8>,
    content_length: Option<u64>,
}

impl HeaderBlock {
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// First `Content-Length` value seen, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

/// A fully read request, ready to be forwarded.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub line: RequestLine,
    pub target: TargetAddress,
    pub headers: HeaderBlock,
}

impl RequestHead {
    /// Number of body bytes to move from client to origin.
    pub fn body_length(&self) -> u64 {
        if self.line.carries_body() {
            self.headers.content_length().unwrap_or(0)
        } else {
            0
        }
    }

    /// Rewritten request line followed by the verbatim header block.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.line.rewrite(&self.target);
        out.extend_from_slice(&self.headers.raw);
        out
    }
}

/// Read and tokenize the request line.
pub async fn read_request_line<R>(reader: &mut R, limits: &FramingLimits) -> ProxyResult<RequestLine>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = read_line(reader, &mut buf, limits.max_line_length)
        .await
        .map_err(|e| ProxyError::RequestLine(e.to_string()))?;
    if n == 0 {
        return Err(ProxyError::RequestLine("empty request".into()));
    }
    RequestLine::parse(&buf)
}

/// Read header lines up to and including the blank terminator line.
pub async fn read_header_block<R>(reader: &mut R, limits: &FramingLimits) -> ProxyResult<HeaderBlock>
where
    R: AsyncBufRead + Unpin,
{
    let mut scanner = HeaderScanner::new();
    let mut raw = Vec::new();
    let mut line = Vec::new();

    loop {
        let n = read_line(reader, &mut line, limits.max_line_length)
            .await
            .map_err(ProxyError::HeaderRead)?;
        if n == 0 {
            return Err(ProxyError::HeaderRead(unterminated_head()));
        }
        if raw.len() + n > limits.max_header_bytes {
            return Err(ProxyError::HeaderRead(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("request head exceeds {} bytes", limits.max_header_bytes),
            )));
        }

        raw.extend_from_slice(&line);
        if scanner.feed(&line) == Line::Terminator {
            break;
        }
    }

    debug_assert!(scanner.is_complete());
    Ok(HeaderBlock {
        raw,
        content_length: scanner.content_length(),
    })
}

/// Write the rewritten head to the origin.
pub async fn send_request_head<W>(origin: &mut W, head: &RequestHead) -> ProxyResult<()>
where
    W: AsyncWrite + Unpin,
{
    origin
        .write_all(&head.to_bytes())
        .await
        .map_err(|e| ProxyError::relay(RelayStage::RequestHead, e))?;
    origin
        .flush()
        .await
        .map_err(|e| ProxyError::relay(RelayStage::RequestHead, e))
}
