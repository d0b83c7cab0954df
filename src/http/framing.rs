//! Line-level HTTP/1.x framing shared by the request and response sides.
//!
//! A message head is a sequence of CRLF-terminated lines closed by a bare
//! `\r\n`. [`HeaderScanner`] is the two-state machine (`Fields` → `Complete`)
//! both sides drive line by line; nothing may be relayed as body until it has
//! reported [`Line::Terminator`].

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::config::LimitsConfig;

/// The line that closes a header block.
pub const TERMINATOR: &[u8] = b"\r\n";

const CONTENT_LENGTH: &[u8] = b"content-length";

/// Size bounds applied while reading message heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingLimits {
    /// Longest accepted line, CRLF included.
    pub max_line_length: usize,
    /// Largest accepted request head (header lines plus terminator).
    pub max_header_bytes: usize,
}

impl Default for FramingLimits {
    fn default() -> Self {
        Self {
            max_line_length: 8192,
            max_header_bytes: 64 * 1024,
        }
    }
}

impl From<&LimitsConfig> for FramingLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_line_length: config.max_line_length,
            max_header_bytes: config.max_header_bytes,
        }
    }
}

/// Read one line (up to and including `\n`) into `buf`, replacing its contents.
///
/// Returns the number of bytes read; `0` means the peer closed the stream.
/// A line that reaches `max_len` bytes without a newline is an `InvalidData`
/// error, unless the stream ends right there. A final line cut short by
/// end-of-stream is returned as is.
pub async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>, max_len: usize) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let n = (&mut *reader)
        .take(max_len as u64)
        .read_until(b'\n', buf)
        .await?;

    if n >= max_len && !buf.ends_with(b"\n") && !reader.fill_buf().await?.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {max_len} bytes"),
        ));
    }
    Ok(n)
}

/// Extract the value of a `Content-Length` header line.
///
/// The field name is compared case-insensitively; the value is the run of
/// digits after the colon and any leading blanks. Lines with another name,
/// or with no digits, yield `None`.
pub fn parse_content_length(line: &[u8]) -> Option<u64> {
    let colon = line.iter().position(|&b| b == b':')?;
    let (name, value) = (&line[..colon], &line[colon + 1..]);
    if !name.eq_ignore_ascii_case(CONTENT_LENGTH) {
        return None;
    }

    let value = match value.iter().position(|b| !matches!(b, b' ' | b'\t')) {
        Some(start) => &value[start..],
        None => return None,
    };
    let digits = value.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    // Digits are ASCII, so the conversion cannot fail; overflow can.
    std::str::from_utf8(&value[..digits]).ok()?.parse().ok()
}

/// What a scanned line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// A start line or header field; more lines follow.
    Field,
    /// The blank line closing the head.
    Terminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Fields,
    Complete,
}

/// Tracks a header block as its lines go by.
///
/// Counts every byte fed to it and remembers the first `Content-Length`
/// seen; later duplicates are ignored.
#[derive(Debug)]
pub struct HeaderScanner {
    state: ScanState,
    content_length: Option<u64>,
    bytes: u64,
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Fields,
            content_length: None,
            bytes: 0,
        }
    }

    /// Account for one line read from the peer.
    pub fn feed(&mut self, line: &[u8]) -> Line {
        debug_assert_eq!(self.state, ScanState::Fields, "line fed after terminator");

        self.bytes += line.len() as u64;
        if line == TERMINATOR {
            self.state = ScanState::Complete;
            return Line::Terminator;
        }
        if self.content_length.is_none() {
            self.content_length = parse_content_length(line);
        }
        Line::Field
    }

    /// Whether the terminator has been seen.
    pub fn is_complete(&self) -> bool {
        self.state == ScanState::Complete
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Total bytes fed so far, terminator included.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Default for HeaderScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Error for a stream that ended before the header terminator.
pub(crate) fn unterminated_head() -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "stream closed before end of headers",
    )
}
