//! Fixed-length body relay.

use std::io;
use tokio::io::{AsyncBufRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Move exactly `len` bytes from `reader` to `writer`, in order.
///
/// Transfers go through the reader's buffer in blocks. A peer that closes
/// before `len` bytes have arrived is an `UnexpectedEof` error; nothing past
/// `len` is ever consumed from `reader`.
pub async fn relay_exact<R, W>(reader: &mut R, writer: &mut W, len: u64) -> io::Result<u64>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if len == 0 {
        return Ok(0);
    }

    let mut limited = (&mut *reader).take(len);
    let copied = tokio::io::copy_buf(&mut limited, writer).await?;
    if copied < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("peer closed after {copied} of {len} body bytes"),
        ));
    }

    writer.flush().await?;
    Ok(copied)
}
