//! Access log for completed exchanges.
//!
//! One line per successfully proxied request:
//!
//! ```text
//! Mon 19 Oct 2026 14:03:07 +02:00: 10.0.0.7 http://example.com/index.html 4312
//! ```
//!
//! The logger is a cloneable handle around a mutex-protected sink, handed to
//! every session. A line is fully formatted before the lock is taken and is
//! written with a single `write_all`, so concurrent sessions never interleave.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// One completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: OffsetDateTime,
    pub client: IpAddr,
    /// The request target exactly as the client sent it.
    pub uri: String,
    /// Response bytes relayed to the client, head included.
    pub bytes: u64,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = format_description!(
            "[weekday repr:short] [day] [month repr:short] [year] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
        );
        let timestamp = self.timestamp.format(format).map_err(|_| fmt::Error)?;
        write!(
            f,
            "{}: {} {} {}",
            timestamp,
            self.client.to_canonical(),
            self.uri,
            self.bytes
        )
    }
}

type Sink = Box<dyn Write + Send>;

/// Serializes access log lines from concurrent sessions onto one sink.
#[derive(Clone)]
pub struct AccessLogger {
    sink: Arc<Mutex<Sink>>,
    offset: UtcOffset,
}

impl AccessLogger {
    /// Log to an arbitrary writer, stamping entries in the given UTC offset.
    pub fn new<W>(sink: W, offset: UtcOffset) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            sink: Arc::new(Mutex::new(Box::new(sink))),
            offset,
        }
    }

    /// Log to standard output.
    pub fn stdout(offset: UtcOffset) -> Self {
        Self::new(io::stdout(), offset)
    }

    /// Append to the file at `path`, creating it if needed.
    pub fn open(path: &Path, offset: UtcOffset) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file, offset))
    }

    /// Build an entry stamped with the current time.
    pub fn entry(&self, client: IpAddr, uri: impl Into<String>, bytes: u64) -> LogEntry {
        LogEntry {
            timestamp: OffsetDateTime::now_utc().to_offset(self.offset),
            client,
            uri: uri.into(),
            bytes,
        }
    }

    /// Write one entry as a single line.
    ///
    /// Sink failures are reported through tracing and otherwise ignored; a
    /// broken log must not take sessions down with it.
    pub fn record(&self, entry: &LogEntry) {
        let line = format!("{entry}\n");

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = sink.write_all(line.as_bytes()).and_then(|_| sink.flush()) {
            tracing::warn!(error = %e, "Failed to write access log entry");
        }
    }
}

impl fmt::Debug for AccessLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessLogger")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
