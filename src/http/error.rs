//! Session error taxonomy.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Reasons a proxied exchange is abandoned.
///
/// Every variant ends the session locally; none of them is ever turned into a
/// response to the client.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The request line was missing, unreadable or not `METHOD URI VERSION`.
    #[error("invalid request line: {0}")]
    RequestLine(String),

    /// The request target does not start with `http://`.
    #[error("unsupported scheme in {uri:?}")]
    Scheme { uri: String },

    /// The request target has an `http://` prefix but no usable host or port.
    #[error("malformed uri {uri:?}: {reason}")]
    Uri { uri: String, reason: &'static str },

    /// The client went away (or misbehaved) before the blank line ending the headers.
    #[error("failed to read request headers: {0}")]
    HeaderRead(#[source] io::Error),

    /// The origin server could not be reached.
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: String,
        #[source]
        source: io::Error,
    },

    /// A read or write failed while moving bytes between the peers.
    #[error("relay failed while {stage}: {source}")]
    Relay {
        stage: RelayStage,
        #[source]
        source: io::Error,
    },

    /// The exchange exceeded the configured I/O deadline.
    #[error("exchange timed out after {0:?}")]
    Timeout(Duration),
}

impl ProxyError {
    pub(crate) fn relay(stage: RelayStage, source: io::Error) -> Self {
        Self::Relay { stage, source }
    }

    /// Whether the failure is worth an operator's attention.
    ///
    /// Parse failures are a client's problem and are only logged at debug level.
    pub fn is_operator_visible(&self) -> bool {
        matches!(
            self,
            ProxyError::Connect { .. } | ProxyError::Relay { .. } | ProxyError::Timeout(_)
        )
    }

    /// Short label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::RequestLine(_) => "request_line",
            ProxyError::Scheme { .. } => "scheme",
            ProxyError::Uri { .. } => "uri",
            ProxyError::HeaderRead(_) => "header_read",
            ProxyError::Connect { .. } => "connect",
            ProxyError::Relay { .. } => "relay",
            ProxyError::Timeout(_) => "timeout",
        }
    }
}

/// Where a relay failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    /// Writing the rewritten request head to the origin.
    RequestHead,
    /// Moving the request body from client to origin.
    RequestBody,
    /// Forwarding the origin's status line and headers.
    ResponseHead,
    /// Moving the response body from origin to client.
    ResponseBody,
}

impl std::fmt::Display for RelayStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RelayStage::RequestHead => "sending request head",
            RelayStage::RequestBody => "relaying request body",
            RelayStage::ResponseHead => "relaying response head",
            RelayStage::ResponseBody => "relaying response body",
        };
        f.write_str(s)
    }
}

/// Result type for session operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_visibility() {
        assert!(!ProxyError::RequestLine("empty".into()).is_operator_visible());
        assert!(!ProxyError::Scheme { uri: "ftp://x".into() }.is_operator_visible());
        assert!(ProxyError::Timeout(Duration::from_secs(5)).is_operator_visible());

        let err = ProxyError::relay(
            RelayStage::ResponseBody,
            io::Error::from(io::ErrorKind::UnexpectedEof),
        );
        assert!(err.is_operator_visible());
        assert_eq!(err.kind(), "relay");
    }

    #[test]
    fn display_includes_stage() {
        let err = ProxyError::relay(
            RelayStage::RequestBody,
            io::Error::from(io::ErrorKind::BrokenPipe),
        );
        assert!(err.to_string().contains("relaying request body"));
    }

    #[test]
    fn timeout_keeps_sub_second_precision() {
        let err = ProxyError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "exchange timed out after 250ms");
    }
}
