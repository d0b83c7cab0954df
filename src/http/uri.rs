//! Absolute-URI decomposition.
//!
//! Splits `http://host[:port][/path]` into the pieces needed to reach the
//! origin and to rewrite the request line into origin-relative form. The
//! path is passed through verbatim: no percent-decoding, no query handling.

use crate::http::error::{ProxyError, ProxyResult};

const SCHEME: &[u8] = b"http://";

/// Characters that end the host part of the authority. NUL is kept for
/// targets that carry embedded terminators.
const HOST_DELIMITERS: &[u8] = b" :/\r\n\0";

const DEFAULT_PORT: &str = "80";

/// Where a request is going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddress {
    pub host: String,
    /// Decimal port, `"80"` when the URI names none.
    pub port: String,
    /// Everything after the first `/` following the scheme, without that
    /// slash. Raw bytes: the target is not required to be UTF-8.
    pub path: Vec<u8>,
}

impl TargetAddress {
    /// `host:port`, suitable for resolving and connecting.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The request target sent to the origin. Always starts with `/`.
    pub fn origin_form(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.path.len() + 1);
        out.push(b'/');
        out.extend_from_slice(&self.path);
        out
    }
}

/// Decompose an absolute `http://` URI.
pub fn decompose(uri: impl AsRef<[u8]>) -> ProxyResult<TargetAddress> {
    let uri = uri.as_ref();
    let display = || String::from_utf8_lossy(uri).into_owned();

    let has_scheme = uri
        .get(..SCHEME.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SCHEME));
    if !has_scheme {
        return Err(ProxyError::Scheme { uri: display() });
    }

    let rest = &uri[SCHEME.len()..];
    let host_end = rest
        .iter()
        .position(|b| HOST_DELIMITERS.contains(b))
        .unwrap_or(rest.len());

    let host = match std::str::from_utf8(&rest[..host_end]) {
        Ok("") => {
            return Err(ProxyError::Uri {
                uri: display(),
                reason: "empty host",
            })
        }
        Ok(host) => host,
        Err(_) => {
            return Err(ProxyError::Uri {
                uri: display(),
                reason: "host is not valid UTF-8",
            })
        }
    };

    let port = if rest.get(host_end) == Some(&b':') {
        let after = &rest[host_end + 1..];
        let digits = after.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return Err(ProxyError::Uri {
                uri: display(),
                reason: "port has no digits",
            });
        }
        after[..digits].iter().map(|&b| char::from(b)).collect()
    } else {
        DEFAULT_PORT.to_string()
    };

    let path = match rest.iter().position(|&b| b == b'/') {
        Some(slash) => rest[slash + 1..].to_vec(),
        None => Vec::new(),
    };

    Ok(TargetAddress {
        host: host.to_string(),
        port,
        path,
    })
}
