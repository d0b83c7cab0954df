//! Configuration validation.
//!
//! Semantic checks that serde cannot express. Every problem is collected so
//! an operator sees the whole list at once.

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut check = |ok: bool, field: &'static str, message: String| {
        if !ok {
            errors.push(ValidationError { field, message });
        }
    };

    check(
        config.listener.bind_address.parse::<SocketAddr>().is_ok(),
        "listener.bind_address",
        format!("{:?} is not a socket address", config.listener.bind_address),
    );
    check(
        config.listener.max_connections > 0,
        "listener.max_connections",
        "must be greater than 0".into(),
    );
    check(
        config.timeouts.connect_secs != Some(0),
        "timeouts.connect_secs",
        "must be greater than 0 when set".into(),
    );
    check(
        config.timeouts.io_secs != Some(0),
        "timeouts.io_secs",
        "must be greater than 0 when set".into(),
    );
    check(
        config.limits.max_line_length >= 2,
        "limits.max_line_length",
        "must leave room for at least CRLF".into(),
    );
    check(
        config.limits.max_header_bytes >= 2,
        "limits.max_header_bytes",
        "must leave room for at least CRLF".into(),
    );
    check(
        config.observability.log_level.parse::<tracing::Level>().is_ok(),
        "observability.log_level",
        format!("unknown level {:?}", config.observability.log_level),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
