//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sessions produce:
//!     → logging.rs (tracing events on stderr: failures, phase transitions)
//!     → access_log.rs (one line per completed exchange, stdout or file)
//! ```
//!
//! # Design Decisions
//! - Access log and diagnostics are separate sinks
//! - The access logger is an explicit handle passed to sessions, not a global
//! - Failed exchanges never reach the access log

pub mod access_log;
pub mod logging;

pub use access_log::{AccessLogger, LogEntry};
