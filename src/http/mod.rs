//! HTTP forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Client connection
//!     → server.rs (accept loop, one task per connection)
//!     → session.rs (state machine for the single exchange)
//!         → request.rs (request line, header block)
//!         → uri.rs (absolute-URI → host, port, path)
//!         → [connect to origin]
//!         → request.rs (rewritten head) + body.rs (request body)
//!         → response.rs (head line by line, then body.rs)
//!     → access log entry on success
//! ```
//!
//! framing.rs holds the line reader and header-block scanner both
//! directions share. Errors are collected in error.rs.

pub mod body;
pub mod error;
pub mod framing;
pub mod request;
pub mod response;
pub mod server;
pub mod session;
pub mod uri;

pub use error::{ProxyError, ProxyResult, RelayStage};
pub use server::ProxyServer;
pub use session::{Session, SessionContext, SessionReport, SessionState};
pub use uri::{decompose, TargetAddress};
