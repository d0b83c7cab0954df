//! Per-connection session orchestration.
//!
//! A session serves exactly one request/response exchange:
//!
//! ```text
//! Start → ParsingRequestLine → ResolvingUri → ReadingRequestHeaders
//!       → ConnectingOrigin → RelayingRequestBody → RelayingResponse
//!       → Logged → Closed
//! ```
//!
//! Any state may jump straight to `Closed` on failure, skipping `Logged`.
//! Only a fully relayed response is logged. The origin connection is opened
//! inside the exchange and dropped (closed) when it returns, whatever the
//! outcome.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::http::body::relay_exact;
use crate::http::error::{ProxyError, ProxyResult, RelayStage};
use crate::http::framing::FramingLimits;
use crate::http::request::{read_header_block, read_request_line, send_request_head, RequestHead};
use crate::http::response::relay_response;
use crate::http::uri::{decompose, TargetAddress};
use crate::net::ConnectionId;
use crate::observability::AccessLogger;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Start,
    ParsingRequestLine,
    ResolvingUri,
    ReadingRequestHeaders,
    ConnectingOrigin,
    RelayingRequestBody,
    RelayingResponse,
    Logged,
    Closed,
}

impl SessionState {
    fn successor(self) -> Option<Self> {
        use SessionState::*;
        match self {
            Start => Some(ParsingRequestLine),
            ParsingRequestLine => Some(ResolvingUri),
            ResolvingUri => Some(ReadingRequestHeaders),
            ReadingRequestHeaders => Some(ConnectingOrigin),
            ConnectingOrigin => Some(RelayingRequestBody),
            RelayingRequestBody => Some(RelayingResponse),
            RelayingResponse => Some(Logged),
            Logged => Some(Closed),
            Closed => None,
        }
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: Self) -> bool {
        match next {
            SessionState::Closed => self != SessionState::Closed,
            _ => self.successor() == Some(next),
        }
    }
}

/// Records the path a session takes through its states.
#[derive(Debug)]
struct StateMachine {
    current: SessionState,
    path: Vec<SessionState>,
}

impl StateMachine {
    fn new() -> Self {
        Self {
            current: SessionState::Start,
            path: vec![SessionState::Start],
        }
    }

    fn enter(&mut self, next: SessionState) {
        debug_assert!(
            self.current.can_transition_to(next),
            "illegal session transition {:?} -> {:?}",
            self.current,
            next
        );
        tracing::trace!(from = ?self.current, to = ?next, "Session state");
        self.current = next;
        self.path.push(next);
    }
}

/// Everything a session needs besides its client stream. Shared by all sessions.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub logger: AccessLogger,
    pub limits: FramingLimits,
    pub connect_timeout: Option<Duration>,
    pub io_timeout: Option<Duration>,
}

impl SessionContext {
    /// Context with default limits and no deadlines.
    pub fn new(logger: AccessLogger) -> Self {
        Self {
            logger,
            limits: FramingLimits::default(),
            connect_timeout: None,
            io_timeout: None,
        }
    }

    pub fn from_config(config: &ProxyConfig, logger: AccessLogger) -> Self {
        Self {
            logger,
            limits: FramingLimits::from(&config.limits),
            connect_timeout: config.timeouts.connect_secs.map(Duration::from_secs),
            io_timeout: config.timeouts.io_secs.map(Duration::from_secs),
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub struct SessionReport {
    /// Response bytes relayed, or why the exchange was abandoned.
    pub result: ProxyResult<u64>,
    /// Every state entered, in order, starting at `Start`.
    pub path: Vec<SessionState>,
}

#[cfg(test)]
impl SessionReport {
    fn final_state(&self) -> SessionState {
        self.path.last().copied().unwrap_or(SessionState::Start)
    }
}

/// One client connection's single exchange.
pub struct Session<S> {
    id: ConnectionId,
    peer: SocketAddr,
    client: S,
    context: Arc<SessionContext>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(id: ConnectionId, peer: SocketAddr, client: S, context: Arc<SessionContext>) -> Self {
        Self {
            id,
            peer,
            client,
            context,
        }
    }

    /// Run the exchange to completion or failure.
    pub async fn run(self) -> SessionReport {
        let Session {
            id,
            peer,
            client,
            context,
        } = self;
        let span = tracing::debug_span!("session", connection_id = %id, peer = %peer);
        let mut machine = StateMachine::new();

        let outcome = async {
            let exchange = exchange(&context, client, &mut machine);
            match context.io_timeout {
                Some(limit) => tokio::time::timeout(limit, exchange)
                    .await
                    .unwrap_or_else(|_| Err(ProxyError::Timeout(limit))),
                None => exchange.await,
            }
        }
        .instrument(span.clone())
        .await;

        let _entered = span.enter();
        let result = match outcome {
            Ok((uri, bytes)) => {
                machine.enter(SessionState::Logged);
                let entry = context.logger.entry(peer.ip(), uri, bytes);
                context.logger.record(&entry);
                tracing::debug!(bytes, "Exchange complete");
                Ok(bytes)
            }
            Err(e) => {
                if e.is_operator_visible() {
                    tracing::warn!(error = %e, kind = e.kind(), "Session aborted");
                } else {
                    tracing::debug!(error = %e, kind = e.kind(), "Session aborted");
                }
                Err(e)
            }
        };
        machine.enter(SessionState::Closed);

        SessionReport {
            result,
            path: machine.path,
        }
    }
}

/// Drive one exchange. Returns the URI as the client sent it and the response
/// byte count.
async fn exchange<S>(
    context: &SessionContext,
    client: S,
    machine: &mut StateMachine,
) -> ProxyResult<(String, u64)>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, mut client_write) = tokio::io::split(client);
    let mut client_read = BufReader::new(client_read);

    machine.enter(SessionState::ParsingRequestLine);
    let line = read_request_line(&mut client_read, &context.limits).await?;

    machine.enter(SessionState::ResolvingUri);
    let target = decompose(&line.uri)?;

    machine.enter(SessionState::ReadingRequestHeaders);
    let headers = read_header_block(&mut client_read, &context.limits).await?;
    let head = RequestHead {
        line,
        target,
        headers,
    };

    machine.enter(SessionState::ConnectingOrigin);
    let mut origin = connect_origin(&head.target, context.connect_timeout).await?;
    let (origin_read, mut origin_write) = origin.split();
    let mut origin_read = BufReader::new(origin_read);

    machine.enter(SessionState::RelayingRequestBody);
    send_request_head(&mut origin_write, &head).await?;
    relay_exact(&mut client_read, &mut origin_write, head.body_length())
        .await
        .map_err(|e| ProxyError::relay(RelayStage::RequestBody, e))?;

    machine.enter(SessionState::RelayingResponse);
    let bytes = relay_response(&mut origin_read, &mut client_write, context.limits.max_line_length).await?;

    Ok((head.line.uri_text().into_owned(), bytes))
}

async fn connect_origin(target: &TargetAddress, timeout: Option<Duration>) -> ProxyResult<TcpStream> {
    let authority = target.authority();
    let connect = TcpStream::connect(authority.as_str());
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))),
        None => connect.await,
    };

    let stream = result.map_err(|source| ProxyError::Connect {
        host: target.host.clone(),
        port: target.port.clone(),
        source,
    })?;
    tracing::debug!(origin = %authority, "Connected to origin");
    Ok(stream)
}
