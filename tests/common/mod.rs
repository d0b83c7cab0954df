//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forward_proxy::config::ProxyConfig;
use forward_proxy::net::{ConnectionTracker, Listener, ListenerError};
use forward_proxy::{AccessLogger, ProxyServer, Shutdown};
use time::UtcOffset;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// In-memory access log sink shared with the test.
#[derive(Clone, Default)]
pub struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Wait until at least `count` lines have been written.
    ///
    /// Sessions log after the client side is closed, so a client that has
    /// seen EOF may still be ahead of the log.
    pub async fn wait_for_lines(&self, count: usize) -> Vec<String> {
        for _ in 0..200 {
            let lines = self.lines();
            if lines.len() >= count {
                return lines;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.lines()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// A proxy running on an ephemeral loopback port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub log: SharedSink,
    pub shutdown: Shutdown,
    pub tracker: ConnectionTracker,
    pub handle: JoinHandle<Result<(), ListenerError>>,
}

pub async fn start_proxy() -> TestProxy {
    start_proxy_with(ProxyConfig::default()).await
}

/// Start a proxy with `config`; its bind address is ignored.
pub async fn start_proxy_with(config: ProxyConfig) -> TestProxy {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections);

    let log = SharedSink::default();
    let server = ProxyServer::new(&config, AccessLogger::new(log.clone(), UtcOffset::UTC));
    let tracker = server.tracker();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, rx));

    TestProxy {
        addr,
        log,
        shutdown,
        tracker,
        handle,
    }
}

/// What a mock origin saw on one connection.
#[derive(Debug, Clone)]
pub struct Received {
    pub head: String,
    pub body: Vec<u8>,
}

/// Read a request head up to and including the blank line.
pub async fn read_head(socket: &mut TcpStream) -> Vec<u8> {
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        let mut byte = [0u8; 1];
        if socket.read(&mut byte).await.unwrap_or(0) == 0 {
            break;
        }
        head.push(byte[0]);
    }
    head
}

fn declared_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Start a mock origin that answers every connection with `response`.
///
/// Each request it receives (head plus a body sized by its
/// `Content-Length`) is reported on the returned channel.
pub async fn start_origin(response: &'static [u8]) -> (SocketAddr, mpsc::UnboundedReceiver<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let head = String::from_utf8_lossy(&read_head(&mut socket).await).into_owned();
                let mut body = vec![0u8; declared_length(&head)];
                if socket.read_exact(&mut body).await.is_err() {
                    body.clear();
                }
                let _ = tx.send(Received { head, body });
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// A loopback port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Send `request` through the proxy, half-close and collect whatever comes back.
///
/// A reset after partial output still returns the bytes read so far.
pub async fn send(proxy: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(request).await.unwrap();
    let _ = stream.shutdown().await;

    let mut response = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response)).await;
    response
}
