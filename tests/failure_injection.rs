//! Failure injection: every abandoned exchange closes the client connection
//! without a response from the proxy and without an access log line.

use std::time::Duration;

use forward_proxy::config::ProxyConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

mod common;

const OK_RESPONSE: &[u8] = b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nok";

async fn assert_not_logged(proxy: &common::TestProxy) {
    // Give an erroneous log write time to land.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(proxy.log.lines().is_empty(), "unexpected log: {:?}", proxy.log.lines());
}

#[tokio::test]
async fn missing_scheme_is_dropped() {
    let (_origin, mut received) = common::start_origin(OK_RESPONSE).await;
    let proxy = common::start_proxy().await;

    let response = common::send(proxy.addr, b"GET /index.html HTTP/1.0\r\n\r\n").await;
    assert!(response.is_empty());
    assert_not_logged(&proxy).await;
    assert!(received.try_recv().is_err());
}

#[tokio::test]
async fn malformed_request_line_is_dropped() {
    let proxy = common::start_proxy().await;

    for request in [
        &b"GET\r\n\r\n"[..],
        b"GET http://127.0.0.1/ HTTP/1.0 extra\r\n\r\n",
        b"\r\n",
        b"",
    ] {
        assert!(common::send(proxy.addr, request).await.is_empty());
    }
    assert_not_logged(&proxy).await;
}

#[tokio::test]
async fn empty_port_is_dropped() {
    let proxy = common::start_proxy().await;

    let response = common::send(proxy.addr, b"GET http://127.0.0.1:/x HTTP/1.0\r\n\r\n").await;
    assert!(response.is_empty());
    assert_not_logged(&proxy).await;
}

#[tokio::test]
async fn refused_origin_is_dropped() {
    let port = common::closed_port().await;
    let proxy = common::start_proxy().await;

    let request = format!("GET http://127.0.0.1:{port}/ HTTP/1.0\r\n\r\n");
    assert!(common::send(proxy.addr, request.as_bytes()).await.is_empty());
    assert_not_logged(&proxy).await;
}

#[tokio::test]
async fn unterminated_request_head_never_reaches_origin() {
    let (origin, mut received) = common::start_origin(OK_RESPONSE).await;
    let proxy = common::start_proxy().await;

    let request = format!("GET http://127.0.0.1:{}/ HTTP/1.0\r\nHost: x\r\n", origin.port());
    assert!(common::send(proxy.addr, request.as_bytes()).await.is_empty());
    assert_not_logged(&proxy).await;
    assert!(received.try_recv().is_err());
}

#[tokio::test]
async fn short_request_body_gets_no_response() {
    let (origin, _received) = common::start_origin(OK_RESPONSE).await;
    let proxy = common::start_proxy().await;

    let request = format!(
        "POST http://127.0.0.1:{}/upload HTTP/1.0\r\nContent-Length: 50\r\n\r\nonly twenty bytes...",
        origin.port()
    );
    assert!(common::send(proxy.addr, request.as_bytes()).await.is_empty());
    assert_not_logged(&proxy).await;
}

#[tokio::test]
async fn truncated_response_is_not_logged() {
    let origin = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = origin.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = origin.accept().await.unwrap();
        common::read_head(&mut socket).await;
        socket
            .write_all(b"HTTP/1.0 200 OK\r\nContent-Length: 100\r\n\r\npartial")
            .await
            .unwrap();
    });
    let proxy = common::start_proxy().await;

    let request = format!("GET http://127.0.0.1:{port}/big HTTP/1.0\r\n\r\n");
    let response = common::send(proxy.addr, request.as_bytes()).await;
    assert!(response.ends_with(b"partial"));
    assert_not_logged(&proxy).await;
}

#[tokio::test]
async fn oversized_header_line_is_dropped() {
    let (origin, mut received) = common::start_origin(OK_RESPONSE).await;
    let mut config = ProxyConfig::default();
    config.limits.max_line_length = 64;
    let proxy = common::start_proxy_with(config).await;

    let request = format!(
        "GET http://127.0.0.1:{}/ HTTP/1.0\r\nX-Padding: {}\r\n\r\n",
        origin.port(),
        "a".repeat(200)
    );
    assert!(common::send(proxy.addr, request.as_bytes()).await.is_empty());
    assert_not_logged(&proxy).await;
    assert!(received.try_recv().is_err());
}

#[tokio::test]
async fn stalled_client_hits_io_deadline() {
    let mut config = ProxyConfig::default();
    config.timeouts.io_secs = Some(1);
    let proxy = common::start_proxy_with(config).await;

    let mut client = tokio::net::TcpStream::connect(proxy.addr).await.unwrap();
    client.write_all(b"GET http://127.0.0.1/ HTTP/1.0\r\n").await.unwrap();

    let mut buf = Vec::new();
    let closed = tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut buf)).await;
    assert!(closed.is_ok(), "proxy kept the stalled connection open");
    assert!(buf.is_empty());
    assert_not_logged(&proxy).await;
}
