//! Integration tests for tcpeek
//!
//! Resolution and the snapshot composition are exercised over real loopback
//! connections; the control channel is substituted with fixtures where the
//! platform cannot answer the real control code.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tcpeek::{
    resolve, stats_via, tcp_stats, BodyStream, ConnectionStream, ControlChannel,
    DelegatingStream, HttpConnection, RawStream, TcpInfoV0, TcpStats,
};

#[cfg(unix)]
fn raw_handle(stream: &TcpStream) -> tcpeek::RawSocketHandle {
    use std::os::unix::io::AsRawFd;
    stream.as_raw_fd()
}

#[cfg(windows)]
fn raw_handle(stream: &TcpStream) -> tcpeek::RawSocketHandle {
    use std::os::windows::io::AsRawSocket;
    stream.as_raw_socket()
}

async fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).await.unwrap();
    let (server, _) = listener.accept().await.unwrap();
    (client, server)
}

#[tokio::test]
async fn resolves_through_a_two_level_delegating_chain() {
    let (client, _server) = loopback_pair().await;
    let expected = raw_handle(&client);

    let chain: Box<dyn RawStream> = Box::new(DelegatingStream::new(Box::new(
        DelegatingStream::new(Box::new(ConnectionStream::new(client))),
    )));

    let socket = resolve(chain.as_ref()).expect("chain should resolve to the socket");
    assert_eq!(socket.raw(), expected);
}

#[tokio::test]
async fn resolves_through_the_connection_owning_shape() {
    let (client, _server) = loopback_pair().await;
    let expected = raw_handle(&client);

    let connection = HttpConnection::new(client, Vec::new());
    let chain: Box<dyn RawStream> =
        Box::new(DelegatingStream::new(Box::new(BodyStream::new(connection))));

    let socket = resolve(chain.as_ref()).expect("body stream should resolve via its connection");
    assert_eq!(socket.raw(), expected);
}

#[tokio::test]
async fn over_deep_chain_over_a_real_socket_resolves_to_none() {
    let (client, _server) = loopback_pair().await;

    let mut chain: Box<dyn RawStream> = Box::new(ConnectionStream::new(client));
    for _ in 0..5 {
        chain = Box::new(DelegatingStream::new(chain));
    }
    assert!(resolve(chain.as_ref()).is_none());
}

struct FixtureChannel(Vec<u8>);

impl ControlChannel for FixtureChannel {
    fn tcp_info(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(Some(self.0.clone()))
    }
}

#[tokio::test]
async fn fixture_reply_round_trips_through_the_composition() {
    let (client, _server) = loopback_pair().await;
    let chain: Box<dyn RawStream> = Box::new(DelegatingStream::new(Box::new(
        ConnectionStream::new(client),
    )));

    // Resolve the real socket, then answer the query with fixture bytes in
    // place of the platform control channel.
    let _socket = resolve(chain.as_ref()).expect("socket should resolve");

    let mut buf = vec![0u8; TcpInfoV0::WIRE_SIZE];
    buf[0..4].copy_from_slice(&4u32.to_le_bytes());
    buf[4..8].copy_from_slice(&1460u32.to_le_bytes());
    buf[8..16].copy_from_slice(&98_765u64.to_le_bytes());
    buf[16] = 1;
    buf[20..24].copy_from_slice(&15_000u32.to_le_bytes());
    buf[48..56].copy_from_slice(&1_000_000u64.to_le_bytes());
    buf[84] = 2;
    let expected = TcpInfoV0::decode(&buf).unwrap();

    let outcome = stats_via(&FixtureChannel(buf)).unwrap();
    assert_eq!(outcome, TcpStats::Stats(expected));
    match outcome {
        TcpStats::Stats(info) => {
            assert_eq!(info.state, 4);
            assert_eq!(info.mss, 1460);
            assert_eq!(info.connection_time_ms, 98_765);
            assert!(info.timestamps_enabled);
            assert_eq!(info.rtt_us, 15_000);
            assert_eq!(info.bytes_out, 1_000_000);
            assert_eq!(info.syn_retrans, 2);
        }
        other => panic!("expected Stats, got {other:?}"),
    }
}

#[cfg(not(windows))]
#[tokio::test]
async fn live_snapshot_reports_unavailable_off_windows() {
    let (client, _server) = loopback_pair().await;
    let chain: Box<dyn RawStream> = Box::new(DelegatingStream::new(Box::new(
        ConnectionStream::new(client),
    )));

    let outcome = tcp_stats(chain.as_ref()).unwrap();
    assert_eq!(outcome, TcpStats::Unavailable);
}

/// One-shot HTTP server: reads the request header, writes `response`,
/// lingers briefly so the client can sample the live connection.
async fn serve_once(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        socket.write_all(response).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
    });
    addr
}

#[tokio::test]
async fn fetch_yields_a_resolvable_stream_and_the_body() {
    let addr = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789",
    )
    .await;

    let mut stream = tcpeek::http::fetch(&format!("http://{addr}/file")).await.unwrap();
    assert!(resolve(stream.as_ref()).is_some());

    let mut body = Vec::new();
    stream.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"0123456789");
}

#[tokio::test]
async fn fetch_rejects_error_statuses() {
    let addr = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n").await;
    let err = tcpeek::http::fetch(&format!("http://{addr}/missing"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"), "{err}");
}
