//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use authstrip::classify::GrammarClassifier;
use authstrip::net::{Listener, ListenerError};
use authstrip::observability::{DecisionLogger, MemorySink};
use authstrip::{DecisionEngine, IcapServer, ServiceConfig, Shutdown};

/// A server running on an ephemeral port with an in-memory decision log.
pub struct TestServer {
    pub addr: SocketAddr,
    pub sink: Arc<MemorySink>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ListenerError>>,
}

/// Start a server with the default configuration on 127.0.0.1.
pub async fn start_server() -> TestServer {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.shutdown_grace_secs = 1;

    let sink = Arc::new(MemorySink::new());
    let engine = DecisionEngine::new(
        Arc::new(GrammarClassifier::new()),
        DecisionLogger::new(sink.clone()),
    );
    let server = IcapServer::new(&config, engine);
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    let handle = tokio::spawn(server.run(listener, stop));

    TestServer {
        addr,
        sink,
        shutdown,
        handle,
    }
}

/// Send a complete request and read until the server closes the connection.
///
/// Requests should carry `Connection: close` so the server hangs up after answering.
pub async fn roundtrip(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("server did not close the connection")
        .unwrap();
    String::from_utf8(out).unwrap()
}

/// Read from `stream` until `marker` has been seen.
pub async fn read_until(stream: &mut TcpStream, marker: &str) -> String {
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&out).contains(marker) {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("timed out waiting for server")
            .unwrap();
        assert!(n > 0, "connection closed before {marker:?}");
        out.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(out).unwrap()
}

/// Build a REQMOD request carrying an HTTP GET without a body.
pub fn reqmod(target: &str, host: &str, extra_icap: &str, extra_http: &str) -> Vec<u8> {
    let http = format!("GET {target} HTTP/1.1\r\nHost: {host}\r\n{extra_http}\r\n");
    format!(
        "REQMOD icap://127.0.0.1/authstrip ICAP/1.0\r\n\
         Host: 127.0.0.1\r\n\
         Connection: close\r\n\
         {extra_icap}\
         Encapsulated: req-hdr=0, null-body={}\r\n\r\n{http}",
        http.len()
    )
    .into_bytes()
}
