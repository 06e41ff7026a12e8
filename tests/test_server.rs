//! End-to-end tests over loopback TCP

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use windowcast::config::Config;
use windowcast::files::responder::FileResponder;
use windowcast::files::root::RootDir;
use windowcast::server::{Acceptor, AcceptorSummary};

struct TestServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<anyhow::Result<AcceptorSummary>>,
}

impl TestServer {
    async fn start(root: &std::path::Path, mut cfg: Config) -> Self {
        cfg.server.listen_addr = "127.0.0.1:0".to_string();
        let listener = TcpListener::bind(&cfg.server.listen_addr).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let root = RootDir::open(root, cfg.static_files.allow_traversal).unwrap();
        let responder = FileResponder::new(Arc::new(root), &cfg.static_files);
        let acceptor = Acceptor::new(responder, &cfg);

        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(acceptor.run(listener, async {
            let _ = stopped.await;
        }));

        Self { addr, stop, handle }
    }

    async fn get(&self, request: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        response
    }

    async fn stop(self) -> AcceptorSummary {
        let _ = self.stop.send(());
        self.handle.await.unwrap().unwrap()
    }
}

fn filler(size: usize, seed: u8) -> Vec<u8> {
    (0..size).map(|i| seed.wrapping_add((i / 1024) as u8)).collect()
}

fn ok_head(content_type: &str, len: usize) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-type: {}\r\nContent-Length: {}\r\n\r\n",
        content_type, len
    )
    .into_bytes()
}

#[tokio::test]
async fn test_serves_file_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let content = filler(2000, b'a');
    std::fs::write(dir.path().join("index.html"), &content).unwrap();
    let server = TestServer::start(dir.path(), Config::default()).await;

    let response = server.get(b"GET /index.html HTTP/1.1\r\n\r\n").await;

    let mut expected = ok_head("text/html", 2000);
    expected.extend_from_slice(&content);
    assert_eq!(response, expected);

    let summary = server.stop().await;
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_error_responses_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), Config::default()).await;

    assert_eq!(
        server.get(b"POST / HTTP/1.1\r\n\r\n").await,
        b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n".to_vec()
    );
    assert_eq!(
        server.get(b"GET /missing HTTP/1.1\r\n\r\n").await,
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_vec()
    );

    let summary = server.stop().await;
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.completed, 2);
}

#[tokio::test]
async fn test_repeated_requests_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("page.html"), filler(5000, b'x')).unwrap();
    let server = TestServer::start(dir.path(), Config::default()).await;

    let first = server.get(b"GET /page.html HTTP/1.1\r\n\r\n").await;
    let second = server.get(b"GET /page.html HTTP/1.1\r\n\r\n").await;

    assert_eq!(first, second);
    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_connections_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = Vec::new();
    for i in 0..8u8 {
        let content = filler(3000 + i as usize * 1111, b'A' + i);
        let name = format!("file{}.bin", i);
        std::fs::write(dir.path().join(&name), &content).unwrap();
        files.push((name, content));
    }
    let mut cfg = Config::default();
    cfg.static_files.chunk_size = 512;
    let server = TestServer::start(dir.path(), cfg).await;

    let mut clients = tokio::task::JoinSet::new();
    for (name, content) in files.clone() {
        let addr = server.addr;
        clients.spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(format!("GET /{} HTTP/1.1\r\n\r\n", name).as_bytes())
                .await
                .unwrap();
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await.unwrap();
            (content, response)
        });
    }

    while let Some(joined) = clients.join_next().await {
        let (content, response) = joined.unwrap();
        let mut expected = ok_head("application/octet-stream", content.len());
        expected.extend_from_slice(&content);
        assert_eq!(response, expected);
    }

    let summary = server.stop().await;
    assert_eq!(summary.accepted, 8);
    assert_eq!(summary.completed, 8);
}

#[tokio::test]
async fn test_silent_client_does_not_block_others_and_is_aborted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "hi").unwrap();
    let mut cfg = Config::default();
    cfg.server.shutdown_grace_ms = 50;
    let server = TestServer::start(dir.path(), cfg).await;

    // Connects and never sends a request.
    let _silent = TcpStream::connect(server.addr).await.unwrap();

    let response = server.get(b"GET / HTTP/1.1\r\n\r\n").await;
    assert!(response.ends_with(b"\r\n\r\nhi"));

    let summary = tokio::time::timeout(Duration::from_secs(5), server.stop())
        .await
        .unwrap();
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.aborted, 1);
}

#[tokio::test]
async fn test_client_hanging_up_mid_transfer_is_contained() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("big.bin"), filler(8 * 1024 * 1024, 0)).unwrap();
    std::fs::write(dir.path().join("small.txt"), "still here").unwrap();
    let server = TestServer::start(dir.path(), Config::default()).await;

    {
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.write_all(b"GET /big.bin HTTP/1.1\r\n\r\n").await.unwrap();
        let mut first = [0u8; 64];
        let _ = stream.read(&mut first).await.unwrap();
    }

    let response = server.get(b"GET /small.txt HTTP/1.1\r\n\r\n").await;
    assert!(response.ends_with(b"still here"));

    let summary = server.stop().await;
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.completed + summary.failed, 2);
    assert_eq!(summary.aborted, 0);
}
