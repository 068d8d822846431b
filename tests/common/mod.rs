//! Shared utilities for relay integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use api_relay::config::{ProxyConfig, UpstreamConfig};
use api_relay::lifecycle::InFlight;
use api_relay::{HttpServer, Recorder, Shutdown};

/// What a mock backend answers with.
#[derive(Clone)]
pub enum Reply {
    /// A complete response with `Content-Length`.
    Fixed {
        status: u16,
        content_type: &'static str,
        body: Vec<u8>,
    },
    /// A chunked `text/event-stream` response, one write per chunk.
    EventStream { chunks: Vec<Vec<u8>>, gap: Duration },
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Reply::Fixed {
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }
}

/// A request as the backend saw it on the wire.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// All values of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
            .collect()
    }
}

/// Start a mock backend on an ephemeral port. Every request it receives is
/// sent to the returned channel.
pub async fn start_backend(reply: Reply) -> (SocketAddr, mpsc::UnboundedReceiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let tx = tx.clone();
            let reply = reply.clone();
            tokio::spawn(async move {
                let _ = serve_one(socket, reply, tx).await;
            });
        }
    });

    (addr, rx)
}

async fn serve_one(
    mut socket: TcpStream,
    reply: Reply,
    tx: mpsc::UnboundedSender<CapturedRequest>,
) -> std::io::Result<()> {
    let captured = read_request(&mut socket).await?;
    let _ = tx.send(captured);

    match reply {
        Reply::Fixed {
            status,
            content_type,
            body,
        } => {
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nX-Backend: mock\r\nConnection: close\r\n\r\n",
                status,
                reason(status),
                content_type,
                body.len()
            );
            socket.write_all(head.as_bytes()).await?;
            socket.write_all(&body).await?;
        }
        Reply::EventStream { chunks, gap } => {
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n";
            socket.write_all(head.as_bytes()).await?;
            socket.flush().await?;
            for chunk in chunks {
                let mut frame = format!("{:x}\r\n", chunk.len()).into_bytes();
                frame.extend_from_slice(&chunk);
                frame.extend_from_slice(b"\r\n");
                socket.write_all(&frame).await?;
                socket.flush().await?;
                tokio::time::sleep(gap).await;
            }
            socket.write_all(b"0\r\n\r\n").await?;
        }
    }

    socket.flush().await?;
    socket.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(CapturedRequest {
        request_line,
        headers,
        body,
    })
}

/// A relay running on an ephemeral port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub log_path: PathBuf,
    pub in_flight: InFlight,
    pub shutdown: Shutdown,
    pub recorder: Arc<Recorder>,
    pub handle: JoinHandle<()>,
}

impl TestRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn records(&self) -> Vec<String> {
        read_records(&self.log_path)
    }

    /// Stop accepting, wait for the server and in-flight relays, close sinks.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
        self.in_flight.drain(Duration::from_secs(5)).await;
        self.recorder.close();
    }
}

static LOG_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Unique traffic log path for one test relay.
pub fn temp_log_path(name: &str) -> PathBuf {
    let n = LOG_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "api-relay-test-{}-{}-{}.log",
        std::process::id(),
        name,
        n
    ));
    let _ = std::fs::remove_file(&path);
    path
}

/// Start a relay in front of `upstream` (paths are prefixed with `/v1`),
/// recording to a fresh temp file. `tweak` adjusts the config before start.
pub async fn start_relay(
    upstream: SocketAddr,
    name: &str,
    tweak: impl FnOnce(&mut ProxyConfig),
) -> TestRelay {
    let log_path = temp_log_path(name);

    let mut config = ProxyConfig::default();
    config.upstream = UpstreamConfig::new(format!("http://{}/v1/", upstream), None);
    config.upstream.use_system_proxy = false;
    config.logging.log_to_stdout = false;
    config.logging.log_file = Some(log_path.clone());
    tweak(&mut config);

    let recorder = Arc::new(Recorder::open(&config.logging).unwrap());
    let server = HttpServer::new(config, Arc::clone(&recorder)).unwrap();
    let in_flight = server.in_flight();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestRelay {
        addr,
        log_path,
        in_flight,
        shutdown,
        recorder,
        handle,
    }
}

/// Test client that never goes through an environment proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Split a traffic log into records.
pub fn read_records(path: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    let mut records = Vec::new();
    for line in content.split_inclusive('\n') {
        if line.starts_with("==== REQUEST [") || line.starts_with("==== RESPONSE [") {
            records.push(String::new());
        }
        if let Some(current) = records.last_mut() {
            current.push_str(line);
        }
    }
    records
}

/// Response records only.
pub fn response_records(records: &[String]) -> Vec<&String> {
    records
        .iter()
        .filter(|r| r.starts_with("==== RESPONSE ["))
        .collect()
}

/// Correlation id of a record: the text between the first `[` and `]`.
pub fn record_id(record: &str) -> &str {
    let start = record.find('[').map(|i| i + 1).unwrap_or(0);
    let end = record[start..].find(']').map(|i| start + i).unwrap_or(start);
    &record[start..end]
}

/// Poll the traffic log until it holds at least `n` records.
pub async fn wait_for_records(relay: &TestRelay, n: usize) -> Vec<String> {
    for _ in 0..50 {
        let records = relay.records();
        if records.len() >= n {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    relay.records()
}
