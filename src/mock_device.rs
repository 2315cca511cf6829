//! In-process stand-ins for the camera device, used by tests.
//!
//! `MockCamera` speaks the camera socket protocol; `MockHttp` answers HTTP
//! requests from a script and records what it received.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

pub struct MockCamera {
    addr: SocketAddr,
    captures: Arc<AtomicUsize>,
}

impl MockCamera {
    /// Answer every capture command with a frame of `frame_size` bytes
    pub async fn start(frame_size: usize) -> Self {
        Self::spawn(frame_size, None).await
    }

    /// Like `start`, but the device closes the socket after `frames` frames
    pub async fn closing_after(frame_size: usize, frames: usize) -> Self {
        Self::spawn(frame_size, Some(frames)).await
    }

    async fn spawn(frame_size: usize, close_after: Option<usize>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captures = Arc::new(AtomicUsize::new(0));

        let counter = captures.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_camera(stream, frame_size, close_after, counter.clone()));
            }
        });

        Self { addr, captures }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws/camera", self.addr)
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

async fn serve_camera(
    stream: TcpStream,
    frame_size: usize,
    close_after: Option<usize>,
    captures: Arc<AtomicUsize>,
) {
    let Ok(ws_stream) = accept_async(stream).await else {
        return;
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let welcome = r#"{"type":"welcome","message":"Connected to camera stream"}"#;
    if ws_sender.send(WsMessage::Text(welcome.to_string())).await.is_err() {
        return;
    }

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                let value: serde_json::Value = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(_) => continue,
                };
                let reply = match value["command"].as_str() {
                    Some("capture") => {
                        let n = captures.fetch_add(1, Ordering::SeqCst);
                        WsMessage::Binary(vec![(n % 251) as u8; frame_size])
                    }
                    Some("ping") => WsMessage::Text(r#"{"type":"pong","timestamp":42}"#.to_string()),
                    _ => continue,
                };
                if ws_sender.send(reply).await.is_err() {
                    break;
                }
                if close_after.is_some_and(|limit| captures.load(Ordering::SeqCst) >= limit) {
                    let _ = ws_sender.send(WsMessage::Close(None)).await;
                    // Let the client finish the closing handshake
                    while let Some(Ok(_)) = ws_receiver.next().await {}
                    break;
                }
            }
            Ok(WsMessage::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn jpeg(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "image/jpeg",
            body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

pub struct MockHttp {
    addr: SocketAddr,
    requests: Mutex<mpsc::UnboundedReceiver<RecordedRequest>>,
}

impl MockHttp {
    /// Serve `script` one response per connection, in order; 404 once it runs out
    pub async fn start(script: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (req_tx, req_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut script = script.into_iter();
            while let Ok((stream, _)) = listener.accept().await {
                let response = script
                    .next()
                    .unwrap_or_else(|| MockResponse::json(404, r#"{"success":false,"message":"not found"}"#));
                serve_http(stream, response, req_tx.clone()).await;
            }
        });

        Self {
            addr,
            requests: Mutex::new(req_rx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn next_request(&self) -> RecordedRequest {
        self.requests.lock().await.recv().await.unwrap()
    }
}

async fn serve_http(
    mut stream: TcpStream,
    response: MockResponse,
    requests: mpsc::UnboundedSender<RecordedRequest>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    let _ = requests.send(RecordedRequest {
        method,
        path,
        headers,
        body,
    });

    let head = format!(
        "HTTP/1.1 {} MOCK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(&response.body).await;
    let _ = stream.shutdown().await;
}
