#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status_code: u16,
    pub body: String,
}

impl MockResponse {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    pub fn status(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn json_body(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body should be json")
    }
}

/// Blocking HTTP/1.1 server replaying queued responses, one connection each.
pub struct MockHttpServer {
    addr: SocketAddr,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockHttpServer {
    pub fn start(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");

        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
        let captured = Arc::new(Mutex::new(Vec::new()));
        let captured_clone = Arc::clone(&captured);

        let handle = thread::spawn(move || {
            loop {
                let next_response = queue.lock().expect("queue lock").pop_front();
                let Some(response) = next_response else {
                    break;
                };

                let (mut stream, _) = listener.accept().expect("accept connection");
                stream
                    .set_read_timeout(Some(Duration::from_secs(3)))
                    .expect("set stream timeout");

                let raw = read_http_request_with_body(&mut stream);
                captured_clone
                    .lock()
                    .expect("capture lock")
                    .push(parse_request(&raw));

                stream
                    .write_all(build_http_response(&response).as_bytes())
                    .expect("write response");
                stream.flush().expect("flush response");
            }
        });

        Self {
            addr,
            captured,
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.captured.lock().expect("capture lock").clone()
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join mock server");
        }
    }
}

impl Drop for MockHttpServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn success_envelope(data: serde_json::Value) -> MockResponse {
    MockResponse::json(serde_json::json!({ "success": true, "data": data }).to_string())
}

fn read_http_request_with_body(stream: &mut std::net::TcpStream) -> String {
    let mut request = Vec::new();
    let mut chunk = [0_u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(bytes_read) => {
                request.extend_from_slice(&chunk[..bytes_read]);

                if let Some(header_end) =
                    request.windows(4).position(|window| window == b"\r\n\r\n")
                {
                    let headers = String::from_utf8_lossy(&request[..header_end]).to_string();
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            if name.eq_ignore_ascii_case("content-length") {
                                value.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            Err(error)
                if error.kind() == std::io::ErrorKind::WouldBlock
                    || error.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(error) => panic!("failed reading request: {error}"),
        }
    }

    String::from_utf8_lossy(&request).to_string()
}

fn parse_request(raw_request: &str) -> CapturedRequest {
    let (head, body) = raw_request
        .split_once("\r\n\r\n")
        .unwrap_or((raw_request, ""));
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect();

    CapturedRequest {
        method,
        path,
        headers,
        body: body.to_string(),
    }
}

fn build_http_response(response: &MockResponse) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status_code,
        status_reason(response.status_code),
        response.body.len(),
        response.body,
    )
}

fn status_reason(status_code: u16) -> &'static str {
    match status_code {
        200 => "OK",
        400 => "Bad Request",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

pub enum WsAction {
    Send(String),
    Close,
}

/// WebSocket server serving one connection at a time; a new client replaces the
/// current one. Every text frame received is forwarded to `received`, tagged
/// with the connection index.
pub struct MockWsServer {
    addr: SocketAddr,
    actions: mpsc::UnboundedSender<WsAction>,
    received: mpsc::UnboundedReceiver<(usize, String)>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let (actions_tx, mut actions_rx) = mpsc::unbounded_channel::<WsAction>();
        let (received_tx, received_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut connection_index = 0usize;
            let mut pending = listener.accept().await.ok().map(|(stream, _)| stream);

            while let Some(stream) = pending.take() {
                if let Ok(ws_stream) = accept_async(stream).await {
                    let (mut write, mut read) = ws_stream.split();

                    loop {
                        tokio::select! {
                            // A newer client takes over; the old session is dropped.
                            incoming = listener.accept() => {
                                if let Ok((stream, _)) = incoming {
                                    pending = Some(stream);
                                    break;
                                }
                            }
                            action = actions_rx.recv() => match action {
                                Some(WsAction::Send(text)) => {
                                    if write.send(Message::Text(text)).await.is_err() {
                                        break;
                                    }
                                }
                                Some(WsAction::Close) => {
                                    let _ = write.send(Message::Close(None)).await;
                                    break;
                                }
                                None => return,
                            },
                            frame = read.next() => match frame {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = received_tx.send((connection_index, text));
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                        }
                    }

                    connection_index += 1;
                }

                if pending.is_none() {
                    pending = listener.accept().await.ok().map(|(stream, _)| stream);
                }
            }
        });

        Self {
            addr,
            actions: actions_tx,
            received: received_rx,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn push(&self, text: impl Into<String>) {
        self.actions
            .send(WsAction::Send(text.into()))
            .expect("ws server task alive");
    }

    pub fn close_current(&self) {
        self.actions
            .send(WsAction::Close)
            .expect("ws server task alive");
    }

    pub async fn next_received(&mut self) -> (usize, serde_json::Value) {
        let (index, text) = tokio::time::timeout(Duration::from_secs(3), self.received.recv())
            .await
            .expect("server should receive a frame")
            .expect("ws server channel open");
        let value = serde_json::from_str(&text).expect("frame should be json");
        (index, value)
    }
}
