#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cardstudy_lib::storage::{MemoryStorage, Storage};
use cardstudy_lib::transport::{Attempt, RawResponse, Transport};
use cardstudy_lib::{ApiClient, Error, Origin, Origins, Result};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const LOCAL: &str = "http://local.test:5000";
pub const PROD: &str = "https://prod.test";

/// What a fake origin does with the next attempt.
pub enum Reply {
    Json(u16, Value),
    Text(u16, String),
    /// Transport-level failure: nothing answered.
    Refused,
    /// Never answers; only a deadline ends the attempt.
    Hang,
}

/// In-process transport with a reply queue per origin. Unscripted attempts are refused.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<Origin, VecDeque<Reply>>>,
    attempts: Mutex<Vec<Attempt>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, origin: Origin, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(origin)
            .or_default()
            .push_back(reply);
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempted_origins(&self) -> Vec<Origin> {
        self.attempts().iter().map(|a| a.origin).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, attempt: Attempt) -> Result<RawResponse> {
        self.attempts.lock().unwrap().push(attempt.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&attempt.origin)
            .and_then(|q| q.pop_front())
            .unwrap_or(Reply::Refused);
        let status = |code: u16| StatusCode::from_u16(code).unwrap();
        match reply {
            Reply::Json(code, v) => Ok(RawResponse::buffered(
                attempt.origin,
                status(code),
                attempt.url,
                v.to_string(),
            )),
            Reply::Text(code, s) => Ok(RawResponse::buffered(attempt.origin, status(code), attempt.url, s)),
            Reply::Refused => Err(Error::Transport {
                message: format!("connection refused: {}", attempt.url),
                no_response: true,
            }),
            Reply::Hang => std::future::pending::<Result<RawResponse>>().await,
        }
    }
}

pub struct Harness {
    pub api: ApiClient,
    pub transport: Arc<ScriptedTransport>,
    pub session: Arc<dyn Storage>,
    pub durable: Arc<dyn Storage>,
}

impl Harness {
    pub fn new() -> Self {
        let transport = ScriptedTransport::new();
        let session: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let durable: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let api = ApiClient::new(
            Origins::new(LOCAL, PROD),
            session.clone(),
            durable.clone(),
            transport.clone(),
        );
        Harness {
            api,
            transport,
            session,
            durable,
        }
    }
}

// --- Loopback HTTP server for tests that go through reqwest ---

pub enum ServerReply {
    Json(u16, Value),
    /// Accepts and reads the request, then never writes.
    Silent,
    /// Sends a 200 head and part of the promised body, then stops writing.
    StalledBody,
}

impl ServerReply {
    fn into_http_string(self) -> Option<String> {
        match self {
            ServerReply::Json(code, v) => {
                let body = v.to_string();
                Some(format!(
                    "HTTP/1.1 {} Scripted\r\n\
                     Content-Type: application/json\r\n\
                     Connection: close\r\n\
                     Content-Length: {}\r\n\r\n{}",
                    code,
                    body.len(),
                    body
                ))
            }
            ServerReply::Silent => None,
            ServerReply::StalledBody => Some(
                "HTTP/1.1 200 Scripted\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: 64\r\n\r\n{\"items\": ["
                    .to_string(),
            ),
        }
    }
}

pub struct ScriptedServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    /// Serves one scripted reply per incoming connection, in order.
    pub async fn start(script: Vec<ServerReply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        tokio::spawn(async move {
            for reply in script {
                let Ok((mut sock, _)) = listener.accept().await else {
                    return;
                };
                let req = read_request(&mut sock).await;
                recorded.lock().unwrap().push(req);
                let stalls = matches!(reply, ServerReply::StalledBody);
                match reply.into_http_string() {
                    Some(raw) => {
                        let _ = sock.write_all(raw.as_bytes()).await;
                        if stalls {
                            tokio::time::sleep(Duration::from_secs(30)).await;
                        }
                        let _ = sock.shutdown().await;
                    }
                    None => tokio::time::sleep(Duration::from_secs(30)).await,
                }
            }
        });
        ScriptedServer { url, requests }
    }

    /// Raw request texts seen so far, lowercased.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(sock: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match sock.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_lowercase()
}

/// A loopback URL nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn http_client(local: &str, prod: &str) -> ApiClient {
    let transport = cardstudy_lib::transport::ReqwestTransport::new().expect("http client");
    client_over(local, prod, transport)
}

pub fn client_over(local: &str, prod: &str, transport: impl Transport + 'static) -> ApiClient {
    ApiClient::new(
        Origins::new(local, prod),
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryStorage::new()),
        Arc::new(transport),
    )
}
