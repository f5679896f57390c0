#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pipeliner::config::Config;
use pipeliner::http::handler::Handler;
use pipeliner::server::listener::serve;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::OwnedReadHalf;

/// A response as seen by a client.
#[derive(Debug)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Chunk payloads, in order, when the body was chunked.
    pub chunks: Vec<Vec<u8>>,
}

impl ClientResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn test_config() -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        read_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

pub async fn start_server<H: Handler>(cfg: Config, handler: H) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        let _ = serve(listener, &cfg, handler).await;
    });

    addr
}

pub fn get(path: &str) -> String {
    format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path)
}

pub fn head(path: &str) -> String {
    format!("HEAD {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path)
}

/// Reads one response; `None` if the server closed the connection first.
pub async fn read_response(reader: &mut BufReader<OwnedReadHalf>) -> Option<ClientResponse> {
    let mut response = read_head(reader).await?;

    if response
        .header("Transfer-Encoding")
        .is_some_and(|v| v.contains("chunked"))
    {
        loop {
            let mut size_line = String::new();
            reader.read_line(&mut size_line).await.ok()?;
            let size = usize::from_str_radix(size_line.trim(), 16).ok()?;
            let mut chunk = vec![0u8; size + 2];
            if size == 0 {
                reader.read_exact(&mut chunk).await.ok()?;
                break;
            }
            reader.read_exact(&mut chunk).await.ok()?;
            chunk.truncate(size);
            response.body.extend_from_slice(&chunk);
            response.chunks.push(chunk);
        }
    } else {
        let length: usize = response.header("Content-Length")?.parse().ok()?;
        let mut body = vec![0u8; length];
        reader.read_exact(&mut body).await.ok()?;
        response.body = body;
    }

    Some(response)
}

/// Reads the status line and headers only, as for a reply to HEAD.
pub async fn read_head(reader: &mut BufReader<OwnedReadHalf>) -> Option<ClientResponse> {
    let mut status_line = String::new();
    if reader.read_line(&mut status_line).await.ok()? == 0 {
        return None;
    }
    let status = status_line.split_whitespace().nth(1)?.parse().ok()?;

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let (k, v) = line.split_once(':')?;
        headers.push((k.trim().to_string(), v.trim().to_string()));
    }

    Some(ClientResponse {
        status,
        headers,
        body: Vec::new(),
        chunks: Vec::new(),
    })
}

/// Reads until the server closes, returning any bytes that arrived.
pub async fn read_to_close(reader: &mut BufReader<OwnedReadHalf>) -> Vec<u8> {
    let mut rest = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), reader.read_to_end(&mut rest)).await;
    rest
}
