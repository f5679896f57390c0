//! HTTP/1.1 protocol implementation.
//!
//! A small HTTP/1.1 server core with keep-alive, pipelining, gzip
//! content-encoding and chunked responses.
//!
//! # Architecture
//!
//! - **`headers`**: Case-insensitive, order-preserving header multimap
//! - **`request`**: HTTP request representation
//! - **`parser`**: Parses requests (and chunked bodies) from byte buffers
//! - **`framer`**: Reads requests off a stream under a sliding read deadline
//! - **`response`**: HTTP response representation with builder pattern
//! - **`encoding`**: gzip negotiation
//! - **`writer`**: Serializes responses, plain or chunked
//! - **`handler`**: The request handler seam
//! - **`pipeline`**: Ordered response queue for pipelined connections
//! - **`connection`**: Per-connection session, sequential or pipelined
//!
//! # Sequential sessions
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a request (deadline re-armed each read)
//!        └──────┬──────┘
//!               │ Request framed          timeout / EOF / bad request
//!               ▼                         ──────────────────────────▶ Closed
//!        ┌──────────────────┐
//!        │   Processing     │ ← Run handler, negotiate gzip
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               └─ back to Reading
//! ```
//!
//! # Pipelined sessions
//!
//! ```text
//!   socket ─▶ read loop ─push slot─▶ ResponseQueue ─oldest first─▶ writer task ─▶ socket
//!                 │                        ▲
//!                 └─spawn─▶ handler task ──┘ resolve slot
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pipeliner::http::connection::{Connection, SessionMode};
//! use pipeliner::http::handler::DemoHandler;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8888").await?;
//!     let handler = Arc::new(DemoHandler);
//!
//!     loop {
//!         let (socket, addr) = listener.accept().await?;
//!         let handler = Arc::clone(&handler);
//!         tokio::spawn(async move {
//!             let conn = Connection::new(socket, addr.to_string());
//!             if let Err(e) = conn.run(SessionMode::Pipelined, handler).await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod encoding;
pub mod framer;
pub mod handler;
pub mod headers;
pub mod parser;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod writer;
