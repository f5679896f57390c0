//! Pipeliner - keep-alive HTTP/1.1 server with ordered pipelining
//!
//! Core library: request framing, response encoding, sessions and the
//! ordered response queue.

pub mod config;
pub mod http;
pub mod server;
