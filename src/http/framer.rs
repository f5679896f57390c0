//! Turns the read half of a connection into a sequence of requests.
//!
//! The reader keeps whatever bytes follow a parsed request, so several
//! pipelined requests arriving in one segment are handed out one at a time.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::Request;

/// Upper bound on a single buffered request (head plus body).
pub const MAX_REQUEST_SIZE: usize = 64 * 1024;

const INITIAL_BUFFER_SIZE: usize = 4096;
const READ_RESERVE: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Peer closed the stream between requests.
    #[error("end of stream")]
    EndOfStream,

    /// No request completed before the read deadline.
    #[error("read timed out")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// Peer closed the stream in the middle of a request.
    #[error("stream closed mid-request")]
    UnexpectedEof,

    #[error("request exceeds {MAX_REQUEST_SIZE} bytes")]
    TooLarge,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Timeouts and clean closes end a session without being faults.
    pub fn is_graceful(&self) -> bool {
        matches!(self, FrameError::EndOfStream | FrameError::Timeout)
    }
}

pub struct RequestReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
        }
    }

    /// Reads the next request.
    ///
    /// `deadline` bounds every individual socket read, so a slow but steady
    /// client is never cut off mid-request while an idle one is.
    pub async fn read_request(&mut self, deadline: Duration) -> Result<Request, FrameError> {
        loop {
            if !self.buffer.is_empty() {
                match parse_http_request(&self.buffer) {
                    Ok((request, consumed)) => {
                        self.buffer.advance(consumed);
                        return Ok(request);
                    }
                    Err(ParseError::Incomplete) => {}
                    Err(e) => return Err(FrameError::Protocol(e)),
                }
            }

            if self.buffer.len() >= MAX_REQUEST_SIZE {
                return Err(FrameError::TooLarge);
            }

            self.buffer.reserve(READ_RESERVE);
            let n = match timeout(deadline, self.reader.read_buf(&mut self.buffer)).await {
                Ok(result) => result?,
                Err(_) => return Err(FrameError::Timeout),
            };

            if n == 0 {
                return Err(if self.buffer.is_empty() {
                    FrameError::EndOfStream
                } else {
                    FrameError::UnexpectedEof
                });
            }
        }
    }

    /// Bytes received but not yet consumed by a parsed request.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
