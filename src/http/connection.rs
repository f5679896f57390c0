use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, trace, warn};

use crate::http::encoding::{accepts_gzip, negotiate};
use crate::http::framer::{FrameError, RequestReader};
use crate::http::handler::Handler;
use crate::http::pipeline::{ResponseQueue, SlotDrain};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::writer::{ResponseWriter, write_response};

/// Idle time allowed before each read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// How a session schedules request handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Read, handle and write one request at a time.
    Sequential,
    /// Keep reading while earlier requests are handled; write in request order.
    #[default]
    Pipelined,
}

impl SessionMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sequential" => Some(SessionMode::Sequential),
            "pipelined" => Some(SessionMode::Pipelined),
            _ => None,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Sequential => f.write_str("sequential"),
            SessionMode::Pipelined => f.write_str("pipelined"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("{0}")]
    Frame(#[from] FrameError),

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("writer task failed: {0}")]
    Writer(#[from] tokio::task::JoinError),
}

enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter),
}

/// One accepted connection.
///
/// The session owns the stream until it returns; the write side is shut down
/// exactly once on the way out, whatever the reason for leaving.
pub struct Connection<S> {
    stream: S,
    peer: String,
    read_timeout: Duration,
    pipeline_depth: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        Self {
            stream,
            peer: peer.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            pipeline_depth: crate::http::pipeline::DEFAULT_PIPELINE_DEPTH,
        }
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn pipeline_depth(mut self, depth: usize) -> Self {
        self.pipeline_depth = depth;
        self
    }

    pub async fn run<H: Handler>(
        self,
        mode: SessionMode,
        handler: Arc<H>,
    ) -> Result<(), ConnectionError> {
        debug!(peer = %self.peer, %mode, "Session started");
        match mode {
            SessionMode::Sequential => self.run_sequential(handler).await,
            SessionMode::Pipelined => self.run_pipelined(handler).await,
        }
    }

    /// Handles requests one at a time: read, respond, write, repeat.
    ///
    /// Only one response is ever in flight, so ordering needs no help.
    pub async fn run_sequential<H: Handler>(self, handler: Arc<H>) -> Result<(), ConnectionError> {
        let (read_half, mut write_half) = tokio::io::split(self.stream);
        let mut reader = RequestReader::new(read_half);
        let mut state = ConnectionState::Reading;

        let result = loop {
            state = match state {
                ConnectionState::Reading => match reader.read_request(self.read_timeout).await {
                    Ok(request) => ConnectionState::Processing(request),
                    Err(e) if e.is_graceful() => {
                        log_end_of_input(&self.peer, &e);
                        break Ok(());
                    }
                    Err(e) => {
                        warn!(
                            peer = %self.peer,
                            error = %e,
                            "Closing connection after framing error"
                        );
                        if let Some(response) = rejection(&e) {
                            // Best effort, the connection closes either way
                            let _ = write_response(&mut write_half, response).await;
                        }
                        break Err(ConnectionError::Frame(e));
                    }
                },

                ConnectionState::Processing(request) => {
                    trace!(
                        peer = %self.peer,
                        method = request.method.as_str(),
                        path = %request.path,
                        "Request"
                    );
                    let response = respond(handler.as_ref(), request, &self.peer).await;
                    ConnectionState::Writing(ResponseWriter::new(response))
                }

                ConnectionState::Writing(mut writer) => {
                    if let Err(e) = writer.write_to(&mut write_half).await {
                        break Err(ConnectionError::Write(e));
                    }
                    ConnectionState::Reading
                }
            };
        };

        close(write_half, &self.peer).await;
        result
    }

    /// Keeps reading while earlier requests are still being handled.
    ///
    /// Every request gets a slot in the response queue and its own task; a
    /// dedicated writer task owns the write half and empties the queue in
    /// order. Reading stops on timeout, EOF, a framing error, or once the
    /// writer has failed.
    pub async fn run_pipelined<H: Handler>(self, handler: Arc<H>) -> Result<(), ConnectionError> {
        let (read_half, write_half) = tokio::io::split(self.stream);
        let (mut pusher, drain) = ResponseQueue::bounded(self.pipeline_depth);
        let writer = tokio::spawn(write_loop(write_half, drain, self.peer.clone()));
        let mut reader = RequestReader::new(read_half);

        let read_result = loop {
            let next = tokio::select! {
                next = reader.read_request(self.read_timeout) => next,
                _ = pusher.closed() => break Ok(()),
            };

            match next {
                Ok(request) => {
                    // Waits here while the queue is full
                    let Ok(slot) = pusher.push().await else {
                        break Ok(());
                    };
                    trace!(
                        peer = %self.peer,
                        slot = slot.index(),
                        method = request.method.as_str(),
                        path = %request.path,
                        "Request"
                    );

                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        let result = produce(handler.as_ref(), request).await;
                        slot.resolve(result);
                    });
                }
                Err(e) if e.is_graceful() => {
                    log_end_of_input(&self.peer, &e);
                    break Ok(());
                }
                Err(e) => {
                    warn!(peer = %self.peer, error = %e, "Closing connection after framing error");
                    if let Some(response) = rejection(&e) {
                        // Queued behind every earlier response
                        if let Ok(slot) = pusher.push().await {
                            slot.resolve(Ok(response));
                        }
                    }
                    break Err(ConnectionError::Frame(e));
                }
            }
        };

        // No more pushes; the writer drains what is queued and exits
        drop(pusher);
        writer.await??;
        read_result
    }
}

async fn write_loop<W>(
    mut stream: W,
    mut drain: SlotDrain,
    peer: String,
) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    let mut result = Ok(());

    while let Some(slot) = drain.next().await {
        let index = slot.index();
        let (outcome, permit) = slot.into_parts();

        let response = outcome.unwrap_or_else(|e| {
            error!(peer = %peer, slot = index, error = %e, "Request failed");
            Response::internal_error()
        });

        if let Err(e) = write_response(&mut stream, response).await {
            debug!(
                peer = %peer,
                slot = index,
                error = %e,
                "Write failed, abandoning queued responses"
            );
            result = Err(ConnectionError::Write(e));
            break;
        }

        // Frees queue capacity only once the response is on the wire
        drop(permit);
        trace!(peer = %peer, slot = index, "Response written");
    }

    drop(drain);
    close(stream, &peer).await;
    result
}

/// Runs the handler, applies content-encoding negotiation and strips the
/// body of HEAD responses.
async fn produce<H: Handler>(handler: &H, request: Request) -> anyhow::Result<Response> {
    let accept_gzip = accepts_gzip(&request);
    let head_only = request.method == Method::HEAD;

    let response = negotiate(accept_gzip, handler.handle(request).await?)?;
    Ok(if head_only { response.into_head() } else { response })
}

async fn respond<H: Handler>(handler: &H, request: Request, peer: &str) -> Response {
    produce(handler, request).await.unwrap_or_else(|e| {
        error!(peer = %peer, error = %e, "Request failed");
        Response::internal_error()
    })
}

/// Response sent before closing on a framing failure, when one makes sense.
fn rejection(err: &FrameError) -> Option<Response> {
    let mut response = match err {
        FrameError::Protocol(_) => Response::bad_request(),
        FrameError::TooLarge => Response::payload_too_large(),
        _ => return None,
    };
    response.headers.set("Connection", "close");
    Some(response)
}

fn log_end_of_input(peer: &str, err: &FrameError) {
    match err {
        FrameError::Timeout => debug!(peer = %peer, "Read timed out, closing connection"),
        _ => debug!(peer = %peer, "Client closed connection"),
    }
}

async fn close<W: AsyncWrite + Unpin>(mut stream: W, peer: &str) {
    if let Err(e) = stream.shutdown().await {
        debug!(peer = %peer, error = %e, "Shutdown failed");
    }
    debug!(peer = %peer, "Connection closed");
}
