use tokio::sync::mpsc;

use crate::http::headers::Headers;

const HTTP_VERSION: &str = "HTTP/1.1";

/// HTTP status codes produced by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 413 Payload Too Large
    PayloadTooLarge,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// ```
    /// # use pipeliner::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Producer side of a chunked body.
///
/// Fragments are written to the wire as they arrive; the body ends when every
/// sender has been dropped.
#[derive(Debug)]
pub struct ChunkStream {
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl ChunkStream {
    pub fn new(receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { receiver }
    }

    /// A stream that yields exactly `fragments`, in order.
    pub fn from_fragments<I, T>(fragments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        let fragments: Vec<Vec<u8>> = fragments.into_iter().map(Into::into).collect();
        let (tx, rx) = mpsc::channel(fragments.len().max(1));
        for fragment in fragments {
            // Capacity covers every fragment
            let _ = tx.try_send(fragment);
        }
        Self::new(rx)
    }

    pub async fn next_fragment(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }
}

#[derive(Debug)]
pub enum Body {
    /// Body with a known length, framed by Content-Length.
    Full(Vec<u8>),
    /// Body framed with Transfer-Encoding: chunked.
    Chunked(ChunkStream),
}

impl Body {
    pub fn is_chunked(&self) -> bool {
        matches!(self, Body::Chunked(_))
    }

    /// Bytes of a full body; `None` for chunked bodies.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Full(bytes) => Some(bytes),
            Body::Chunked(_) => None,
        }
    }
}

/// An HTTP response, consumed exactly once by the writer.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Protocol version written on the status line
    pub version: String,
    /// HTTP headers in output order
    pub headers: Headers,
    pub body: Body,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Body,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::Full(Vec::new()),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(key, value);
        self
    }

    /// Sets a fixed-length body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Body::Full(body);
        self
    }

    /// Sets a chunked body made of the given fragments.
    pub fn chunked<I, T>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        self.body = Body::Chunked(ChunkStream::from_fragments(fragments));
        self
    }

    /// Sets a chunked body fed by a channel.
    pub fn chunked_stream(mut self, receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        self.body = Body::Chunked(ChunkStream::new(receiver));
        self
    }

    /// Builds the final Response.
    ///
    /// Full bodies always carry Content-Length, otherwise an HTTP/1.1 peer has
    /// to assume the connection closes after the body. Chunked bodies carry
    /// Transfer-Encoding instead and never a Content-Length.
    pub fn build(mut self) -> Response {
        match &self.body {
            Body::Full(bytes) => {
                if !self.headers.contains("Content-Length") {
                    self.headers.set("Content-Length", bytes.len().to_string());
                }
            }
            Body::Chunked(_) => {
                self.headers.remove("Content-Length");
                self.headers.set("Transfer-Encoding", "chunked");
            }
        }

        Response {
            status: self.status,
            version: HTTP_VERSION.to_string(),
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .body(body.into())
            .build()
    }

    /// Creates a 200 OK `text/plain` response.
    pub fn text(body: impl Into<String>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body.into().into_bytes())
            .build()
    }

    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .body(b"404 Not Found".to_vec())
            .build()
    }

    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .body(b"400 Bad Request".to_vec())
            .build()
    }

    pub fn payload_too_large() -> Self {
        ResponseBuilder::new(StatusCode::PayloadTooLarge)
            .body(b"413 Payload Too Large".to_vec())
            .build()
    }

    pub fn method_not_allowed() -> Self {
        ResponseBuilder::new(StatusCode::MethodNotAllowed)
            .header("Allow", "GET, HEAD")
            .body(b"405 Method Not Allowed".to_vec())
            .build()
    }

    pub fn internal_error() -> Self {
        ResponseBuilder::new(StatusCode::InternalServerError)
            .body(b"500 Internal Server Error".to_vec())
            .build()
    }

    /// Drops the body and keeps every header, including Content-Length or
    /// Transfer-Encoding, as the reply to a HEAD request.
    pub fn into_head(mut self) -> Self {
        self.body = Body::Full(Vec::new());
        self
    }

    /// Declared Content-Length, if any.
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .get("Content-Length")
            .and_then(|v| v.parse().ok())
    }
}
