use crate::http::headers::Headers;
use crate::http::request::{Method, Request};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed request line")]
    InvalidRequest,
    #[error("unknown method")]
    InvalidMethod,
    #[error("unsupported protocol version")]
    InvalidVersion,
    #[error("malformed header line")]
    InvalidHeader,
    #[error("invalid Content-Length")]
    InvalidContentLength,
    #[error("malformed chunked body")]
    InvalidChunk,
    #[error("incomplete request")]
    Incomplete,
}

/// Parses one request from the front of `buf`.
///
/// Returns the request and the number of bytes it occupied, so bytes of a
/// following pipelined request stay in the caller's buffer.
/// `ParseError::Incomplete` means more bytes are needed.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    // Look for header/body separator
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let header_bytes = &buf[..headers_end];
    let body_start = headers_end + 4;

    let headers_str = std::str::from_utf8(header_bytes).map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;
    if parts.next().is_some() {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;
    if !version.starts_with("HTTP/1.") {
        return Err(ParseError::InvalidVersion);
    }

    let mut headers = Headers::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ParseError::InvalidHeader);
        }

        headers.add(key, value.trim());
    }

    let mut request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: Vec::new(),
    };

    // Body: chunked wins over Content-Length
    if request.is_chunked() {
        let (body, consumed) = decode_chunked(&buf[body_start..])?;
        request.body = body;
        return Ok((request, body_start + consumed));
    }

    let content_length = declared_content_length(&request.headers)?;
    let body_bytes = &buf[body_start..];

    if body_bytes.len() < content_length {
        return Err(ParseError::Incomplete);
    }

    request.body = body_bytes[..content_length].to_vec();

    Ok((request, body_start + content_length))
}

/// Decodes a chunked body from the front of `buf`.
///
/// Returns the reassembled payload and the number of bytes consumed, including
/// the terminating zero-size chunk and any trailer lines. Chunk extensions are
/// ignored.
pub fn decode_chunked(buf: &[u8]) -> Result<(Vec<u8>, usize), ParseError> {
    let mut body = Vec::new();
    let mut pos = 0;

    loop {
        let line_end = find_crlf(buf, pos).ok_or(ParseError::Incomplete)?;
        let size = parse_chunk_size(&buf[pos..line_end])?;
        pos = line_end + 2;

        if size == 0 {
            // Trailer section ends with an empty line
            loop {
                let trailer_end = find_crlf(buf, pos).ok_or(ParseError::Incomplete)?;
                let empty = trailer_end == pos;
                pos = trailer_end + 2;
                if empty {
                    return Ok((body, pos));
                }
            }
        }

        let data_end = pos.checked_add(size).ok_or(ParseError::InvalidChunk)?;
        let frame_end = data_end.checked_add(2).ok_or(ParseError::InvalidChunk)?;
        if buf.len() < frame_end {
            return Err(ParseError::Incomplete);
        }
        if &buf[data_end..frame_end] != b"\r\n" {
            return Err(ParseError::InvalidChunk);
        }

        body.extend_from_slice(&buf[pos..data_end]);
        pos = frame_end;
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidChunk)?;
    let digits = line.split(';').next().unwrap_or("").trim();
    if digits.is_empty() {
        return Err(ParseError::InvalidChunk);
    }
    usize::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidChunk)
}

fn declared_content_length(headers: &Headers) -> Result<usize, ParseError> {
    let mut declared: Option<usize> = None;

    for value in headers.get_all("Content-Length") {
        let n = value
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength)?;
        // Repeated values must agree
        if declared.is_some_and(|d| d != n) {
            return Err(ParseError::InvalidContentLength);
        }
        declared = Some(n);
    }

    Ok(declared.unwrap_or(0))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn find_crlf(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| p + from)
}
