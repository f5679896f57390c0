//! gzip content-encoding negotiation.
//!
//! Bodies are compressed whole, in memory, before any header is written:
//! the compressed size has to be known up front for Content-Length.

use std::io::{self, Write};

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::http::request::Request;
use crate::http::response::{Body, Response};

/// True when any `Accept-Encoding` value mentions gzip.
///
/// All occurrences are joined with `,` and searched for the substring, so
/// `gzip;q=0` still counts. Quality values are not evaluated.
pub fn accepts_gzip(request: &Request) -> bool {
    request.header_values("Accept-Encoding").join(",").contains("gzip")
}

/// Compresses `bytes` into a complete gzip member.
pub fn gzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(bytes.len() / 2 + 32),
        Compression::default(),
    );
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Applies gzip to a full body when the client accepts it.
///
/// Chunked bodies and bodies that already carry a Content-Encoding are
/// returned untouched.
pub fn negotiate(accept_gzip: bool, mut response: Response) -> io::Result<Response> {
    if !accept_gzip || response.headers.contains("Content-Encoding") {
        return Ok(response);
    }

    if let Body::Full(plain) = &response.body {
        let compressed = gzip(plain)?;
        response.headers.set("Content-Encoding", "gzip");
        response.headers.set("Content-Length", compressed.len().to_string());
        response.body = Body::Full(compressed);
    }

    Ok(response)
}
