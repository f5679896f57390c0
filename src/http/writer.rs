use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::{Body, ChunkStream, Response};

/// Serializes the status line, headers and the blank separator line.
pub fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);

    let status_line = format!(
        "{} {} {}\r\n",
        resp.version,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    for (k, v) in resp.headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf
}

/// Frames one fragment as `<hex-size>\r\n<bytes>\r\n`.
pub fn encode_chunk(fragment: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(fragment.len() + 12);
    buf.extend_from_slice(format!("{:x}\r\n", fragment.len()).as_bytes());
    buf.extend_from_slice(fragment);
    buf.extend_from_slice(b"\r\n");
    buf
}

/// Terminating zero-size chunk with an empty trailer section.
pub const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
    chunks: Option<ChunkStream>,
}

impl ResponseWriter {
    pub fn new(response: Response) -> Self {
        let mut buffer = serialize_head(&response);
        let chunks = match response.body {
            Body::Full(body) => {
                buffer.extend_from_slice(&body);
                None
            }
            Body::Chunked(stream) => Some(stream),
        };

        Self {
            buffer,
            written: 0,
            chunks,
        }
    }

    /// Writes the whole response, flushing after the head and after every
    /// chunk so fragments reach the peer as soon as they are produced.
    pub async fn write_to<W>(&mut self, stream: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while writing",
                ));
            }

            self.written += n;
        }
        stream.flush().await?;

        if let Some(chunks) = self.chunks.as_mut() {
            while let Some(fragment) = chunks.next_fragment().await {
                // A zero-size chunk would end the body early
                if fragment.is_empty() {
                    continue;
                }
                stream.write_all(&encode_chunk(&fragment)).await?;
                stream.flush().await?;
            }
            stream.write_all(LAST_CHUNK).await?;
            stream.flush().await?;
        }

        Ok(())
    }
}

/// Encodes and writes `response` to `stream`.
pub async fn write_response<W>(stream: &mut W, response: Response) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    ResponseWriter::new(response).write_to(stream).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::{ResponseBuilder, StatusCode};

    #[test]
    fn chunk_size_is_lowercase_hex() {
        assert_eq!(encode_chunk(&[b'a'; 26]), b"1a\r\naaaaaaaaaaaaaaaaaaaaaaaaaa\r\n".to_vec());
    }

    #[tokio::test]
    async fn plain_response_has_content_length() {
        let response = ResponseBuilder::new(StatusCode::Ok)
            .body(b"Hello World\n".to_vec())
            .build();
        let mut out = Vec::new();

        write_response(&mut out, response).await.unwrap();

        assert_eq!(
            out,
            b"HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\nHello World\n".to_vec()
        );
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped() {
        let response = ResponseBuilder::new(StatusCode::Ok)
            .chunked(vec!["ab", "", "c"])
            .build();
        let mut out = Vec::new();

        write_response(&mut out, response).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("\r\n\r\n2\r\nab\r\n1\r\nc\r\n0\r\n\r\n"));
        assert!(!text.contains("Content-Length"));
    }
}
