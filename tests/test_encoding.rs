use std::io::Read;

use flate2::read::GzDecoder;
use pipeliner::http::encoding::{accepts_gzip, gzip, negotiate};
use pipeliner::http::parser::decode_chunked;
use pipeliner::http::request::{Method, RequestBuilder};
use pipeliner::http::response::{Response, ResponseBuilder, StatusCode};
use pipeliner::http::writer::write_response;

fn gunzip(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
    out
}

#[test]
fn test_accepts_gzip_joins_every_value() {
    let plain = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();
    let split = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Accept-Encoding", "deflate")
        .header("Accept-Encoding", "x-gzip")
        .build()
        .unwrap();
    let identity = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Accept-Encoding", "identity, br")
        .build()
        .unwrap();

    assert!(!accepts_gzip(&plain));
    assert!(accepts_gzip(&split));
    assert!(!accepts_gzip(&identity));
}

#[test]
fn test_negotiate_compresses_whole_body() {
    let response = negotiate(true, Response::text("Hello World\n")).unwrap();

    let body = response.body.as_bytes().unwrap().to_vec();
    assert_eq!(response.headers.get("Content-Encoding"), Some("gzip"));
    assert_eq!(response.content_length(), Some(body.len()));
    assert_eq!(gunzip(&body), b"Hello World\n".to_vec());
}

#[test]
fn test_negotiate_leaves_plain_body_alone_without_gzip() {
    let response = negotiate(false, Response::text("Hello World\n")).unwrap();

    assert_eq!(response.headers.get("Content-Encoding"), None);
    assert_eq!(response.body.as_bytes(), Some(&b"Hello World\n"[..]));
}

#[test]
fn test_negotiate_skips_chunked_and_encoded_bodies() {
    let chunked = negotiate(
        true,
        ResponseBuilder::new(StatusCode::Ok).chunked(vec!["a"]).build(),
    )
    .unwrap();
    assert!(chunked.body.is_chunked());
    assert_eq!(chunked.headers.get("Content-Encoding"), None);

    let already = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Encoding", "br")
        .body(b"opaque".to_vec())
        .build();
    let already = negotiate(true, already).unwrap();
    assert_eq!(already.body.as_bytes(), Some(&b"opaque"[..]));
}

#[test]
fn test_gzip_empty_body_round_trips() {
    assert!(gunzip(&gzip(b"").unwrap()).is_empty());
}

#[tokio::test]
async fn test_chunked_response_decodes_to_original_fragments() {
    let fragments = vec![
        "first line\n".to_string(),
        "x".repeat(300),
        "ünïcödé\n".to_string(),
    ];
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .chunked(fragments.clone())
        .build();

    let mut wire = Vec::new();
    write_response(&mut wire, response).await.unwrap();

    let head_end = wire.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    let head = String::from_utf8_lossy(&wire[..head_end]);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Transfer-Encoding: chunked\r\n"));
    assert!(!head.contains("Content-Length"));
    assert!(wire.ends_with(b"0\r\n\r\n"));

    let body = &wire[head_end..];
    let mut rest = body;
    for fragment in &fragments {
        let line_end = rest.windows(2).position(|w| w == b"\r\n").unwrap();
        let size_hex = std::str::from_utf8(&rest[..line_end]).unwrap();
        let size = usize::from_str_radix(size_hex, 16).unwrap();
        assert_eq!(&rest[line_end + 2..line_end + 2 + size], fragment.as_bytes());
        rest = &rest[line_end + 2 + size + 2..];
    }
    assert_eq!(rest, b"0\r\n\r\n");

    let (decoded, consumed) = decode_chunked(body).unwrap();
    assert_eq!(decoded, fragments.concat().into_bytes());
    assert_eq!(consumed, body.len());
}

#[tokio::test]
async fn test_chunked_stream_writes_fragments_as_produced() {
    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let response = ResponseBuilder::new(StatusCode::Ok).chunked_stream(rx).build();

    let producer = tokio::spawn(async move {
        for part in ["alpha", "beta"] {
            tx.send(part.as_bytes().to_vec()).await.unwrap();
        }
    });

    let mut wire = Vec::new();
    write_response(&mut wire, response).await.unwrap();
    producer.await.unwrap();

    assert!(wire.ends_with(b"5\r\nalpha\r\n4\r\nbeta\r\n0\r\n\r\n"));
}
