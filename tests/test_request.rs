use pipeliner::http::request::{Method, RequestBuilder};

#[test]
fn test_request_header_lookup_ignores_case() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Host", "example.com")
        .header("Content-Type", "application/json")
        .build()
        .unwrap();

    assert_eq!(req.header("host"), Some("example.com"));
    assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_repeated_headers_keep_receipt_order() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .path("/")
        .header("Accept-Encoding", "br")
        .header("accept-encoding", "gzip")
        .build()
        .unwrap();

    assert_eq!(req.header_values("Accept-Encoding"), vec!["br", "gzip"]);
    assert_eq!(req.header("Accept-Encoding"), Some("br"));
}

#[test]
fn test_request_content_length_parsing() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .path("/api")
        .header("Content-Length", "42")
        .build()
        .unwrap();

    assert_eq!(req.content_length(), 42);
}

#[test]
fn test_request_content_length_missing_or_invalid() {
    let missing = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();
    let invalid = RequestBuilder::new()
        .method(Method::POST)
        .path("/")
        .header("Content-Length", "not-a-number")
        .build()
        .unwrap();

    assert_eq!(missing.content_length(), 0);
    assert_eq!(invalid.content_length(), 0);
}

#[test]
fn test_request_chunked_detection() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .path("/")
        .header("Transfer-Encoding", "gzip, Chunked")
        .build()
        .unwrap();

    assert!(req.is_chunked());
}

#[test]
fn test_request_builder_defaults_version() {
    let req = RequestBuilder::new().method(Method::GET).path("/").build().unwrap();

    assert_eq!(req.version, "HTTP/1.1");
    assert!(req.body.is_empty());
}

#[test]
fn test_request_builder_requires_method_and_path() {
    assert!(RequestBuilder::new().path("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}

#[test]
fn test_request_method_from_string() {
    assert_eq!(Method::from_str("GET"), Some(Method::GET));
    assert_eq!(Method::from_str("POST"), Some(Method::POST));
    assert_eq!(Method::from_str("INVALID"), None);
    assert_eq!(Method::from_str("get"), None); // Case-sensitive
    assert_eq!(Method::PATCH.as_str(), "PATCH");
}
