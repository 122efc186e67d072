use std::time::Duration;

use axum::response::Response;
use bytes::Bytes;
use http_body_util::BodyExt;
use uuid::Uuid;

/// A tiny but well-formed PNG signature
pub fn png_bytes() -> Bytes {
    Bytes::from_static(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR")
}

/// A JPEG start-of-image marker
pub fn jpeg_bytes() -> Bytes {
    Bytes::from_static(b"\xff\xd8\xff\xe0\0\x10JFIF")
}

/// Parse response body to JSON
pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Builds a single-field multipart body, returning the boundary and the encoded body
pub fn multipart_body(
    field: &str,
    file_name: &str,
    content_type: &str,
    data: &[u8],
) -> (String, Vec<u8>) {
    let boundary = format!("gallery-test-{}", Uuid::new_v4().simple());

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (boundary, body)
}

/// Asserts `key` is a v4 UUID followed by `.{extension}`
pub fn assert_generated_key(key: &str, extension: &str) {
    let (uuid, ext) = key
        .split_once('.')
        .unwrap_or_else(|| panic!("key without extension separator: {key}"));
    let uuid = Uuid::parse_str(uuid).unwrap_or_else(|_| panic!("key is not a UUID: {key}"));
    assert_eq!(uuid.get_version_num(), 4);
    assert_eq!(ext, extension);
}

/// Polls `condition` until it holds, panicking after one second
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
