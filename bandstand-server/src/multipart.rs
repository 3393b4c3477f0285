use axum::{
    body::Body,
    http::header,
    response::Response,
};
use bandstand_core::random_string;

pub const AUDIO_CONTENT_TYPE: &str = "audio/x-m4a";

/// Builds the two-part audio download response: a JSON metadata part
/// followed by the raw audio bytes
pub fn audio_response(metadata_json: Vec<u8>, bytes: Vec<u8>) -> Response {
    let boundary = random_string(24);

    let mut body = Vec::with_capacity(metadata_json.len() + bytes.len() + 256);

    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(&metadata_json);
    body.extend_from_slice(
        format!("\r\n--{boundary}\r\nContent-Type: {AUDIO_CONTENT_TYPE}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(&bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Response::builder()
        .status(200)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/mixed; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}
