//! HTTP helpers for Lambda functions.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Body for not-found and error responses.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))
        .expect("Failed to build response"))
}

/// Create a JSON response that also permits cross-origin access.
///
/// Read and delete routes answer browser clients directly, so they carry the
/// CORS header; mutating routes do not.
pub fn cors_json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .header("access-control-allow-origin", "*")
        .body(Body::from(serde_json::to_string(data)?))
        .expect("Failed to build response"))
}

/// Create a plain-text response (used by the fixed 403 unsupported-verb bodies).
pub fn text_response(status: u16, message: &str) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Body::from(message.to_string()))
        .expect("Failed to build response"))
}

/// Create a not-found response with a descriptive message body.
pub fn not_found_response(message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(404, &MessageBody::new(message))
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure.
pub fn parse_json_body<T: DeserializeOwned>(
    body: &Body,
) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    match serde_json::from_slice(body.as_ref()) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = json_response(
                400,
                &MessageBody::new(format!("Invalid request body: {}", e)),
            )?;
            Ok(Err(response))
        }
    }
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: MyRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match shared::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response_sets_content_type() {
        let response = json_response(200, &MessageBody::new("ok")).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_cors_json_response_allows_any_origin() {
        let response = cors_json_response(200, &MessageBody::new("ok")).unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[test]
    fn test_parse_json_body_rejects_garbage() {
        let body = Body::from("not json");
        let parsed: Result<MessageBodyIn, _> = parse_json_body(&body).unwrap();
        let response = parsed.err().unwrap();
        assert_eq!(response.status(), 400);
    }

    #[derive(serde::Deserialize)]
    struct MessageBodyIn {
        #[allow(dead_code)]
        message: String,
    }
}
