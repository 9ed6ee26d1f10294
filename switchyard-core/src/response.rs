// HTTP response buffer

use crate::Error;
use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http_body_util::Full;
use serde::Serialize;

/// Buffered outbound response.
///
/// Handlers write into this through the [`Context`](crate::Context); the
/// engine hands it back to the host runtime once the pipeline returns.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, Error> {
        self.body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Build the `{"error": ..., "status": ...}` body used for error replies.
    pub fn from_error(error: &Error) -> Self {
        let status = error.status_code();
        let body = serde_json::json!({
            "error": error.public_message(),
            "status": status.as_u16(),
        });
        let mut response = Self::new(status);
        response.write_error_body(&body);
        response
    }

    /// Replace the body with a JSON value, keeping status and other headers.
    pub(crate) fn write_error_body(&mut self, body: &serde_json::Value) {
        self.body = body.to_string().into_bytes();
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
}

impl From<HttpResponse> for http::Response<Full<Bytes>> {
    fn from(response: HttpResponse) -> Self {
        let mut out = http::Response::new(Full::new(Bytes::from(response.body)));
        *out.status_mut() = response.status;
        *out.headers_mut() = response.headers;
        out
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_json_sets_content_type() {
        let res = HttpResponse::ok()
            .with_json(&serde_json::json!({"message": "Hello"}))
            .unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("application/json"));
        assert_eq!(res.body_string().unwrap(), r#"{"message":"Hello"}"#);
    }

    #[test]
    fn test_from_error() {
        let res = HttpResponse::from_error(&Error::NotFound("user 7".into()));
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(res.body_ref()).unwrap();
        assert_eq!(body["status"], 404);
        assert_eq!(body["error"], "Not Found: user 7");
    }

    #[test]
    fn test_into_http_response() {
        let res = HttpResponse::new(StatusCode::CREATED)
            .with_header(HeaderName::from_static("x-id"), HeaderValue::from_static("9"))
            .with_body("made");
        let out: http::Response<Full<Bytes>> = res.into();
        assert_eq!(out.status(), StatusCode::CREATED);
        assert_eq!(out.headers()["x-id"], "9");
    }
}
