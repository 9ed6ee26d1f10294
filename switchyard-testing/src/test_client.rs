// In-process test client

use bytes::Bytes;
use http::StatusCode;
use std::sync::Arc;
use switchyard_core::{Engine, Error, HttpMethod, HttpRequest, HttpResponse};
use tokio_util::sync::CancellationToken;

/// Drives an [`Engine`] directly, without sockets.
#[derive(Clone)]
pub struct TestClient {
    engine: Arc<Engine>,
}

impl TestClient {
    pub fn new(engine: Engine) -> Self {
        Self::from_arc(Arc::new(engine))
    }

    pub fn from_arc(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::GET, path)).await
    }

    pub async fn post(&self, path: &str, body: impl Into<Bytes>) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::POST, path).body(body))
            .await
    }

    pub async fn put(&self, path: &str, body: impl Into<Bytes>) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::PUT, path).body(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::DELETE, path))
            .await
    }

    pub async fn patch(&self, path: &str, body: impl Into<Bytes>) -> TestResponse {
        self.send(TestRequestBuilder::new(HttpMethod::PATCH, path).body(body))
            .await
    }

    /// POST a JSON body.
    pub async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        value: &T,
    ) -> Result<TestResponse, Error> {
        let builder = TestRequestBuilder::new(HttpMethod::POST, path).json(value)?;
        Ok(self.send(builder).await)
    }

    pub async fn send(&self, builder: TestRequestBuilder) -> TestResponse {
        self.request(builder.build()).await
    }

    /// Dispatch a prepared request.
    pub async fn request(&self, request: HttpRequest) -> TestResponse {
        self.request_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Dispatch with a caller-controlled cancellation token.
    pub async fn request_with_cancel(
        &self,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> TestResponse {
        TestResponse::new(self.engine.dispatch(request, cancel).await)
    }
}

/// Builder for test requests
pub struct TestRequestBuilder {
    method: HttpMethod,
    path: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Bytes,
}

impl TestRequestBuilder {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter; values are percent-encoded on build.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and content type.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.body = Bytes::from(body);
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        Ok(self)
    }

    pub fn build(self) -> HttpRequest {
        let mut target = self.path;
        if !self.query.is_empty() {
            // serializing string pairs cannot fail
            let encoded = serde_urlencoded::to_string(&self.query).unwrap_or_default();
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&encoded);
        }

        let mut request = HttpRequest::new(self.method, target).with_body(self.body);
        for (name, value) in &self.headers {
            request = request.with_header(name, value);
        }
        request
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse {
    inner: HttpResponse,
}

impl TestResponse {
    pub fn new(inner: HttpResponse) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.header(name)
    }

    pub fn body(&self) -> &[u8] {
        self.inner.body_ref()
    }

    /// Body as UTF-8 text; invalid bytes are replaced.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(self.inner.body_ref()).into_owned()
    }

    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.inner.body_ref())
    }

    pub fn into_inner(self) -> HttpResponse {
        self.inner
    }
}
