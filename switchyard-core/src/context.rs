//! Per-request context.
//!
//! A [`Context`] is created by the engine for every inbound request and is
//! dropped once the buffered response has been handed back to the host. It
//! carries:
//!
//! - the inbound [`HttpRequest`] and its parsed query string,
//! - the path [`Params`] captured by the router (read-only for handlers),
//! - a request-scoped [`Store`] shared along the middleware chain,
//! - the outbound [`HttpResponse`] buffer,
//! - the chain cursor and an abort flag,
//! - the cancellation token of the surrounding request lifecycle.
//!
//! The context is owned by exactly one request execution and is never shared
//! between requests.

use crate::{BindError, Error, HttpRequest, HttpResponse, Params, Store, StoreError};
use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue, LOCATION};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Store key under which the request id middleware records the request id.
pub const REQUEST_ID_KEY: &str = "request_id";

pub struct Context {
    request: HttpRequest,
    query: Vec<(String, String)>,
    params: Params,
    store: Store,
    response: HttpResponse,
    cursor: usize,
    aborted: bool,
    cancel: CancellationToken,
    started: Instant,
}

impl Context {
    pub fn new(request: HttpRequest, cancel: CancellationToken) -> Self {
        let query = request
            .query
            .as_deref()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();

        Self {
            request,
            query,
            params: Params::new(),
            store: Store::new(),
            response: HttpResponse::ok(),
            cursor: 0,
            aborted: false,
            cancel,
            started: Instant::now(),
        }
    }

    // ========== Request ==========

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn method(&self) -> crate::HttpMethod {
        self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Path parameter captured by the router.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Path parameter parsed into `T`. `None` when the parameter is absent.
    pub fn param_as<T: std::str::FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.params.get_parsed(name)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn default_query<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.query(name).unwrap_or(default)
    }

    /// Every value of a repeated query parameter, in order.
    pub fn query_all(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Case-insensitive request header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.request.body
    }

    /// Decode the JSON request body into `T`.
    ///
    /// A missing content type is accepted; anything other than
    /// `application/json` or a `+json` suffix is rejected.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, BindError> {
        if let Some(content_type) = self.request.content_type() {
            let is_json = content_type.eq_ignore_ascii_case("application/json")
                || content_type.to_ascii_lowercase().ends_with("+json");
            if !is_json {
                return Err(BindError::UnsupportedMediaType(content_type.to_string()));
            }
        }
        if self.request.body.is_empty() {
            return Err(BindError::EmptyBody);
        }
        Ok(serde_json::from_slice(&self.request.body)?)
    }

    // ========== Store ==========

    pub fn set<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.store.insert(key, value);
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.store.get(key)
    }

    pub fn try_get<T: Send + Sync + 'static>(&self, key: &str) -> Result<&T, StoreError> {
        self.store.try_get(key)
    }

    /// Get a value an earlier middleware guarantees to have set.
    ///
    /// # Panics
    ///
    /// Panics when the key is absent or holds another type. This is a
    /// programming error in the chain setup; a [`Recovery`](crate::Recovery)
    /// middleware turns it into a 500.
    pub fn must_get<T: Send + Sync + 'static>(&self, key: &str) -> &T {
        match self.store.try_get(key) {
            Ok(value) => value,
            Err(err) => panic!("must_get: {}", err),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    // ========== Response ==========

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.response
    }

    pub fn status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Internal(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Internal(format!("invalid header value for {}: {}", name, e)))?;
        self.response.headers.insert(name, value);
        Ok(())
    }

    /// Write `value` as a JSON body with the given status.
    pub fn json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Result<(), Error> {
        let body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.write(status, HeaderValue::from_static("application/json"), body);
        Ok(())
    }

    pub fn string(&mut self, status: StatusCode, text: impl Into<String>) {
        self.write(
            status,
            HeaderValue::from_static("text/plain; charset=utf-8"),
            text.into().into_bytes(),
        );
    }

    /// Write raw bytes with an explicit content type.
    pub fn data(&mut self, status: StatusCode, content_type: &str, body: impl Into<Vec<u8>>) -> Result<(), Error> {
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| Error::Internal(format!("invalid content type: {}", e)))?;
        self.write(status, content_type, body.into());
        Ok(())
    }

    pub fn no_content(&mut self) {
        self.response.status = StatusCode::NO_CONTENT;
        self.response.body.clear();
        self.response.headers.remove(CONTENT_TYPE);
    }

    pub fn redirect(&mut self, status: StatusCode, location: &str) -> Result<(), Error> {
        if !status.is_redirection() {
            return Err(Error::Internal(format!(
                "cannot redirect with status {}",
                status
            )));
        }
        let location = HeaderValue::from_str(location)
            .map_err(|e| Error::Internal(format!("invalid redirect location: {}", e)))?;
        self.response.status = status;
        self.response.headers.insert(LOCATION, location);
        Ok(())
    }

    fn write(&mut self, status: StatusCode, content_type: HeaderValue, body: Vec<u8>) {
        self.response.status = status;
        self.response.headers.insert(CONTENT_TYPE, content_type);
        self.response.body = body;
    }

    /// Discard the buffered status, body and content type. Other headers
    /// (request id, `Allow`) survive.
    pub fn reset_response(&mut self) {
        self.response.status = StatusCode::OK;
        self.response.body.clear();
        self.response.headers.remove(CONTENT_TYPE);
    }

    // ========== Chain control ==========

    /// Stop the chain: entries not yet started are skipped even if the
    /// current one still calls its continuation.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.response.status = status;
        self.abort();
    }

    pub fn abort_with_json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> Result<(), Error> {
        self.abort();
        self.json(status, value)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Index of the chain entry currently running.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    // ========== Lifecycle ==========

    /// Cancellation signal of the surrounding request (client disconnect,
    /// server shutdown deadline). Handlers decide how to react.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.store.get::<String>(REQUEST_ID_KEY).map(String::as_str)
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("params", &self.params)
            .field("status", &self.response.status)
            .field("cursor", &self.cursor)
            .field("aborted", &self.aborted)
            .finish()
    }
}
