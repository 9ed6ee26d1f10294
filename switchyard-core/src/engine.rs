//! The engine: route registration, global middleware and request dispatch.
//!
//! Registration happens once, single-threaded, through `&mut Engine`.
//! Afterwards the engine is shared (typically in an `Arc`) and every request
//! is dispatched through `&Engine`, each with its own [`Context`].

use crate::logging::{debug, error, trace, warn};
use crate::middleware::{BoxFuture, HandlerFn, Pipeline, handler_fn};
use crate::route_group::{RouteGroup, join_paths, method_shortcuts};
use crate::routing::{RouteInfo, RouteMatch, Router};
use crate::{
    Context, EngineConfig, Error, HttpMethod, HttpRequest, HttpResponse, Middleware, RouteError,
};
use bytes::Bytes;
use http::header::{ALLOW, HeaderValue};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a route resolves to: its group middleware chain and its handler.
pub(crate) struct Endpoint {
    middleware: Vec<Arc<dyn Middleware>>,
    handler: HandlerFn,
}

impl Endpoint {
    pub(crate) fn new(middleware: Vec<Arc<dyn Middleware>>, handler: HandlerFn) -> Self {
        Self {
            middleware,
            handler,
        }
    }
}

/// HTTP request dispatcher.
///
/// ```
/// use http::StatusCode;
/// use switchyard_core::{Engine, HttpMethod, HttpRequest, Logger};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), switchyard_core::RouteError> {
/// let mut engine = Engine::new();
/// engine.use_middleware(Logger);
/// engine.get("/users/:id", |ctx| {
///     Box::pin(async move {
///         let id = ctx.param("id").unwrap_or_default().to_string();
///         ctx.json(StatusCode::OK, &serde_json::json!({ "id": id }))
///     })
/// })?;
///
/// let response = engine
///     .handle_request(HttpRequest::new(HttpMethod::GET, "/users/42"))
///     .await;
/// assert_eq!(response.status, StatusCode::OK);
/// assert_eq!(response.body_string().unwrap(), r#"{"id":"42"}"#);
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    config: EngineConfig,
    router: Router<Endpoint>,
    middleware: Vec<Arc<dyn Middleware>>,
    no_route: HandlerFn,
    no_method: HandlerFn,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            middleware: Vec::new(),
            no_route: handler_fn(|ctx| {
                Box::pin(async move {
                    Err(Error::RouteNotFound(format!("{} {}", ctx.method(), ctx.path())))
                })
            }),
            no_method: handler_fn(|ctx| {
                Box::pin(async move {
                    Err(Error::MethodNotAllowed(format!(
                        "{} {}",
                        ctx.method(),
                        ctx.path()
                    )))
                })
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Append global middleware.
    ///
    /// Global middleware wraps every request, including ones that end in the
    /// not-found or method-not-allowed handlers. The chain is assembled at
    /// dispatch time, so middleware added after routes still applies to them.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Open a route group rooted at `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup::new(&mut self.router, join_paths("", prefix), Vec::new())
    }

    /// Register `handler` for `method` at `pattern`.
    pub fn handle<F>(
        &mut self,
        method: HttpMethod,
        pattern: &str,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        let pattern = join_paths("", pattern);
        self.router
            .insert(method, &pattern, Endpoint::new(Vec::new(), Arc::new(handler)))?;
        Ok(self)
    }

    fn check_route(&self, method: HttpMethod, pattern: &str) -> Result<(), RouteError> {
        self.router.check(method, &join_paths("", pattern))
    }

    method_shortcuts! {
        get => GET;
        post => POST;
        put => PUT;
        delete => DELETE;
        patch => PATCH;
        head => HEAD;
        options => OPTIONS;
    }

    /// Replace the terminal handler used when no route matches the path.
    pub fn no_route<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.no_route = Arc::new(handler);
        self
    }

    /// Replace the terminal handler used when the path matches under other
    /// methods only. The `Allow` header is already set when it runs.
    pub fn no_method<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        self.no_method = Arc::new(handler);
        self
    }

    /// Every registered route.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.router.routes()
    }

    /// Dispatch one request with a fresh cancellation token.
    pub async fn handle_request(&self, request: HttpRequest) -> HttpResponse {
        self.dispatch(request, CancellationToken::new()).await
    }

    /// Dispatch one request.
    ///
    /// Resolves the route, runs global middleware, group middleware and the
    /// handler in order, and renders an `Err` returned from the chain as a
    /// JSON error body. Panics are not caught here; register
    /// [`Recovery`](crate::Recovery) to turn them into 500 responses.
    pub async fn dispatch(&self, request: HttpRequest, cancel: CancellationToken) -> HttpResponse {
        if request.body.len() > self.config.max_body_size {
            warn!(
                method = %request.method,
                path = %request.path,
                size = request.body.len(),
                limit = self.config.max_body_size,
                "Request body exceeds limit"
            );
            return HttpResponse::from_error(&Error::PayloadTooLarge(format!(
                "body of {} bytes exceeds the {} byte limit",
                request.body.len(),
                self.config.max_body_size
            )));
        }

        let method = request.method;
        let path = request.path.clone();
        let mut ctx = Context::new(request, cancel);

        let pipeline = match self.router.find(method, &path) {
            RouteMatch::Found { value, params } => {
                ctx.set_params(params);
                let mut chain = self.middleware.clone();
                chain.extend(value.middleware.iter().cloned());
                Pipeline::new(chain, value.handler.clone())
            }
            RouteMatch::MethodNotAllowed { allowed } if self.config.handle_method_not_allowed => {
                let allow = allowed
                    .iter()
                    .map(HttpMethod::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    ctx.response_mut().headers.insert(ALLOW, value);
                }
                debug!(method = %method, path = %path, allow = %allow, "Method not allowed");
                Pipeline::new(self.middleware.clone(), self.no_method.clone())
            }
            _ => {
                debug!(method = %method, path = %path, "No route matched");
                Pipeline::new(self.middleware.clone(), self.no_route.clone())
            }
        };

        trace!(method = %method, path = %path, entries = pipeline.len(), "Running pipeline");

        if let Err(err) = Arc::new(pipeline).run(&mut ctx).await {
            render_error(&mut ctx, &err);
        }

        ctx.into_response()
    }

    /// Adapter for a `hyper` service: buffers the body (bounded by
    /// `max_body_size`), dispatches, and converts the response back.
    ///
    /// Methods outside [`HttpMethod::ALL`] are answered 501.
    pub async fn handle_hyper<B>(
        &self,
        req: http::Request<B>,
        cancel: CancellationToken,
    ) -> http::Response<Full<Bytes>>
    where
        B: hyper::body::Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();

        let Some(method) = HttpMethod::from_str(parts.method.as_str()) else {
            return HttpResponse::from_error(&Error::NotImplemented(format!(
                "method {} is not supported",
                parts.method
            )))
            .into();
        };

        let body = match Limited::new(body, self.config.max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let err = if e.downcast_ref::<LengthLimitError>().is_some() {
                    Error::PayloadTooLarge(format!(
                        "body exceeds the {} byte limit",
                        self.config.max_body_size
                    ))
                } else {
                    Error::BadRequest(format!("failed to read request body: {}", e))
                };
                return HttpResponse::from_error(&err).into();
            }
        };

        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut request = HttpRequest::new(method, target);
        request.headers = parts.headers;
        request.body = body;

        self.dispatch(request, cancel).await.into()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("routes", &self.router.len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

/// Write an `Err` from the chain into the response, keeping headers already
/// set (request id, `Allow`).
fn render_error(ctx: &mut Context, err: &Error) {
    let status = err.status_code();
    if status.is_server_error() {
        error!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = status.as_u16(),
            error = %err,
            "Request failed"
        );
    } else {
        debug!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = status.as_u16(),
            error = %err,
            "Request rejected"
        );
    }

    ctx.status(status);
    ctx.response_mut().write_error_body(&serde_json::json!({
        "error": err.public_message(),
        "status": status.as_u16(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn hello(ctx: &mut Context) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            ctx.string(StatusCode::OK, "hello");
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_dispatch_found() {
        let mut engine = Engine::new();
        engine.get("/hello", hello).unwrap();

        let res = engine
            .handle_request(HttpRequest::new(HttpMethod::GET, "/hello"))
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let engine = Engine::new();
        let res = engine
            .handle_request(HttpRequest::new(HttpMethod::GET, "/missing"))
            .await;

        assert_eq!(res.status, StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(res.body_ref()).unwrap();
        assert_eq!(body["status"], 404);
        assert_eq!(body["error"], "Route not found: GET /missing");
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow() {
        let mut engine = Engine::new();
        engine.post("/items", hello).unwrap();
        engine.get("/items", hello).unwrap();

        let res = engine
            .handle_request(HttpRequest::new(HttpMethod::DELETE, "/items"))
            .await;
        assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.header("allow"), Some("GET, POST"));
    }

    #[tokio::test]
    async fn test_method_miss_as_404_when_disabled() {
        let mut engine =
            Engine::with_config(EngineConfig::default().with_handle_method_not_allowed(false));
        engine.get("/items", hello).unwrap();

        let res = engine
            .handle_request(HttpRequest::new(HttpMethod::PUT, "/items"))
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert!(res.header("allow").is_none());
    }

    #[tokio::test]
    async fn test_server_error_message_is_generic() {
        let mut engine = Engine::new();
        engine
            .get("/db", |_ctx| {
                Box::pin(async move { Err(Error::Internal("connection refused at 10.0.0.3".into())) })
            })
            .unwrap();

        let res = engine
            .handle_request(HttpRequest::new(HttpMethod::GET, "/db"))
            .await;
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        let text = res.body_string().unwrap();
        assert!(text.contains("Internal Server Error"));
        assert!(!text.contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_pattern_normalized() {
        let mut engine = Engine::new();
        engine.get("hello/", hello).unwrap();
        assert_eq!(engine.routes()[0].pattern, "/hello");
    }
}
