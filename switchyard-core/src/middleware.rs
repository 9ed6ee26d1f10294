// Middleware system for request/response processing

use crate::context::REQUEST_ID_KEY;
use crate::logging::{error, info, trace};
use crate::{Context, Error};
use async_trait::async_trait;
use futures_util::FutureExt;
use http::StatusCode;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Boxed, `Send` future borrowing from the request context.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased terminal handler.
pub type HandlerFn =
    Arc<dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), Error>> + Send + Sync>;

/// Erase a handler closure into a [`HandlerFn`].
pub fn handler_fn<F>(f: F) -> HandlerFn
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Middleware wraps the remainder of the chain.
///
/// An implementation may run code before calling [`Next::run`], after it
/// returns, both, or never call it at all to short-circuit the request.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut Context, next: Next) -> Result<(), Error>;
}

/// Middleware built from a closure, see [`middleware_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next) -> BoxFuture<'a, Result<(), Error>> + Send + Sync,
{
    async fn handle(&self, ctx: &mut Context, next: Next) -> Result<(), Error> {
        (self.f)(ctx, next).await
    }
}

/// Turn a closure into middleware.
///
/// ```rust
/// use switchyard_core::{middleware_fn, Context, Next};
///
/// let timing = middleware_fn(|ctx: &mut Context, next: Next| {
///     Box::pin(async move {
///         let result = next.run(ctx).await;
///         let elapsed = ctx.elapsed().as_millis().to_string();
///         ctx.set_header("x-elapsed-ms", &elapsed)?;
///         result
///     })
/// });
/// ```
pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next) -> BoxFuture<'a, Result<(), Error>> + Send + Sync,
{
    FnMiddleware { f }
}

/// The materialized chain for one request: global middleware, then the
/// matched route's group middleware (outer to inner), then the handler.
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
    handler: HandlerFn,
}

impl Pipeline {
    pub fn new(middleware: Vec<Arc<dyn Middleware>>, handler: HandlerFn) -> Self {
        Self {
            middleware,
            handler,
        }
    }

    /// Number of entries, the handler included.
    pub fn len(&self) -> usize {
        self.middleware.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Run the whole chain from its first entry.
    pub async fn run(self: Arc<Self>, ctx: &mut Context) -> Result<(), Error> {
        Next {
            pipeline: self,
            index: 0,
        }
        .run(ctx)
        .await
    }
}

/// Continuation handed to each middleware.
///
/// `run` consumes the value, so a middleware can resume the chain at most
/// once; a second call does not compile:
///
/// ```compile_fail,E0382
/// use switchyard_core::{middleware_fn, Context, Next};
///
/// let twice = middleware_fn(|ctx: &mut Context, next: Next| {
///     Box::pin(async move {
///         next.run(ctx).await?;
///         next.run(ctx).await
///     })
/// });
/// ```
pub struct Next {
    pipeline: Arc<Pipeline>,
    index: usize,
}

impl Next {
    /// Advance the context cursor to this entry and run it.
    ///
    /// When the context has been aborted, the remaining entries are skipped
    /// and the response is left as is.
    pub fn run(self, ctx: &mut Context) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            if ctx.is_aborted() {
                trace!(cursor = self.index, "Chain aborted, skipping remaining entries");
                return Ok(());
            }
            ctx.set_cursor(self.index);

            match self.pipeline.middleware.get(self.index).cloned() {
                Some(middleware) => {
                    trace!(middleware_index = self.index, "Executing middleware");
                    let next = Next {
                        pipeline: self.pipeline.clone(),
                        index: self.index + 1,
                    };
                    middleware.handle(ctx, next).await
                }
                None => {
                    trace!("Middleware chain complete, calling handler");
                    (self.pipeline.handler)(ctx).await
                }
            }
        })
    }

    /// Chain position this continuation will run.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("len", &self.pipeline.len())
            .finish()
    }
}

// ========== Built-in Middleware ==========

/// Request logging middleware.
///
/// Emits one event per request after the rest of the chain has finished, so
/// it must be registered before anything whose status it should observe.
pub struct Logger;

#[async_trait]
impl Middleware for Logger {
    async fn handle(&self, ctx: &mut Context, next: Next) -> Result<(), Error> {
        let method = ctx.method();
        let path = ctx.path().to_string();
        let start = Instant::now();

        let result = next.run(ctx).await;

        let status = match &result {
            Ok(()) => ctx.response().status,
            Err(e) => e.status_code(),
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let request_id = ctx.request_id().unwrap_or("-");

        match &result {
            Ok(()) => info!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                elapsed_ms,
                request_id,
                "Request completed"
            ),
            Err(e) => info!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                elapsed_ms,
                request_id,
                error = %e,
                "Request failed"
            ),
        }

        result
    }
}

/// Fault boundary for the rest of the chain.
///
/// A panic raised downstream is caught here: the partially written response
/// is discarded, a generic 500 JSON body is written, the panic detail is
/// logged, and the chain returns normally. Register it first so it covers
/// every later middleware and the handler.
pub struct Recovery;

#[async_trait]
impl Middleware for Recovery {
    async fn handle(&self, ctx: &mut Context, next: Next) -> Result<(), Error> {
        let outcome = AssertUnwindSafe(next.run(ctx)).catch_unwind().await;

        match outcome {
            Ok(result) => result,
            Err(payload) => {
                error!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    panic = %panic_message(payload.as_ref()),
                    "Recovered from panic in request handler"
                );
                ctx.reset_response();
                ctx.abort_with_json(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &serde_json::json!({
                        "error": "Internal Server Error",
                        "status": 500,
                    }),
                )
            }
        }
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Request ID middleware.
///
/// Reuses the inbound request id header or generates a UUIDv4, records it in
/// the store under [`REQUEST_ID_KEY`] and echoes it on the response.
pub struct RequestId {
    header: String,
}

impl RequestId {
    pub fn new() -> Self {
        Self {
            header: "x-request-id".to_string(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn from_config(config: &crate::EngineConfig) -> Self {
        Self::new().with_header(config.request_id_header.clone())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RequestId {
    async fn handle(&self, ctx: &mut Context, next: Next) -> Result<(), Error> {
        let request_id = ctx
            .header(&self.header)
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        ctx.set(REQUEST_ID_KEY, request_id.clone());
        ctx.set_header(&self.header, &request_id)?;

        next.run(ctx).await
    }
}
