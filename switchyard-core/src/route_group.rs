//! Route groups for organizing routes with a shared prefix and middleware.
//!
//! A group is a registration-time view over the engine's router. Routes
//! registered through it get the group's effective prefix prepended and the
//! group's middleware chain (ancestors first) attached. Nothing about the
//! group survives registration: at request time only the resolved route and
//! its chain exist.
//!
//! # Examples
//!
//! ```
//! use http::StatusCode;
//! use switchyard_core::{Engine, Logger};
//!
//! # fn main() -> Result<(), switchyard_core::RouteError> {
//! let mut engine = Engine::new();
//! let mut v1 = engine.group("/v1");
//! v1.use_middleware(Logger);
//!
//! let mut api = v1.group("/api");
//! api.get("/users", |ctx| {
//!     Box::pin(async move {
//!         ctx.string(StatusCode::OK, "users");
//!         Ok(())
//!     })
//! })?;
//!
//! assert_eq!(engine.routes()[0].pattern, "/v1/api/users");
//! # Ok(())
//! # }
//! ```

use crate::engine::Endpoint;
use crate::middleware::BoxFuture;
use crate::{Context, Error, HttpMethod, Middleware, RouteError, Router};
use std::sync::Arc;

/// Generates the per-method registration shortcuts on top of `handle`.
macro_rules! method_shortcuts {
    ($($(#[$doc:meta])* $name:ident => $method:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
            where
                F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), Error>>
                    + Send
                    + Sync
                    + 'static,
            {
                self.handle(HttpMethod::$method, pattern, handler)
            }
        )*

        /// Register `handler` for every supported method.
        ///
        /// Either all methods are registered or, on error, none are.
        pub fn any<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
        where
            F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), Error>>
                + Send
                + Sync
                + 'static,
        {
            for method in HttpMethod::ALL {
                self.check_route(method, pattern)?;
            }
            let handler: crate::HandlerFn = Arc::new(handler);
            for method in HttpMethod::ALL {
                let handler = handler.clone();
                self.handle(method, pattern, move |ctx| handler(ctx))?;
            }
            Ok(self)
        }
    };
}

pub(crate) use method_shortcuts;

/// A prefix + middleware scope borrowed from an [`Engine`](crate::Engine).
pub struct RouteGroup<'e> {
    router: &'e mut Router<Endpoint>,
    prefix: String,
    /// Ancestor chains (outer to inner) followed by this group's own entries.
    middleware: Vec<Arc<dyn Middleware>>,
}

impl<'e> RouteGroup<'e> {
    pub(crate) fn new(
        router: &'e mut Router<Endpoint>,
        prefix: String,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        Self {
            router,
            prefix,
            middleware,
        }
    }

    /// Effective prefix, ancestors included.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Append middleware to this group only.
    ///
    /// Applies to routes registered through this group (or groups nested
    /// under it) afterwards; ancestors are never touched.
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Create a nested group.
    ///
    /// The child inherits this group's prefix and a snapshot of its
    /// middleware chain.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup {
            router: &mut *self.router,
            prefix: join_paths(&self.prefix, prefix),
            middleware: self.middleware.clone(),
        }
    }

    /// Register `handler` for `method` at the group-relative `pattern`.
    pub fn handle<F>(
        &mut self,
        method: HttpMethod,
        pattern: &str,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), Error>> + Send + Sync + 'static,
    {
        let full = join_paths(&self.prefix, pattern);
        let endpoint = Endpoint::new(self.middleware.clone(), Arc::new(handler));
        self.router.insert(method, &full, endpoint)?;
        Ok(self)
    }

    fn check_route(&self, method: HttpMethod, pattern: &str) -> Result<(), RouteError> {
        self.router.check(method, &join_paths(&self.prefix, pattern))
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
}

/// Join two path fragments, collapsing duplicate separators.
///
/// The result always starts with `/`, has no trailing `/` and is `/` when
/// both inputs are empty.
pub fn join_paths(base: &str, relative: &str) -> String {
    let mut out = String::with_capacity(base.len() + relative.len() + 1);
    for segment in base
        .split('/')
        .chain(relative.split('/'))
        .filter(|s| !s.is_empty())
    {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
