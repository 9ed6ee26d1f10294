// Switchyard - a small HTTP dispatch framework for Rust
//
// Trie routing, onion-style middleware around a per-request context,
// prefix/middleware route groups, and request binding with validation.

//! ```
//! use switchyard::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let mut engine = Engine::new();
//! engine.use_middleware(Recovery).use_middleware(Logger);
//! engine
//!     .get("/users/:id", |ctx| {
//!         Box::pin(async move {
//!             let id = ctx.param("id").unwrap_or_default().to_string();
//!             ctx.json(StatusCode::OK, &serde_json::json!({ "id": id }))
//!         })
//!     })
//!     .unwrap();
//!
//! let res = engine
//!     .handle_request(HttpRequest::new(HttpMethod::GET, "/users/42"))
//!     .await;
//! assert_eq!(res.status, StatusCode::OK);
//! assert_eq!(res.body_ref(), br#"{"id":"42"}"#);
//! # });
//! ```

// Re-export core functionality
pub use switchyard_core::*;

// Re-export optional crates
#[cfg(feature = "validation")]
pub use switchyard_validation;

#[cfg(feature = "testing")]
pub use switchyard_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        BoxFuture, Context, Engine, EngineConfig, Error, HandlerFn, HttpMethod, HttpRequest,
        HttpResponse, Logger, Middleware, Next, Recovery, RequestId, RouteGroup, async_trait,
        handler_fn, middleware_fn,
    };
    pub use crate::http::StatusCode;
    pub use crate::logging::{LogConfig, LogFormat, LogLevel};

    #[cfg(feature = "validation")]
    pub use switchyard_validation::{RuleSet, Rules, Validate, ValidationPipe};
}
