// Core library for the Switchyard HTTP framework
// Trie routing, the middleware pipeline, the request context and the engine
// that ties them together behind a host-runtime boundary.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod response;
pub mod route_group;
pub mod route_params;
pub mod routing;
pub mod store;

// Re-export commonly used types
pub use config::*;
pub use context::*;
pub use engine::Engine;
pub use error::*;
pub use middleware::*;
pub use request::*;
pub use response::*;
pub use route_group::*;
pub use route_params::Params;
pub use routing::{RouteInfo, RouteMatch, Router};
pub use store::*;

// Needed to implement `Middleware` outside this crate
pub use async_trait::async_trait;
pub use http;
