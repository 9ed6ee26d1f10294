//! Testing utilities for Switchyard engines.
//!
//! [`TestClient`] dispatches requests straight into an [`Engine`] (no
//! sockets, no hyper) and the `assert_*` helpers check the buffered
//! responses.
//!
//! ## Quick Start
//!
//! ```
//! use http::StatusCode;
//! use switchyard_core::Engine;
//! use switchyard_testing::*;
//!
//! # tokio_test::block_on(async {
//! let mut engine = Engine::new();
//! engine
//!     .get("/hello/:name", |ctx| {
//!         Box::pin(async move {
//!             let greeting = format!("Hello, {}!", ctx.param("name").unwrap_or("stranger"));
//!             ctx.string(StatusCode::OK, greeting);
//!             Ok(())
//!         })
//!     })
//!     .unwrap();
//!
//! let client = TestClient::new(engine);
//! let response = client.get("/hello/ada").await;
//! assert_status(&response, StatusCode::OK);
//! assert_body_contains(&response, "Hello, ada!");
//! # });
//! ```
//!
//! ## Building requests
//!
//! ```
//! use switchyard_core::HttpMethod;
//! use switchyard_testing::TestRequestBuilder;
//!
//! let request = TestRequestBuilder::new(HttpMethod::GET, "/search")
//!     .header("Authorization", "Bearer token")
//!     .query("q", "tea & biscuits")
//!     .build();
//! assert_eq!(request.query.as_deref(), Some("q=tea+%26+biscuits"));
//! ```

pub mod assertions;
pub mod test_client;

pub use assertions::*;
pub use test_client::*;

pub use switchyard_core::Engine;
