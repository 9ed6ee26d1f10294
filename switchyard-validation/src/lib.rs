//! Validation for Switchyard handlers
//!
//! Declarative per-field rules evaluated over the JSON form of a value.
//! Every violation is collected (no fail-fast) so a handler can answer with
//! the full list in one response:
//!
//! ```json
//! {"errors": [{"field": "email", "rule": "email", "message": "email must be a valid email address"}]}
//! ```
//!
//! # Examples
//!
//! ## Rule sets
//!
//! ```
//! use switchyard_validation::RuleSet;
//!
//! let rules = RuleSet::new()
//!     .tags("username", "required,alphanum,min=3,max=32").unwrap()
//!     .tags("age", "min=18").unwrap();
//!
//! let errors = rules
//!     .validate(&serde_json::json!({ "username": "jo", "age": 16 }))
//!     .unwrap_err();
//! assert_eq!(errors.len(), 2);
//! ```
//!
//! ## In a handler
//!
//! See [`ValidationPipe::bind`], which decodes, validates and writes the
//! 400/422 response itself.

mod errors;
mod pipe;
mod rules;
mod traits;
pub mod validators;

pub use errors::*;
pub use pipe::*;
pub use rules::*;
pub use traits::*;
