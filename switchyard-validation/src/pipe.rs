// Validation pipe: bind + validate in one step

use crate::{Validate, ValidationErrors};
use http::StatusCode;
use serde::de::DeserializeOwned;
use switchyard_core::logging::debug;
use switchyard_core::{Context, Error, HttpResponse};

/// Decodes a request body and validates it, answering the client itself
/// when either step fails.
///
/// ```
/// use http::StatusCode;
/// use serde::{Deserialize, Serialize};
/// use switchyard_core::Engine;
/// use switchyard_validation::{Rules, RuleSet, ValidationPipe};
///
/// #[derive(Serialize, Deserialize)]
/// struct NewTodo {
///     title: String,
/// }
///
/// impl Rules for NewTodo {
///     fn rules() -> RuleSet {
///         RuleSet::new().tags("title", "required,max=120").unwrap()
///     }
/// }
///
/// let mut engine = Engine::new();
/// engine
///     .post("/todos", |ctx| {
///         Box::pin(async move {
///             let Some(todo) = ValidationPipe::bind::<NewTodo>(ctx)? else {
///                 return Ok(());
///             };
///             ctx.json(StatusCode::CREATED, &todo)
///         })
///     })
///     .unwrap();
/// ```
pub struct ValidationPipe;

impl ValidationPipe {
    /// Bind the body into `T` and validate it.
    ///
    /// Returns `Ok(Some(value))` on success. On a decoding failure a 400
    /// (415 for an unsupported content type) `{"error", "status"}` body is
    /// written; on violations a 422 body with the
    /// `{"errors": [{"field", "rule", "message"}]}` envelope. In both cases
    /// the context is aborted and `Ok(None)` is returned, so the handler
    /// only has to return.
    pub fn bind<T>(ctx: &mut Context) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned + Validate,
    {
        let value: T = match ctx.bind() {
            Ok(value) => value,
            Err(err) => {
                let err = Error::from(err);
                let status = err.status_code();
                debug!(path = %ctx.path(), error = %err, "Request body rejected");
                ctx.abort_with_json(
                    status,
                    &serde_json::json!({
                        "error": err.to_string(),
                        "status": status.as_u16(),
                    }),
                )?;
                return Ok(None);
            }
        };

        match value.validate() {
            Ok(()) => Ok(Some(value)),
            Err(errors) => {
                debug!(path = %ctx.path(), violations = errors.len(), "Request body failed validation");
                ctx.abort_with_json(StatusCode::UNPROCESSABLE_ENTITY, &errors.to_json())?;
                Ok(None)
            }
        }
    }

    /// Validate an already decoded value, writing the 422 envelope on failure.
    ///
    /// Returns whether the value passed.
    pub fn check<T: Validate + ?Sized>(ctx: &mut Context, value: &T) -> Result<bool, Error> {
        match value.validate() {
            Ok(()) => Ok(true),
            Err(errors) => {
                ctx.abort_with_json(StatusCode::UNPROCESSABLE_ENTITY, &errors.to_json())?;
                Ok(false)
            }
        }
    }

    /// Standalone 422 response for a set of violations.
    pub fn error_response(errors: &ValidationErrors) -> Result<HttpResponse, Error> {
        HttpResponse::new(StatusCode::UNPROCESSABLE_ENTITY).with_json(&errors.to_json())
    }
}
